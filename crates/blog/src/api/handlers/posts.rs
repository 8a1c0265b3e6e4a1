//! Post handlers.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::state::AppState;
use crate::auth::{CurrentUser, RequireAuthor};
use crate::pagination::{Page, PageQuery};
use crate::post::{CreatePostRequest, PostDetail, PostSummary, UpdatePostRequest};

#[instrument(skip(state, _user))]
pub async fn list_posts(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<PostSummary>>> {
    Ok(Json(state.posts.list(query).await?))
}

#[instrument(skip(state, _user))]
pub async fn list_posts_by_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<PostSummary>>> {
    Ok(Json(state.posts.list_by_category(&slug, query).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_post(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PostDetail>> {
    Ok(Json(state.posts.get(id).await?))
}

/// Create a post (admin or author). The caller is the default author.
#[instrument(skip(state, user, request), fields(user_id = user.id))]
pub async fn create_post(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state.posts.create(request, user.id).await?;
    let location = format!("/v1/posts/{}", post.post.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(post)))
}

#[instrument(skip(state, _user, request))]
pub async fn update_post(
    State(state): State<AppState>,
    RequireAuthor(_user): RequireAuthor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdatePostRequest>,
) -> ApiResult<Json<PostDetail>> {
    Ok(Json(state.posts.update(id, request).await?))
}

#[instrument(skip(state, _user))]
pub async fn delete_post(
    State(state): State<AppState>,
    RequireAuthor(_user): RequireAuthor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PostDetail>> {
    Ok(Json(state.posts.delete(id).await?))
}
