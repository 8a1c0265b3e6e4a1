//! Category, tag and role handlers.
//!
//! Each collection is mounted with its own [`TermService`] as state.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath};
use crate::auth::{CurrentUser, RequireAdmin};
use crate::taxonomy::{CreateTermRequest, Term, TermService, UpdateTermRequest};

#[instrument(skip(svc, _user), fields(kind = %svc.kind()))]
pub async fn list_terms(
    State(svc): State<TermService>,
    _user: CurrentUser,
) -> ApiResult<Json<Vec<Term>>> {
    Ok(Json(svc.list().await?))
}

#[instrument(skip(svc, _user), fields(kind = %svc.kind()))]
pub async fn get_term(
    State(svc): State<TermService>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Term>> {
    Ok(Json(svc.get(id).await?))
}

/// Create a term (admin only). Responds 201 with a `Location` header.
#[instrument(skip(svc, _user, request), fields(kind = %svc.kind()))]
pub async fn create_term(
    State(svc): State<TermService>,
    RequireAdmin(_user): RequireAdmin,
    ApiJson(request): ApiJson<CreateTermRequest>,
) -> ApiResult<impl IntoResponse> {
    let term = svc.create(request).await?;
    let location = format!("/v1/{}/{}", svc.kind().collection(), term.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(term)))
}

#[instrument(skip(svc, _user, request), fields(kind = %svc.kind()))]
pub async fn update_term(
    State(svc): State<TermService>,
    RequireAdmin(_user): RequireAdmin,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateTermRequest>,
) -> ApiResult<Json<Term>> {
    Ok(Json(svc.update(id, request).await?))
}

#[instrument(skip(svc, _user), fields(kind = %svc.kind()))]
pub async fn delete_term(
    State(svc): State<TermService>,
    RequireAdmin(_user): RequireAdmin,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Term>> {
    Ok(Json(svc.delete(id).await?))
}
