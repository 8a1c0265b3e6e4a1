//! Admin-only user handlers.

use axum::{
    Json,
    extract::State,
};
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::state::AppState;
use crate::auth::RequireAdmin;
use crate::pagination::{Page, PageQuery};
use crate::user::{UserProfile, UserRoles, UserSummary};

/// List users (admin only).
#[instrument(skip(state, _user))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<UserSummary>>> {
    Ok(Json(state.users.list(query).await?))
}

/// Get a user with roles (admin only).
#[instrument(skip(state, _user))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.get_profile(id).await?))
}

/// Delete a user (admin only).
#[instrument(skip(state, _user))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.delete_user(id).await?))
}

/// Grant a role (admin only).
#[instrument(skip(state, _user))]
pub async fn add_user_role(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    ApiPath((user_id, role_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<UserRoles>> {
    Ok(Json(state.users.add_role(user_id, role_id).await?))
}

/// Revoke a role (admin only).
#[instrument(skip(state, _user))]
pub async fn remove_user_role(
    State(state): State<AppState>,
    RequireAdmin(_user): RequireAdmin,
    ApiPath((user_id, role_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<UserRoles>> {
    Ok(Json(state.users.remove_role(user_id, role_id).await?))
}
