//! Account handlers: registration, login and self-service edits.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use validator::Validate;

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::error::ServiceError;
use crate::user::{EditAccountRequest, LoginRequest, RegisterRequest, Registration, UserProfile};

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Register an account. The generated password is only returned here.
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let registration = state.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Exchange email and password for a signed token.
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    request.validate().map_err(ServiceError::from)?;
    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    let issued = state
        .auth
        .tokens()
        .issue(user.id, &user.email, &user.name, &user.role_slugs())?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    }))
}

/// The caller's own profile.
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_account(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.get_profile(user.id).await?))
}

/// Edit the caller's own account.
#[instrument(skip(state, user, request), fields(user_id = user.id))]
pub async fn edit_account(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<EditAccountRequest>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.edit_account(user.id, request).await?))
}

/// Delete the caller's own account.
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.delete_user(user.id).await?))
}
