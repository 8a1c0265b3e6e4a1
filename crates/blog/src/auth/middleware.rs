//! Authentication middleware and role extractors.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Duration;
use log::debug;
use std::sync::Arc;

use super::{AuthConfig, AuthError, Claims, ConfigValidationError, TokenService};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Authentication state shared across handlers.
#[derive(Clone, Debug)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    tokens: TokenService,
}

impl AuthState {
    /// Create auth state from config.
    ///
    /// The secret is resolved (including `env:VAR_NAME`) and checked once here.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        let secret = config.signing_secret()?;
        let tokens = TokenService::new(
            secret.as_bytes(),
            config.issuer.clone(),
            Duration::hours(config.token_ttl_hours),
        );

        Ok(Self {
            config: Arc::new(config),
            tokens,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Verify a token and extract the caller's identity in one step.
    pub fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.tokens.verify(token)?;
        let id = claims
            .user_id()
            .ok_or_else(|| AuthError::InvalidToken("subject is not a user id".to_string()))?;
        Ok(CurrentUser { id, claims })
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub claims: Claims,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.claims.email
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }

    pub fn can_author(&self) -> bool {
        self.claims.can_author()
    }
}

/// Requires an authenticated caller.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Authentication middleware.
///
/// A presented `Authorization: Bearer <token>` header must verify, otherwise
/// the request is rejected with 401. Requests without the header continue
/// unauthenticated and are gated by the extractors.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|h| h.to_str().map_err(|_| AuthError::InvalidAuthHeader))
        .transpose()?;

    if let Some(header) = header {
        let token = bearer_token_from_header(header)?;
        let user = auth.authenticate(token)?;
        debug!("Authenticated user {}", user.id);
        req.extensions_mut().insert(user);
    }

    Ok(next.run(req).await)
}

/// Require the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions(
                "admin role required".to_string(),
            ));
        }

        Ok(RequireAdmin(user))
    }
}

/// Require the admin or author role.
#[derive(Debug, Clone)]
pub struct RequireAuthor(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuthor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !user.can_author() {
            return Err(AuthError::InsufficientPermissions(
                "admin or author role required".to_string(),
            ));
        }

        Ok(RequireAuthor(user))
    }
}
