//! API route definitions.

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;
use crate::taxonomy::TermService;

use super::handlers;
use super::state::AppState;

/// Routes for one term collection, with its service as state.
fn term_routes(svc: TermService) -> Router {
    let base = format!("/v1/{}", svc.kind().collection());
    Router::new()
        .route(
            &base,
            get(handlers::list_terms).post(handlers::create_term),
        )
        .route(
            &format!("{base}/{{id}}"),
            get(handlers::get_term)
                .put(handlers::update_term)
                .delete(handlers::delete_term),
        )
        .with_state(svc)
}

/// Create the application router.
pub fn create_router(state: AppState, max_body_size_mb: usize) -> Router {
    let cors = build_cors_layer(&state);
    let max_body_size = max_body_size_mb * 1024 * 1024;

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Every /v1 route passes through the auth middleware; handlers pick
    // their own gate through extractors.
    let api_routes = Router::new()
        .route(
            "/v1/accounts",
            post(handlers::register)
                .get(handlers::get_account)
                .patch(handlers::edit_account)
                .delete(handlers::delete_account),
        )
        .route("/v1/accounts/login", post(handlers::login))
        .route("/v1/users", get(handlers::list_users))
        .route(
            "/v1/users/{id}",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route(
            "/v1/users/{id}/role/{role_id}",
            post(handlers::add_user_role).delete(handlers::remove_user_role),
        )
        .route(
            "/v1/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/v1/posts/category/{slug}",
            get(handlers::list_posts_by_category),
        )
        .route(
            "/v1/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .with_state(state.clone())
        .merge(term_routes(state.categories.clone()))
        .merge(term_routes(state.tags.clone()))
        .merge(term_routes(state.roles.clone()))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    let public_routes = Router::new().route("/health", get(handlers::health));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer from the configured origins.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::OPTIONS,
    ];
    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
    ];

    let origins: Vec<HeaderValue> = state
        .auth
        .allowed_origins()
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, denying cross-origin requests");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    }
}
