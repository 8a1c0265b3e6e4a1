//! HTTP API module.
//!
//! REST endpoints under `/v1` for accounts, users, taxonomy and posts.

mod error;
mod extract;
pub mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use routes::create_router;
pub use state::AppState;
