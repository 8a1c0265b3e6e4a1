//! Authentication module.
//!
//! Password hashing, HS256 token issuance and verification, and the request
//! gate that turns a bearer token into a [`CurrentUser`].

mod claims;
mod config;
mod error;
mod middleware;
mod password;
mod token;

pub use claims::{ADMIN_ROLE, AUTHOR_ROLE, Claims};
pub use config::{AuthConfig, ConfigValidationError, PasswordPolicy};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, RequireAdmin, RequireAuthor, auth_middleware};
pub use password::{PasswordGenerator, PasswordHasher};
pub use token::{IssuedToken, TokenService};
