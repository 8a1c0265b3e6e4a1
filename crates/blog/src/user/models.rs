//! User data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::taxonomy::Term;

/// User entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub slug: String,
    pub created_at: String,
}

/// Row to insert for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub slug: String,
}

/// Compact user listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub slug: String,
}

/// User with their roles, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub slug: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub roles: Vec<Term>,
}

impl UserProfile {
    pub fn from_parts(user: User, roles: Vec<Term>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            slug: user.slug,
            bio: user.bio,
            image: user.image,
            created_at: user.created_at,
            roles,
        }
    }

    /// Role slugs, as carried in token claims.
    pub fn role_slugs(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.slug.clone()).collect()
    }
}

/// Result of a role link/unlink.
#[derive(Debug, Clone, Serialize)]
pub struct UserRoles {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<Term>,
}

impl From<UserProfile> for UserRoles {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            roles: profile.roles,
        }
    }
}

/// Request to register an account.
///
/// Any `password` sent by the client is ignored; the server generates one.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 80, message = "is required and at most 80 characters"))]
    pub name: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub image: Option<String>,
}

/// Registration result. The plaintext password is returned exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Edit the caller's own account. Empty fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditAccountRequest {
    #[validate(length(max = 80, message = "must be at most 80 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub email: Option<String>,
    pub bio: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub image: Option<String>,
    /// bcrypt only looks at the first 72 bytes.
    #[validate(length(max = 72, message = "must be at most 72 characters"))]
    pub password: Option<String>,
}
