//! JWT claims.

use serde::{Deserialize, Serialize};

/// Role slug that unlocks administrative endpoints.
pub const ADMIN_ROLE: &str = "admin";

/// Role slug allowed to write posts.
pub const AUTHOR_ROLE: &str = "author";

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (numeric user id as a string).
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// User's email.
    pub email: String,

    /// User's display name.
    pub name: String,

    /// One entry per role slug held at issue time.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    /// Parse the subject as a user id.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok().filter(|id| *id > 0)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// Admins and authors may write posts.
    pub fn can_author(&self) -> bool {
        self.has_any_role(&[ADMIN_ROLE, AUTHOR_ROLE])
    }
}
