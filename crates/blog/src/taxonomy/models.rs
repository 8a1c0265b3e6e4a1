//! Term data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Which table a term lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Category,
    Tag,
    Role,
}

impl TermKind {
    pub fn table(self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Tag => "tags",
            TermKind::Role => "roles",
        }
    }

    /// Human-readable singular name, used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            TermKind::Category => "Category",
            TermKind::Tag => "Tag",
            TermKind::Role => "Role",
        }
    }

    /// Path segment under `/v1`.
    pub fn collection(self) -> &'static str {
        self.table()
    }

    /// Inclusive name length bounds, in characters.
    pub fn name_bounds(self) -> (usize, usize) {
        match self {
            TermKind::Category | TermKind::Role => (3, 40),
            TermKind::Tag => (3, 80),
        }
    }

    pub fn check_name(self, name: &str) -> Result<(), String> {
        let (min, max) = self.name_bounds();
        let len = name.chars().count();
        if len < min || len > max {
            return Err(format!(
                "name: must be between {min} and {max} characters"
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for TermKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A category, tag or role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Term {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Request to create a term.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTermRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 80, message = "is required and at most 80 characters"))]
    pub slug: String,
}

/// Partial update; empty strings are treated as absent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTermRequest {
    pub name: Option<String>,
    #[validate(length(max = 80, message = "must be at most 80 characters"))]
    pub slug: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds_per_kind() {
        assert!(TermKind::Category.check_name("Rust").is_ok());
        assert!(TermKind::Category.check_name("ab").is_err());
        assert!(TermKind::Category.check_name(&"x".repeat(41)).is_err());
        assert!(TermKind::Tag.check_name(&"x".repeat(80)).is_ok());
        assert!(TermKind::Tag.check_name(&"x".repeat(81)).is_err());
    }

    #[test]
    fn test_create_request_requires_fields() {
        let req = CreateTermRequest {
            name: String::new(),
            slug: String::new(),
        };
        let errs = req.validate().unwrap_err();
        assert_eq!(errs.field_errors().len(), 2);
    }
}
