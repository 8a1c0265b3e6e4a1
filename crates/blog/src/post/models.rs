//! Post data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::taxonomy::Term;
use crate::user::UserSummary;

/// Post entity from database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub slug: String,
    pub category_id: i64,
    pub author_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Row to insert for a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub summary: String,
    pub body: String,
    pub slug: String,
    pub category_id: i64,
    pub author_id: i64,
}

/// Listing entry: no body, category and author flattened to display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub updated_at: String,
    pub category: String,
    pub author: String,
}

/// A post with its category, author and tags resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub category: Term,
    pub author: UserSummary,
    pub tags: Vec<Term>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 160, message = "is required and at most 160 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "is required and at most 255 characters"))]
    pub summary: String,
    #[validate(length(min = 1, message = "is required"))]
    pub body: String,
    #[validate(length(min = 1, max = 160, message = "is required and at most 160 characters"))]
    pub slug: String,
    pub category_id: i64,
    /// Defaults to the caller.
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Partial update. Empty strings leave the field unchanged; `tag_ids`
/// replaces the whole tag set when present.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(max = 160, message = "must be at most 160 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub summary: Option<String>,
    pub body: Option<String>,
    #[validate(length(max = 160, message = "must be at most 160 characters"))]
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
}
