//! Blogging platform API.
//!
//! Accounts with server-generated passwords, HS256 bearer tokens, role-gated
//! administration, and CRUD over posts, categories, tags and roles on SQLite.

pub mod api;
pub mod auth;
pub mod cache;
pub mod db;
pub mod error;
pub mod pagination;
pub mod post;
pub mod slug;
pub mod taxonomy;
pub mod user;
