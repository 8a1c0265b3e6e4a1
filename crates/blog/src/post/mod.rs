//! Posts and their tag links.

mod models;
mod repository;
mod service;
mod tags;

pub use models::{CreatePostRequest, NewPost, Post, PostDetail, PostSummary, UpdatePostRequest};
pub use repository::PostRepository;
pub use service::PostService;
pub use tags::PostTagRepository;
