//! Categories, tags and roles.
//!
//! The three share one shape (`id`, `name`, unique `slug`), one repository and
//! one cached service, parameterized by [`TermKind`].

mod models;
mod repository;
mod service;

pub use models::{CreateTermRequest, Term, TermKind, UpdateTermRequest};
pub use repository::TermRepository;
pub use service::TermService;
