//! Application state.

use std::time::Duration;

use crate::auth::{AuthState, PasswordGenerator, PasswordHasher};
use crate::db::Database;
use crate::post::PostService;
use crate::taxonomy::{TermKind, TermRepository, TermService};
use crate::user::UserService;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: AuthState,
    pub users: UserService,
    pub posts: PostService,
    pub categories: TermService,
    pub tags: TermService,
    pub roles: TermService,
}

impl AppState {
    /// Wire every service to one database. `cache_ttl` applies to the
    /// category, tag and role list caches.
    pub fn new(db: &Database, auth: AuthState, cache_ttl: Duration) -> Self {
        let pool = db.pool().clone();
        let config = auth.config();

        let users = UserService::new(
            pool.clone(),
            PasswordHasher::new(config.bcrypt_cost),
            PasswordGenerator::new(config.password.clone()),
        );
        let term_service =
            |kind| TermService::new(TermRepository::new(pool.clone(), kind), cache_ttl);

        Self {
            categories: term_service(TermKind::Category),
            tags: term_service(TermKind::Tag),
            roles: term_service(TermKind::Role),
            posts: PostService::new(pool.clone()),
            users,
            auth,
        }
    }
}
