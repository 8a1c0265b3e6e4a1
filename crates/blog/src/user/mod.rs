//! User accounts and role assignments.

mod models;
mod repository;
mod roles;
mod service;

pub use models::{
    EditAccountRequest, LoginRequest, NewUser, RegisterRequest, Registration, User, UserProfile,
    UserRoles, UserSummary,
};
pub use repository::UserRepository;
pub use roles::UserRoleRepository;
pub use service::UserService;
