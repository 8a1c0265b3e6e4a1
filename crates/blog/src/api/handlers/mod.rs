//! API request handlers.

mod accounts;
mod misc;
mod posts;
mod terms;
mod users;

pub use accounts::*;
pub use misc::*;
pub use posts::*;
pub use terms::*;
pub use users::*;
