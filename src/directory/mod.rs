//! User accounts.

pub mod users;

pub use users::{configure_user_routes, find_user, User, UserFilter, UserInput};
