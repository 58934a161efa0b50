//! Bearer-token authentication and the role/module permission matrix.

pub mod config;
pub mod error;
pub mod middleware;
pub mod tests;
pub mod types;

pub use config::AuthConfig;
pub use error::AuthError;
pub use middleware::auth_middleware;
pub use types::{can_read, can_write, permissions, AuthenticatedUser, Module, Permission};
