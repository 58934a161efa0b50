//! REST API plumbing shared by every resource module.

pub mod crud;
pub mod error;

pub use crud::{entity_routes, ApiResult};
pub use error::ApiError;
