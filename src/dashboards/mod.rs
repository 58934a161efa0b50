//! Landing-page aggregates.

pub mod handlers;
pub mod types;

pub use handlers::{configure_dashboards_routes, handle_get_dashboard};
pub use types::*;
