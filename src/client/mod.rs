//! Typed client for the REST API: an explicit session value, per-entity
//! list views and the role-aware navigation table.

pub mod api;
pub mod error;
pub mod navigation;
pub mod session;
pub mod views;

pub use api::ApiClient;
pub use error::ClientError;
pub use navigation::{guard, visible_routes, Access, Route, ROUTES};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use views::{DashboardView, EntityView, Notification, NotificationKind};
