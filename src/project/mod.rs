//! Projects and the tasks inside them.

pub mod projects;
pub mod tasks;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::api::crud::entity_routes;
use crate::core::shared::state::AppState;

pub use projects::{Project, ProjectFilter, ProjectInput};
pub use tasks::{overdue_tasks, Task, TaskFilter, TaskInput};

pub fn configure_project_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/projects", entity_routes::<Project>())
        .nest(
            "/tasks",
            entity_routes::<Task>().route("/overdue", get(overdue_tasks)),
        )
}
