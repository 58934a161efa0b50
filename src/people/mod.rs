//! HR records: departments, designations, employees and leave.

pub mod departments;
pub mod designations;
pub mod employees;
pub mod leave;

use axum::{routing::put, Router};
use std::sync::Arc;

use crate::api::crud::entity_routes;
use crate::core::shared::state::AppState;

pub use departments::{Department, DepartmentFilter, DepartmentInput};
pub use designations::{Designation, DesignationFilter, DesignationInput};
pub use employees::{Employee, EmployeeFilter, EmployeeInput};
pub use leave::{
    approve_leave_request, ActionResponse, LeaveRequest, LeaveRequestFilter, LeaveRequestInput,
    LeaveType, LeaveTypeFilter, LeaveTypeInput,
};

pub fn configure_people_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/departments", entity_routes::<Department>())
        .nest("/designations", entity_routes::<Designation>())
        .nest("/employees", entity_routes::<Employee>())
        .nest("/leave-types", entity_routes::<LeaveType>())
        .nest(
            "/leave-requests",
            entity_routes::<LeaveRequest>().route("/:id/approve", put(approve_leave_request)),
        )
}
