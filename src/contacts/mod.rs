//! CRM records: companies, their contacts, the sales pipeline and the
//! activity log.

pub mod activities;
pub mod companies;
pub mod contact;
pub mod crm;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::api::crud::entity_routes;
use crate::core::shared::state::AppState;

pub use activities::{upcoming_activities, Activity, ActivityFilter, ActivityInput};
pub use companies::{Company, CompanyFilter, CompanyInput};
pub use contact::{Contact, ContactFilter, ContactInput};
pub use crm::{revenue_by_stage, Deal, DealFilter, DealInput, Lead, LeadFilter, LeadInput};

pub fn configure_crm_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/companies", entity_routes::<Company>())
        .nest("/contacts", entity_routes::<Contact>())
        .nest("/leads", entity_routes::<Lead>())
        .nest(
            "/deals",
            entity_routes::<Deal>().route("/revenue/by-stage", get(revenue_by_stage)),
        )
        .nest(
            "/activities",
            entity_routes::<Activity>().route("/upcoming", get(upcoming_activities)),
        )
}
