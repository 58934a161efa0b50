//! Top-level router: health probe, the versioned REST API and, in embedded
//! mode, the static frontend.

use axum::{http::StatusCode, middleware, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::main_module::health_check;
use crate::security::auth_api::auth_middleware;
use crate::security::create_cors_layer;

pub const API_PREFIX: &str = "/api/v1";

/// Every REST route, relative to [`API_PREFIX`].
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::auth::configure_auth_routes())
        .nest("/users", crate::directory::configure_user_routes())
        .merge(crate::contacts::configure_crm_routes())
        .merge(crate::people::configure_people_routes())
        .merge(crate::project::configure_project_routes())
        .merge(crate::dashboards::configure_dashboards_routes())
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not_found",
            "message": "No such API endpoint"
        })),
    )
}

/// The complete embedded-mode application.
///
/// Authentication wraps matched routes only, so static assets and the SPA
/// fallback are served to anyone.
pub fn build_router(state: Arc<AppState>, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, configure_api_routes())
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        .fallback_service(crate::web_server::static_files(&config.static_dir))
        .layer(create_cors_layer(config.cors_origins.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
