//! Static frontend serving and the development relay.

pub mod relay;

use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::core::config::AppConfig;
use crate::security::create_cors_layer;

pub use relay::{forward, RelayState};

/// Files under `dir`; unknown paths get `index.html` so client-side routes
/// survive a reload.
pub fn static_files(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(dir.join("index.html")))
}

/// Relay mode: static files from this process, `/api/*` forwarded to
/// `config.backend_url` unchanged.
pub fn relay_router(config: &AppConfig) -> anyhow::Result<Router> {
    if config.relays_to_itself() {
        anyhow::bail!(
            "backend_url {} points back at this relay ({}:{})",
            config.backend_url,
            config.host,
            config.port
        );
    }
    let state = RelayState::new(&config.backend_url)?;
    log::info!(
        "Relaying /api to {} and serving {}",
        state.backend_url,
        config.static_dir.display()
    );

    Ok(Router::new()
        .route("/api/*path", axum::routing::any(forward))
        .with_state(state)
        .fallback_service(static_files(&config.static_dir))
        .layer(create_cors_layer(config.cors_origins.clone()))
        .layer(TraceLayer::new_for_http()))
}
