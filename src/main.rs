use dotenvy::dotenv;
use log::{error, info};
use tracing_subscriber::EnvFilter;

use crmserver::api_router::build_router;
use crmserver::core::bootstrap::{build_state, seed_admin};
use crmserver::main_module::run_axum_server;
use crmserver::web_server::relay_router;
use crmserver::{AppConfig, FrontendMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,crmserver=debug,tower_http=info")),
        )
        .init();

    let config = AppConfig::load()?;
    let addr = config.socket_addr()?;
    info!(
        "Starting crmserver {} in {:?} mode",
        env!("CARGO_PKG_VERSION"),
        config.frontend_mode
    );

    let app = match config.frontend_mode {
        FrontendMode::Embedded => {
            let state = build_state(&config).await?;
            match seed_admin(&state, &config).await {
                Ok(true) => info!("Administrator account seeded"),
                Ok(false) => {}
                Err(e) => error!("Failed to seed administrator: {}", e),
            }
            build_router(state, &config)
        }
        FrontendMode::Relay => relay_router(&config)?,
    };

    run_axum_server(app, addr).await?;
    Ok(())
}
