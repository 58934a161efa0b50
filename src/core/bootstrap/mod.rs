//! Startup wiring: store selection, shared state and the first admin
//! account.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::config::AppConfig;
use crate::core::shared::enums::UserRole;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{create_conn, redact_database_url, run_migrations};
use crate::core::store::{CrmStore, Entity, EntityStore, MemoryStore, PgStore};
use crate::directory::{find_user, User, UserInput};
use crate::security::jwt::{JwtConfig, JwtManager};
use crate::security::password::PasswordHasher;

/// In-memory store for `memory://`, otherwise a migrated Postgres pool.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn CrmStore>> {
    if config.uses_memory_store() {
        info!("Using in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let url = config.database_url.clone();
    let pool_size = config.database_pool_size;
    info!("Connecting to {}", redact_database_url(&url));

    let pool = tokio::task::spawn_blocking(move || -> Result<_> {
        let pool = create_conn(&url, pool_size).context("failed to create database pool")?;
        run_migrations(&pool).map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
        Ok(pool)
    })
    .await??;

    Ok(Arc::new(PgStore::new(pool)))
}

/// The configured secret, or a per-process random one. Tokens signed with a
/// generated secret die with the process.
pub fn jwt_secret(config: &AppConfig) -> String {
    if !config.jwt_secret.trim().is_empty() {
        return config.jwt_secret.clone();
    }
    warn!("No jwt_secret configured, generating one; sessions will not survive a restart");
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub async fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    let store = build_store(config).await?;
    let jwt_config = JwtConfig {
        access_token_expiry_minutes: config.token_ttl_minutes,
        ..JwtConfig::default()
    };
    let jwt = JwtManager::new(jwt_config, &jwt_secret(config))?;
    let passwords = PasswordHasher::with_defaults()?;
    Ok(Arc::new(AppState::new(store, jwt, passwords)))
}

/// Creates the configured admin account unless the username or email is
/// already taken. Returns whether an account was created.
pub async fn seed_admin(state: &AppState, config: &AppConfig) -> Result<bool> {
    if !config.seed_admin {
        return Ok(false);
    }

    let store = state.store.as_ref();
    if find_user(store, &config.seed_admin_username).await?.is_some()
        || find_user(store, &config.seed_admin_email).await?.is_some()
    {
        return Ok(false);
    }

    let input = UserInput {
        username: config.seed_admin_username.clone(),
        email: config.seed_admin_email.clone(),
        first_name: "System".to_string(),
        last_name: "Administrator".to_string(),
        role: UserRole::Admin,
        is_active: true,
        ..UserInput::default()
    };
    let mut admin = User::from_input(Uuid::new_v4(), input, Utc::now());
    admin.password_hash = state
        .hash_password(config.seed_admin_password.clone())
        .await?;

    let admin = EntityStore::<User>::insert(store, admin).await?;
    warn!(
        "Created admin account {} ({}) with the configured default password; change it",
        admin.username,
        admin.full_name()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::test_state;

    #[test]
    fn test_generated_secret_is_long_enough() {
        let secret = jwt_secret(&AppConfig::default());
        assert!(secret.len() >= crate::security::jwt::MIN_SECRET_LENGTH);
        assert_ne!(secret, jwt_secret(&AppConfig::default()));

        let config = AppConfig {
            jwt_secret: "configured".into(),
            ..AppConfig::default()
        };
        assert_eq!(jwt_secret(&config), "configured");
    }

    #[tokio::test]
    async fn test_seed_admin_once() {
        let state = test_state();
        let config = AppConfig::default();

        assert!(seed_admin(&state, &config).await.unwrap());
        assert!(!seed_admin(&state, &config).await.unwrap());

        let admin = find_user(state.store.as_ref(), "admin@company.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(state
            .verify_password("admin123".into(), admin.password_hash)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_seed_disabled() {
        let state = test_state();
        let config = AppConfig {
            seed_admin: false,
            ..AppConfig::default()
        };
        assert!(!seed_admin(&state, &config).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_selected() {
        let state = build_state(&AppConfig::default()).await.unwrap();
        let users = EntityStore::<User>::list(
            state.store.as_ref(),
            Default::default(),
            crate::core::store::Pagination::all(),
        )
        .await
        .unwrap();
        assert!(users.is_empty());
    }
}
