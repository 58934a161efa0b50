use std::sync::Arc;

use crate::core::store::CrmStore;
use crate::security::auth_api::AuthConfig;
use crate::security::jwt::JwtManager;
use crate::security::password::PasswordHasher;

/// Everything a request handler needs, shared behind one `Arc`.
pub struct AppState {
    pub store: Arc<dyn CrmStore>,
    pub jwt: Arc<JwtManager>,
    pub passwords: Arc<PasswordHasher>,
    pub auth_config: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn CrmStore>, jwt: JwtManager, passwords: PasswordHasher) -> Self {
        Self {
            store,
            jwt: Arc::new(jwt),
            passwords: Arc::new(passwords),
            auth_config: Arc::new(AuthConfig::default()),
        }
    }

    /// Argon2 work runs on the blocking pool.
    pub async fn hash_password(&self, password: String) -> anyhow::Result<String> {
        let hasher = Arc::clone(&self.passwords);
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    pub async fn verify_password(&self, password: String, hash: String) -> anyhow::Result<bool> {
        let hasher = Arc::clone(&self.passwords);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("jwt", &self.jwt)
            .field("auth_config", &self.auth_config)
            .finish_non_exhaustive()
    }
}
