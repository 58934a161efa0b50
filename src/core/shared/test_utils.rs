use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::enums::UserRole;
use crate::core::shared::state::AppState;
use crate::core::store::{Entity, EntityStore, MemoryStore};
use crate::directory::{User, UserInput};
use crate::security::auth_api::AuthenticatedUser;
use crate::security::jwt::{JwtConfig, JwtManager};
use crate::security::password::{Argon2Config, PasswordHasher};

pub const TEST_JWT_SECRET: &str = "unit-test-secret-unit-test-secret-0123456789";

/// State over an empty in-memory store with cheap hashing parameters.
pub fn test_state() -> Arc<AppState> {
    let jwt = JwtManager::new(JwtConfig::default(), TEST_JWT_SECRET)
        .expect("test secret is long enough");
    let passwords =
        PasswordHasher::new(Argon2Config::low_memory()).expect("low memory params are valid");
    Arc::new(AppState::new(Arc::new(MemoryStore::new()), jwt, passwords))
}

pub fn caller(role: UserRole) -> AuthenticatedUser {
    AuthenticatedUser::new(Uuid::new_v4(), format!("{role}-caller"), role)
}

/// Stores an account under `id`, for rows that reference the caller.
pub async fn add_user(state: &AppState, id: Uuid, username: &str) -> User {
    let user = User::from_input(
        id,
        UserInput {
            username: username.into(),
            email: format!("{username}@example.com"),
            first_name: "Test".into(),
            last_name: "User".into(),
            ..Default::default()
        },
        Utc::now(),
    );
    EntityStore::<User>::insert(state.store.as_ref(), user)
        .await
        .expect("user row is valid")
}
