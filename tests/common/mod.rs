#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crmserver::api_router::build_router;
use crmserver::core::bootstrap::seed_admin;
use crmserver::core::shared::enums::UserRole;
use crmserver::core::store::{Entity, EntityStore, MemoryStore};
use crmserver::directory::{User, UserInput};
use crmserver::security::jwt::{JwtConfig, JwtManager};
use crmserver::security::password::{Argon2Config, PasswordHasher};
use crmserver::{AppConfig, AppState};

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ADMIN_PASSWORD: &str = "admin123";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub fn test_state() -> Arc<AppState> {
    let jwt = JwtManager::new(JwtConfig::default(), JWT_SECRET).unwrap();
    let passwords = PasswordHasher::new(Argon2Config::low_memory()).unwrap();
    Arc::new(AppState::new(Arc::new(MemoryStore::new()), jwt, passwords))
}

/// Embedded-mode app over an empty in-memory store with the default admin
/// seeded.
pub async fn spawn_app() -> TestApp {
    let state = test_state();
    let config = AppConfig::default();
    assert!(seed_admin(&state, &config).await.unwrap());
    TestApp {
        router: build_router(Arc::clone(&state), &config),
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn login(&self, identifier: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({ "identifier": identifier, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    /// Inserts an active account straight into the store.
    pub async fn add_user(&self, username: &str, role: UserRole, password: &str) -> User {
        let mut user = User::from_input(
            Uuid::new_v4(),
            UserInput {
                username: username.into(),
                email: format!("{username}@example.com"),
                first_name: "Test".into(),
                last_name: "User".into(),
                role,
                ..Default::default()
            },
            Utc::now(),
        );
        user.password_hash = self.state.hash_password(password.into()).await.unwrap();
        EntityStore::<User>::insert(self.state.store.as_ref(), user)
            .await
            .unwrap()
    }
}
