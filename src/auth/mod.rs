//! Credential exchange and session re-validation endpoints.
//!
//! `login` and `register` are reachable anonymously; `me` and `refresh`
//! sit behind the bearer-token middleware like every other route.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::crud::ApiResult;
use crate::api::error::ApiError;
use crate::core::shared::enums::UserRole;
use crate::core::shared::state::AppState;
use crate::core::store::{Entity, EntityStore, StoreError};
use crate::directory::{find_user, User, UserInput};
use crate::security::auth_api::{AuthError, AuthenticatedUser};
use crate::security::jwt::IssuedToken;
use crate::security::validation::Validate;

pub const TOKEN_TYPE: &str = "bearer";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Username or email. `username` and `email` are accepted as aliases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            password: password.into(),
            ..Default::default()
        }
    }

    fn login_name(&self) -> Option<&str> {
        self.identifier
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

impl TokenResponse {
    fn new(token: IssuedToken, user: User) -> Self {
        Self {
            access_token: token.access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: token.expires_in,
            user: user.redacted(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Issue a token for the new account straight away.
    pub login: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

fn issue(state: &AppState, user: &User) -> Result<IssuedToken, AuthError> {
    state
        .jwt
        .issue(user.id, &user.username, user.role)
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(request) = request?;
    let name = request.login_name().ok_or(AuthError::InvalidCredentials)?;

    let Some(mut user) = find_user(state.store.as_ref(), name).await? else {
        info!("Login failed: unknown account {}", name);
        return Err(AuthError::InvalidCredentials.into());
    };

    let verified = state
        .verify_password(request.password.clone(), user.password_hash.clone())
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
    if !verified {
        info!("Login failed: bad password for {}", user.username);
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_active {
        warn!("Login refused: {} is disabled", user.username);
        return Err(AuthError::AccountDisabled.into());
    }

    user.last_login = Some(Utc::now());
    let user = EntityStore::<User>::replace(state.store.as_ref(), user).await?;

    let token = issue(&state, &user)?;
    info!("{} logged in", user.username);
    Ok(Json(TokenResponse::new(token, user)))
}

/// Self-service sign-up. The role is always `employee`; an admin can
/// promote the account afterwards.
pub async fn register(
    State(state): State<Arc<AppState>>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = request?;
    let input = UserInput {
        username: request.username,
        email: request.email,
        password: Some(request.password),
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        role: UserRole::Employee,
        is_active: true,
    };
    input.validate()?;

    let password = input.password.clone().unwrap_or_default();
    let mut user = User::from_input(Uuid::new_v4(), input, Utc::now());
    user.password_hash = state
        .hash_password(password)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = EntityStore::<User>::insert(state.store.as_ref(), user).await?;
    info!("Registered {} <{}>", user.username, user.email);

    let token = if request.login {
        Some(issue(&state, &user)?)
    } else {
        None
    };
    let response = RegisterResponse {
        user: user.redacted(),
        token_type: token.as_ref().map(|_| TOKEN_TYPE.to_string()),
        expires_in: token.as_ref().map(|t| t.expires_in),
        access_token: token.map(|t| t.access_token),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// The account behind a token must still exist and be active.
async fn current_user(state: &AppState, caller: &AuthenticatedUser) -> ApiResult<User> {
    let user = match EntityStore::<User>::get(state.store.as_ref(), caller.user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(AuthError::UserNotFound.into()),
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(AuthError::InvalidToken.into());
    }
    Ok(user)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Json<User>> {
    let user = current_user(&state, &caller).await?;
    Ok(Json(user.redacted()))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Json<TokenResponse>> {
    let user = current_user(&state, &caller).await?;
    let token = issue(&state, &user)?;
    Ok(Json(TokenResponse::new(token, user)))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
}
