use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::crud::{self, ApiResult};
use crate::api::error::ApiError;
use crate::core::shared::enums::UserRole;
use crate::core::shared::schema::users;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::contains_ci;
use crate::core::store::{CrmStore, Entity, EntityStore, StoreError};
use crate::security::auth_api::{AuthenticatedUser, Module};
use crate::security::password::validate_password_policy;
use crate::security::validation::{Validate, ValidationError, ValidationResult, Validator};

/// Login account. `password_hash` is never serialized once empty, and
/// [`Entity::redacted`] empties it before a row leaves the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    /// Required on create; on update a new password replaces the old one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl Default for UserInput {
    fn default() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            password: None,
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            role: UserRole::Employee,
            is_active: true,
        }
    }
}

impl Validate for UserInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .username(&self.username)
            .email(&self.email)
            .text(&self.first_name, "first_name", 50)
            .text(&self.last_name, "last_name", 50)
            .optional_phone(self.phone.as_deref())
            .custom(|| {
                self.password
                    .as_deref()
                    .and_then(|p| validate_password_policy(p).err())
            })
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "User";
    const MODULE: Module = Module::Users;

    type Input = UserInput;
    type Filter = UserFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The hash is left empty; callers hash `input.password` themselves.
    fn from_input(id: Uuid, input: UserInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: input.username,
            email: input.email,
            password_hash: String::new(),
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            role: input.role,
            is_active: input.is_active,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: UserInput, now: DateTime<Utc>) {
        self.username = input.username;
        self.email = input.email;
        self.first_name = input.first_name;
        self.last_name = input.last_name;
        self.phone = input.phone;
        self.role = input.role;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn matches(&self, f: &UserFilter) -> bool {
        f.role.map_or(true, |r| self.role == r)
            && f.is_active.map_or(true, |a| self.is_active == a)
            && f.username.as_deref().map_or(true, |u| contains_ci(&self.username, u))
            && f.email.as_deref().map_or(true, |e| contains_ci(&self.email, e))
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![
            ("username", self.username.to_lowercase()),
            ("email", self.email.to_lowercase()),
        ]
    }

    fn redacted(mut self) -> Self {
        self.password_hash.clear();
        self
    }
}

/// Exact, case-insensitive lookup by username or email.
pub async fn find_user(store: &dyn CrmStore, identifier: &str) -> Result<Option<User>, StoreError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(None);
    }
    store.find_user_by_login(identifier).await
}

fn password_required() -> ApiError {
    ApiError::Validation(ValidationError::Required("password".to_string()).to_string())
}

async fn hash(state: &AppState, password: String) -> ApiResult<String> {
    state.hash_password(password).await.map_err(|e| {
        warn!("Password hashing failed: {}", e);
        ApiError::Internal(e.to_string())
    })
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    input: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    caller.require_write(Module::Users)?;
    let Json(mut input) = input?;
    input.validate()?;

    let password = input
        .password
        .take()
        .filter(|p| !p.is_empty())
        .ok_or_else(password_required)?;

    let mut user = User::from_input(Uuid::new_v4(), input, Utc::now());
    user.password_hash = hash(&state, password).await?;

    let user = EntityStore::<User>::insert(state.store.as_ref(), user).await?;
    info!("{} created user {} ({})", caller.username, user.username, user.role);
    Ok((StatusCode::CREATED, Json(user.redacted())))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
    input: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Json<User>> {
    caller.require_write(Module::Users)?;
    let Path(id) = id?;
    let Json(mut input) = input?;
    input.validate()?;

    let mut user = EntityStore::<User>::get(state.store.as_ref(), id).await?;
    let new_password = input.password.take().filter(|p| !p.is_empty());
    user.apply_input(input, Utc::now());
    if let Some(password) = new_password {
        user.password_hash = hash(&state, password).await?;
    }

    let user = EntityStore::<User>::replace(state.store.as_ref(), user).await?;
    info!("{} updated user {}", caller.username, user.username);
    Ok(Json(user.redacted()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    caller.require_write(Module::Users)?;
    let Path(id) = id?;

    if id == caller.user_id {
        return Err(ApiError::Forbidden("You cannot delete your own account".to_string()));
    }

    EntityStore::<User>::remove(state.store.as_ref(), id).await?;
    info!("{} deleted user {}", caller.username, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(crud::list::<User>).post(create_user))
        .route(
            "/:id",
            get(crud::fetch::<User>).put(update_user).delete(delete_user),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::{caller, test_state};

    fn input(username: &str) -> UserInput {
        UserInput {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: Some("correct-horse".to_string()),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_input_validation() {
        assert!(input("grace").validate().is_ok());

        let mut short = input("grace");
        short.password = Some("short".to_string());
        assert!(short.validate().is_err());

        let mut unnamed = input("grace");
        unnamed.first_name.clear();
        let err = unnamed.validate().unwrap_err();
        assert!(err.summary().contains("first_name"));
    }

    #[test]
    fn test_names_and_phone_fit_columns() {
        let mut wide = input("grace");
        wide.first_name = "G".repeat(51);
        wide.phone = Some("+1 555 010 2030 0000 1".into());
        let err = wide.validate().unwrap_err();
        assert_eq!(err.errors().len(), 2, "{}", err.summary());

        wide.first_name = "G".repeat(50);
        wide.phone = Some("+1 (555) 010-2030".into());
        assert!(wide.validate().is_ok());
    }

    #[test]
    fn test_redacted_drops_hash() {
        let mut user = User::from_input(Uuid::new_v4(), input("grace"), Utc::now());
        user.password_hash = "$argon2id$...".to_string();

        let json = serde_json::to_value(user.clone().redacted()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "employee");
    }

    #[tokio::test]
    async fn test_create_hashes_and_find_user() {
        let state = test_state();
        let (status, Json(created)) = create_user(
            State(Arc::clone(&state)),
            Extension(caller(UserRole::Admin)),
            Ok(Json(input("grace"))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.password_hash.is_empty());

        let stored = find_user(state.store.as_ref(), "GRACE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, created.id);
        assert!(state
            .verify_password("correct-horse".into(), stored.password_hash)
            .await
            .unwrap());

        assert!(find_user(state.store.as_ref(), "grac").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_user_is_exact_among_many_prefix_matches() {
        let state = test_state();
        let store = state.store.as_ref();
        let base = Utc::now();

        let mut bob = User::from_input(Uuid::new_v4(), input("bob"), base);
        bob.email = "robert@example.com".to_string();
        EntityStore::<User>::insert(store, bob.clone()).await.unwrap();
        for i in 0..=100 {
            let newer = User::from_input(
                Uuid::new_v4(),
                input(&format!("bob{i}")),
                base + chrono::Duration::seconds(i + 1),
            );
            EntityStore::<User>::insert(store, newer).await.unwrap();
        }

        let found = find_user(store, "BOB").await.unwrap().unwrap();
        assert_eq!(found.id, bob.id);
        let found = find_user(store, " Robert@Example.com ").await.unwrap().unwrap();
        assert_eq!(found.id, bob.id);
        assert!(find_user(store, "bo").await.unwrap().is_none());
        assert!(find_user(store, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_requires_password_and_admin() {
        let state = test_state();
        let mut no_password = input("grace");
        no_password.password = None;
        let err = create_user(
            State(Arc::clone(&state)),
            Extension(caller(UserRole::Admin)),
            Ok(Json(no_password)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "validation_error");

        let err = create_user(
            State(state),
            Extension(caller(UserRole::Manager)),
            Ok(Json(input("grace"))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let state = test_state();
        let me = caller(UserRole::Admin);
        let err = delete_user(State(state), Extension(me.clone()), Ok(Path(me.user_id)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
