mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{spawn_app, ADMIN_PASSWORD};
use crmserver::core::shared::enums::UserRole;

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "crmserver");
}

#[tokio::test]
async fn seeded_admin_can_log_in() {
    let app = spawn_app().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "admin@company.com", "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password_hash").is_none());

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = app
        .request(Method::GET, "/api/v1/auth/me", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert!(me["last_login"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn missing_or_bad_token_is_rejected_everywhere() {
    let app = spawn_app().await;
    for path in [
        "/api/v1/companies",
        "/api/v1/tasks/overdue",
        "/api/v1/dashboard",
        "/api/v1/auth/me",
        "/api/v1/users",
    ] {
        let (status, body) = app.request(Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["error"], "missing_token", "{path}");
        assert!(body.get("id").is_none());

        let (status, body) = app
            .request(Method::GET, path, Some("not.a.jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["error"], "invalid_token");
    }
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = spawn_app().await;
    let admin = app.add_user("old-timer", UserRole::Admin, "old-timer-pass").await;
    let stale = app
        .state
        .jwt
        .issue_at(admin.id, &admin.username, admin.role, Utc::now() - Duration::hours(5))
        .unwrap();

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/companies",
            Some(&stale.access_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "expired_token");
}

#[tokio::test]
async fn token_for_deleted_user_fails_me() {
    let app = spawn_app().await;
    let token = app
        .state
        .jwt
        .issue(Uuid::new_v4(), "ghost", UserRole::Admin)
        .unwrap();
    let (status, _) = app
        .request(Method::GET, "/api/v1/auth/me", Some(&token.access_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login() {
    let app = spawn_app().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "password": "newbie-pass-1",
                "first_name": "New",
                "last_name": "Bie",
                "login": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "employee");
    assert!(body["access_token"].is_string());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "newbie",
                "email": "other@example.com",
                "password": "newbie-pass-1",
                "first_name": "New",
                "last_name": "Bie"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.login("newbie@example.com", "newbie-pass-1").await;
}

#[tokio::test]
async fn unknown_api_path_is_json_not_found() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let (status, body) = app
        .request(Method::GET, "/api/v1/invoices", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn removed_or_disabled_account_loses_access_immediately() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let admin = Some(admin.as_str());

    let gone = app.add_user("gone", UserRole::Sales, "gone-pass-1").await;
    let gone_token = app.login("gone", "gone-pass-1").await;
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", gone.id),
            admin,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = app
        .request(Method::GET, "/api/v1/companies", Some(&gone_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "user_not_found");

    let idle = app.add_user("idle", UserRole::Sales, "idle-pass-1").await;
    let idle_token = app.login("idle", "idle-pass-1").await;
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}", idle.id),
            admin,
            Some(json!({
                "username": "idle",
                "email": "idle@example.com",
                "first_name": "Test",
                "last_name": "User",
                "role": "sales",
                "is_active": false
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .request(Method::GET, "/api/v1/companies", Some(&idle_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_change_applies_to_existing_tokens() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let rep = app.add_user("rep", UserRole::Sales, "rep-pass-1").await;
    let token = app.login("rep", "rep-pass-1").await;
    let token = Some(token.as_str());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/companies",
            token,
            Some(json!({ "name": "Before Demotion" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}", rep.id),
            Some(&admin),
            Some(json!({
                "username": "rep",
                "email": "rep@example.com",
                "first_name": "Test",
                "last_name": "User",
                "role": "support",
                "is_active": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/companies",
            token,
            Some(json!({ "name": "After Demotion" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_permissions");
}
