mod common;

use serde_json::json;
use warp::test::request;

use common::{authed, body, TestApp};

#[tokio::test]
async fn create_user_success() {
    let app = TestApp::new();

    let res = app
        .send(request().method("POST").path("/api/user/create").json(&json!({
            "email": "test@example.com",
            "password": "testpass123",
            "name": "Test Name",
        })))
        .await;

    assert_eq!(res.status(), 201);
    let payload = body(&res);
    assert_eq!(payload["email"], "test@example.com");
    assert_eq!(payload["name"], "Test Name");
    assert!(payload.get("password").is_none());
}

#[tokio::test]
async fn user_with_email_exists_error() {
    let app = TestApp::new();
    app.user("test@example.com", "testpass123").await;

    let res = app
        .send(request().method("POST").path("/api/user/create").json(&json!({
            "email": "test@example.com",
            "password": "testpass123",
        })))
        .await;

    assert_eq!(res.status(), 400);
    assert_eq!(body(&res)["field"], "email");
}

#[tokio::test]
async fn password_too_short_error() {
    let app = TestApp::new();

    let res = app
        .send(request().method("POST").path("/api/user/create").json(&json!({
            "email": "test@example.com",
            "password": "pw",
            "name": "Test Name",
        })))
        .await;

    assert_eq!(res.status(), 400);

    let token = app
        .send(request().method("POST").path("/api/user/token").json(&json!({
            "email": "test@example.com",
            "password": "pw",
        })))
        .await;
    assert_eq!(token.status(), 400);
}

#[tokio::test]
async fn create_token_for_user() {
    let app = TestApp::new();

    let token = app.user("test@example.com", "test-user-password123").await;

    assert!(!token.is_empty());
}

#[tokio::test]
async fn token_for_uppercase_domain_login() {
    let app = TestApp::new();
    app.user("test@EXAMPLE.com", "goodpass").await;

    let res = app
        .send(request().method("POST").path("/api/user/token").json(&json!({
            "email": "test@example.com",
            "password": "goodpass",
        })))
        .await;

    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn create_token_bad_credentials() {
    let app = TestApp::new();
    app.user("test@example.com", "goodpass").await;

    let res = app
        .send(request().method("POST").path("/api/user/token").json(&json!({
            "email": "test@example.com",
            "password": "badpass",
        })))
        .await;

    assert_eq!(res.status(), 400);
    assert!(body(&res).get("token").is_none());
}

#[tokio::test]
async fn create_token_blank_password() {
    let app = TestApp::new();
    app.user("test@example.com", "goodpass").await;

    let res = app
        .send(request().method("POST").path("/api/user/token").json(&json!({
            "email": "test@example.com",
            "password": "",
        })))
        .await;

    assert_eq!(res.status(), 400);
    assert!(body(&res).get("token").is_none());
}

#[tokio::test]
async fn retrieve_user_unauthorized() {
    let app = TestApp::new();

    let res = app.send(request().method("GET").path("/api/user/me")).await;

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::new();

    let res = app.send(authed("GET", "/api/user/me", "notatoken")).await;

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn retrieve_profile_success() {
    let app = TestApp::new();
    let token = app.user("test@example.com", "testpass123").await;

    let res = app.send(authed("GET", "/api/user/me", &token)).await;

    assert_eq!(res.status(), 200);
    assert_eq!(
        body(&res),
        json!({ "name": "Test Name", "email": "test@example.com" })
    );
}

#[tokio::test]
async fn post_me_not_allowed() {
    let app = TestApp::new();
    let token = app.user("test@example.com", "testpass123").await;

    let res = app
        .send(authed("POST", "/api/user/me", &token).json(&json!({})))
        .await;

    assert_eq!(res.status(), 405);
}

#[tokio::test]
async fn update_user_profile() {
    let app = TestApp::new();
    let token = app.user("test@example.com", "testpass123").await;

    let res = app
        .send(authed("PATCH", "/api/user/me", &token).json(&json!({
            "name": "Updated name",
            "password": "newpassword123",
        })))
        .await;

    assert_eq!(res.status(), 200);
    assert_eq!(body(&res)["name"], "Updated name");

    let old = app
        .send(request().method("POST").path("/api/user/token").json(&json!({
            "email": "test@example.com",
            "password": "testpass123",
        })))
        .await;
    assert_eq!(old.status(), 400);

    let new = app
        .send(request().method("POST").path("/api/user/token").json(&json!({
            "email": "test@example.com",
            "password": "newpassword123",
        })))
        .await;
    assert_eq!(new.status(), 200);
}

#[tokio::test]
async fn full_profile_update_requires_password() {
    let app = TestApp::new();
    let token = app.user("test@example.com", "testpass123").await;

    let res = app
        .send(authed("PUT", "/api/user/me", &token).json(&json!({
            "email": "other@example.com",
        })))
        .await;

    assert_eq!(res.status(), 400);
    assert_eq!(body(&res)["field"], "password");
}
