mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{body_json, build_test_app, create_user, get_auth, post_json, TEST_PASSWORD};

fn registration(email: &str, role: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": "tap-fixer-2024",
        "full_name": "Sam Fixer",
        "role": role,
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_returns_tokens_and_user(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(app, "/api/v1/auth/register", registration("Sam@Example.com", "provider")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["user"]["email"], "sam@example.com");
    assert_eq!(body["user"]["role"], "PROVIDER");
    assert!(body["user"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_admin_role(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(app, "/api/v1/auth/register", registration("a@example.com", "ADMIN")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_weak_password(pool: PgPool) {
    let app = build_test_app(pool);
    let mut body = registration("weak@example.com", "CUSTOMER");
    body["password"] = json!("short");
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_invalid_email(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(app, "/api/v1/auth/register", registration("not-an-email", "CUSTOMER")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_duplicate_email_conflicts(pool: PgPool) {
    create_user(&pool, "taken@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);
    let response = post_json(app, "/api/v1/auth/register", registration("TAKEN@example.com", "CUSTOMER")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_then_me(pool: PgPool) {
    create_user(&pool, "jo@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": "JO@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = get_auth(app, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["data"]["email"], "jo@example.com");
    assert_eq!(me["data"]["role"], "CUSTOMER");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_wrong_password_is_unauthorized(pool: PgPool) {
    create_user(&pool, "jo@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": "jo@example.com", "password": "wrong-password-1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_unknown_email_is_unauthorized(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": "ghost@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_failures_lock_the_account(pool: PgPool) {
    create_user(&pool, "jo@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);
    let bad = json!({ "email": "jo@example.com", "password": "wrong-password-1" });

    for _ in 0..5 {
        let response = post_json(app.clone(), "/api/v1/auth/login", bad.clone()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let good = json!({ "email": "jo@example.com", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", good).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_the_token(pool: PgPool) {
    create_user(&pool, "jo@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);

    let login = body_json(
        post_json(
            app.clone(),
            "/api/v1/auth/login",
            json!({ "email": "jo@example.com", "password": TEST_PASSWORD }),
        )
        .await,
    )
    .await;
    let refresh = login["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], login["refresh_token"]);

    // The old token was revoked by the rotation.
    let response = post_json(app, "/api/v1/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_without_token_is_unauthorized(pool: PgPool) {
    let app = build_test_app(pool);
    let response = common::get(app, "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
