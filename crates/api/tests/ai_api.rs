//! Pricing and diagnosis helpers with no LLM configured: every answer
//! comes from the static tables.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{body_json, build_test_app, create_user, get_auth, post_json, post_json_auth, token};

#[sqlx::test(migrations = "../../db/migrations")]
async fn fair_price_uses_fallback_and_assesses_quote(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);
    let t = token(&customer);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/ai/fair-price",
        json!({ "category": "plumbing", "postcode": "SW1A 1AA" }),
        &t,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["region"], "london");
    assert_eq!(body["data"]["estimate"]["source"], "fallback");
    assert!(body["data"]["assessment"].is_null());
    let typical = body["data"]["estimate"]["typical"].as_i64().unwrap();
    assert!(body["data"]["display"]["typical"].as_str().unwrap().starts_with('£'));

    let response = post_json_auth(
        app.clone(),
        "/api/v1/ai/fair-price",
        json!({ "category": "plumbing", "postcode": "SW1A 1AA", "quoted_cents": typical }),
        &t,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["assessment"]["verdict"], "FAIR");

    let history = body_json(get_auth(app, "/api/v1/ai/history", &t).await).await;
    assert_eq!(history["data"]["price_checks"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fair_price_rejects_unknown_category(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/ai/fair-price",
        json!({ "category": "astrology", "region": "london" }),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn snap_fix_flags_gas_as_an_emergency(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let app = build_test_app(pool);
    let t = token(&customer);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/ai/snap-fix",
        json!({ "description": "I can smell gas near the cooker in the kitchen" }),
        &t,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["category"], "heating");
    assert_eq!(body["data"]["urgency"], "EMERGENCY");
    assert_eq!(body["data"]["source"], "fallback");
    assert!(body["data"]["estimated_range"].as_str().unwrap().contains(" - "));

    let history = body_json(get_auth(app, "/api/v1/ai/history", &t).await).await;
    assert_eq!(history["data"]["diagnoses"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ai_helpers_require_login(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/ai/snap-fix",
        json!({ "description": "Kitchen tap keeps dripping all night" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
