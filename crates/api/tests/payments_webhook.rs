//! Stripe webhook receiver and the payment set-up endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use servicematch_integrations::stripe::sign_webhook_payload;
use sqlx::PgPool;

use common::{
    body_json, build_test_app, build_test_app_with_payments, checkout_completed, create_provider,
    create_user, deliver_webhook, get_auth, post_json_auth, post_raw, put_json_auth, seed_booking,
    token, WEBHOOK_SECRET,
};
use servicematch_db::repositories::BookingRepo;

const WEBHOOK: &str = "/api/v1/payments/webhook";

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_without_payments_is_unavailable(pool: PgPool) {
    let app = build_test_app(pool);
    let payload = checkout_completed(1, "pi_1");
    let response = post_raw(app, WEBHOOK, payload, &[("stripe-signature", "t=1,v1=00")]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_requires_signature_header(pool: PgPool) {
    let app = build_test_app_with_payments(pool).router;
    let response = post_raw(app, WEBHOOK, checkout_completed(1, "pi_1"), &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_rejects_forged_signature(pool: PgPool) {
    let app = build_test_app_with_payments(pool).router;
    let payload = checkout_completed(1, "pi_1");
    let now = chrono::Utc::now().timestamp();
    let forged = sign_webhook_payload(&payload, "whsec_wrong", now);
    let header = format!("t={now},v1={forged}");

    let response = post_raw(app, WEBHOOK, payload, &[("stripe-signature", header.as_str())]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_rejects_stale_timestamp(pool: PgPool) {
    let app = build_test_app_with_payments(pool).router;
    let payload = checkout_completed(1, "pi_1");
    let old = chrono::Utc::now().timestamp() - 3_600;
    let signature = sign_webhook_payload(&payload, WEBHOOK_SECRET, old);
    let header = format!("t={old},v1={signature}");

    let response = post_raw(app, WEBHOOK, payload, &[("stripe-signature", header.as_str())]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn checkout_completed_marks_booking_paid_once(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;

    let test_app = build_test_app_with_payments(pool.clone());
    let mut rx = test_app.event_bus.subscribe();
    let app = test_app.router.clone();

    for _ in 0..2 {
        let response = deliver_webhook(app.clone(), checkout_completed(booking.id, "pi_42")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let stored = BookingRepo::find_by_id(&pool, booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "PAID");
    assert_eq!(stored.stripe_payment_intent_id.as_deref(), Some("pi_42"));

    // Redelivery does not announce the payment twice.
    let mut paid_events = 0;
    while let Ok(event) = rx.try_recv() {
        if event.event_type == servicematch_events::types::BOOKING_PAID {
            paid_events += 1;
        }
    }
    assert_eq!(paid_events, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn checkout_completed_falls_back_to_session_lookup(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;
    BookingRepo::set_checkout_session(&pool, booking.id, "cs_lookup")
        .await
        .unwrap();

    let app = build_test_app_with_payments(pool.clone()).router;
    let payload = json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_lookup",
            "payment_intent": "pi_lookup",
            "payment_status": "paid"
        }}
    })
    .to_string()
    .into_bytes();

    let response = deliver_webhook(app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = BookingRepo::find_by_id(&pool, booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "PAID");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unpaid_checkout_is_ignored(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;

    let app = build_test_app_with_payments(pool.clone()).router;
    let payload = json!({
        "id": "evt_2",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": format!("cs_test_{}", booking.id),
            "payment_status": "unpaid",
            "metadata": { "booking_id": booking.id.to_string() }
        }}
    })
    .to_string()
    .into_bytes();

    let response = deliver_webhook(app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = BookingRepo::find_by_id(&pool, booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "PENDING_PAYMENT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_events_are_acknowledged(pool: PgPool) {
    let app = build_test_app_with_payments(pool).router;
    let payload = json!({
        "id": "evt_3",
        "type": "invoice.created",
        "data": { "object": { "id": "in_1" } }
    })
    .to_string()
    .into_bytes();

    let response = deliver_webhook(app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payout_onboarding_then_account_update(pool: PgPool) {
    let provider = create_provider(&pool, "pro@example.com").await;
    let test_app = build_test_app_with_payments(pool);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();
    let t = token(&provider);

    let response =
        post_json_auth(app.clone(), "/api/v1/me/provider-profile/payouts", json!({}), &t).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["url"], "https://connect.test/acct_test_1");
    assert_eq!(body["data"]["payouts_enabled"], false);

    // A second call reuses the account.
    post_json_auth(app.clone(), "/api/v1/me/provider-profile/payouts", json!({}), &t).await;
    let accounts = gateway
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("account:"))
        .count();
    assert_eq!(accounts, 1);

    let payload = json!({
        "id": "evt_4",
        "type": "account.updated",
        "data": { "object": { "id": "acct_test_1", "payouts_enabled": true } }
    })
    .to_string()
    .into_bytes();
    assert_eq!(deliver_webhook(app.clone(), payload).await.status(), StatusCode::OK);

    let profile = body_json(get_auth(app, "/api/v1/me/provider-profile", &t).await).await;
    assert_eq!(profile["data"]["payouts_enabled"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn checkout_without_payments_is_unavailable(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/checkout", booking.id),
        json!({}),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn paid_booking_cannot_be_checked_out_again(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;
    let app = build_test_app_with_payments(pool).router;

    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/checkout", booking.id),
        json!({}),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn provider_profile_update_derives_region(pool: PgPool) {
    let provider = create_user(&pool, "new@example.com", "PROVIDER").await;
    let app = build_test_app(pool);

    let response = put_json_auth(
        app,
        "/api/v1/me/provider-profile",
        json!({
            "business_name": "Northern Sparks",
            "categories": ["electrical", "handyman"],
            "postcode": "m11ae"
        }),
        &token(&provider),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["postcode"], "M1 1AE");
    assert_eq!(body["data"]["region"], "north_west");
    assert_eq!(body["data"]["service_radius_km"], 25);
}
