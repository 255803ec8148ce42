//! Messaging, disputes and notifications: the parts of a booking that
//! happen between the two parties and the admins.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use servicematch_api::notifications::NotificationRouter;
use servicematch_api::ws::WsManager;
use servicematch_events::{types, EventBus, PlatformEvent};
use sqlx::PgPool;
use tokio::sync::broadcast;

use common::{
    body_json, build_test_app, build_test_app_with_payments, create_provider, create_user,
    get_auth, post_json_auth, seed_booking, token,
};

/// Route everything published so far through a real notification router.
async fn drain(pool: &PgPool, rx: &mut broadcast::Receiver<PlatformEvent>) -> usize {
    let router = NotificationRouter::new(pool.clone(), Arc::new(WsManager::new()));
    let mut routed = 0;
    while let Ok(event) = rx.try_recv() {
        router.route_event(&event).await.unwrap();
        routed += 1;
    }
    routed
}

fn subscribe(bus: &Arc<EventBus>) -> broadcast::Receiver<PlatformEvent> {
    bus.subscribe()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn messages_are_idempotent_on_client_id(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;
    let app = build_test_app(pool);
    let uri = format!("/api/v1/bookings/{}/messages", booking.id);

    let first = post_json_auth(
        app.clone(),
        &uri,
        json!({ "body": "  Is Tuesday ok?  ", "client_id": "c-1" }),
        &token(&customer),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_json(first).await;
    assert_eq!(first["data"]["body"], "Is Tuesday ok?");

    let retry = post_json_auth(
        app.clone(),
        &uri,
        json!({ "body": "Is Tuesday ok?", "client_id": "c-1" }),
        &token(&customer),
    )
    .await;
    assert_eq!(retry.status(), StatusCode::OK);
    assert_eq!(body_json(retry).await["data"]["id"], first["data"]["id"]);

    let thread = body_json(get_auth(app, &uri, &token(&provider)).await).await;
    assert_eq!(thread["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn outsiders_and_admins_cannot_post(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let outsider = create_user(&pool, "nosy@example.com", "CUSTOMER").await;
    let admin = create_user(&pool, "admin@example.com", "ADMIN").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;
    let app = build_test_app(pool);
    let uri = format!("/api/v1/bookings/{}/messages", booking.id);
    let body = json!({ "body": "hello", "client_id": "x" });

    let response = post_json_auth(app.clone(), &uri, body.clone(), &token(&outsider)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(app.clone(), &uri, body, &token(&admin)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admins may still read the thread.
    let response = get_auth(app, &uri, &token(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_message_is_rejected(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/messages", booking.id),
        json!({ "body": "   ", "client_id": "c-2" }),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn message_notifies_the_other_party(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;
    let test_app = common::build_test_app_with_payments(pool.clone());
    let mut rx = subscribe(&test_app.event_bus);
    let app = test_app.router.clone();

    post_json_auth(
        app.clone(),
        &format!("/api/v1/bookings/{}/messages", booking.id),
        json!({ "body": "On my way", "client_id": "p-1" }),
        &token(&provider),
    )
    .await;
    assert_eq!(drain(&pool, &mut rx).await, 1);

    let count = body_json(
        get_auth(app.clone(), "/api/v1/notifications/unread-count", &token(&customer)).await,
    )
    .await;
    assert_eq!(count["data"]["unread_count"], 1);

    let list = body_json(get_auth(app.clone(), "/api/v1/notifications", &token(&customer)).await).await;
    let first = &list["data"][0];
    assert_eq!(first["kind"], "new_message");
    assert_eq!(first["body"], "On my way");
    assert_eq!(first["link"], format!("/bookings/{}", booking.id));

    // The sender is not notified of their own message.
    let sender = body_json(
        get_auth(app.clone(), "/api/v1/notifications/unread-count", &token(&provider)).await,
    )
    .await;
    assert_eq!(sender["data"]["unread_count"], 0);

    let id = first["id"].as_i64().unwrap();
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/notifications/{id}/read"),
        json!({}),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Someone else's notification is invisible.
    let response = post_json_auth(
        app,
        &format!("/api/v1/notifications/{id}/read"),
        json!({}),
        &token(&provider),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dispute_resolved_for_customer_refunds(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let admin = create_user(&pool, "admin@example.com", "ADMIN").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;

    let test_app = build_test_app_with_payments(pool.clone());
    let mut rx = subscribe(&test_app.event_bus);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bookings/{}/dispute", booking.id),
        json!({ "reason": "Provider never turned up on the agreed day." }),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let opened = body_json(response).await;
    assert_eq!(opened["data"]["booking"]["status"], "DISPUTED");
    assert_eq!(opened["data"]["dispute"]["status"], "OPEN");
    let dispute_id = opened["data"]["dispute"]["id"].as_i64().unwrap();

    // Provider and admin hear about it; the customer who opened it does not.
    drain(&pool, &mut rx).await;
    for (user, expected) in [(&provider, 1), (&admin, 1), (&customer, 0)] {
        let count = body_json(
            get_auth(app.clone(), "/api/v1/notifications/unread-count", &token(user)).await,
        )
        .await;
        assert_eq!(count["data"]["unread_count"], expected, "{}", user.email);
    }

    // A second dispute on the same booking is refused.
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bookings/{}/dispute", booking.id),
        json!({ "reason": "Opening another one just in case." }),
        &token(&provider),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/admin/disputes/{dispute_id}/resolve"),
        json!({ "outcome": "Customer", "notes": "No-show confirmed" }),
        &token(&admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let resolved = body_json(response).await;
    assert_eq!(resolved["data"]["status"], "RESOLVED_CUSTOMER");
    assert!(gateway.calls().contains(&"refund:pi_seed:10000".to_string()));

    let booking_view = body_json(
        get_auth(app.clone(), &format!("/api/v1/bookings/{}", booking.id), &token(&customer)).await,
    )
    .await;
    assert_eq!(booking_view["data"]["status"], "REFUNDED");

    let dispute = get_auth(app, &format!("/api/v1/disputes/{dispute_id}"), &token(&provider)).await;
    assert_eq!(dispute.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_picks_up_dispute_for_review(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let admin = create_user(&pool, "admin@example.com", "ADMIN").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;
    let app = build_test_app(pool);

    let opened = body_json(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{}/dispute", booking.id),
            json!({ "reason": "Radiator still cold after the visit." }),
            &token(&customer),
        )
        .await,
    )
    .await;
    let dispute_id = opened["data"]["dispute"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/v1/admin/disputes/{dispute_id}/review");

    let forbidden = post_json_auth(app.clone(), &review_uri, json!({}), &token(&customer)).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app.clone(), &review_uri, json!({}), &token(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "UNDER_REVIEW");

    let again = post_json_auth(app.clone(), &review_uri, json!({}), &token(&admin)).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let queue = body_json(
        get_auth(
            app.clone(),
            "/api/v1/admin/disputes?status=UNDER_REVIEW",
            &token(&admin),
        )
        .await,
    )
    .await;
    assert_eq!(queue["pagination"]["total"], 1);

    let stats = body_json(get_auth(app.clone(), "/api/v1/admin/stats", &token(&admin)).await).await;
    assert_eq!(stats["data"]["open_disputes"], 1);

    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/disputes/{dispute_id}/resolve"),
        json!({ "outcome": "provider" }),
        &token(&admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "RESOLVED_PROVIDER");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn one_failed_delivery_does_not_block_other_recipients(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let admin = create_user(&pool, "admin@example.com", "ADMIN").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;

    // The first recipient has no user row, so its insert fails.
    let event = PlatformEvent::new(types::DISPUTE_OPENED)
        .with_actor(customer.id)
        .with_recipients([9_999_999, provider.id])
        .with_payload(json!({ "booking_id": booking.id, "title": "Leaking tap" }));

    let router = NotificationRouter::new(pool.clone(), Arc::new(WsManager::new()));
    let delivered = router.route_event(&event).await.unwrap();
    assert_eq!(delivered, 2, "provider and admin still notified");

    let app = build_test_app(pool);
    for user in [&provider, &admin] {
        let count = body_json(
            get_auth(app.clone(), "/api/v1/notifications/unread-count", &token(user)).await,
        )
        .await;
        assert_eq!(count["data"]["unread_count"], 1, "{}", user.email);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dispute_reason_must_be_descriptive(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, true).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/dispute", booking.id),
        json!({ "reason": "bad" }),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unpaid_booking_cannot_be_disputed(pool: PgPool) {
    let customer = create_user(&pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(&pool, "pro@example.com").await;
    let booking = seed_booking(&pool, &customer, &provider, false).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/dispute", booking.id),
        json!({ "reason": "Changed my mind about the whole thing." }),
        &token(&customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
