//! End-to-end job lifecycle over HTTP: request, quote, accept, pay, work,
//! review. Payments go through the recording gateway.

mod common;

use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;

use common::{
    body_json, build_test_app_with_payments, checkout_completed, create_provider, create_user,
    deliver_webhook, get_auth, post_json_auth, token,
};
use servicematch_db::repositories::ProviderProfileRepo;

struct Parties {
    customer: String,
    provider: String,
}

async fn parties(pool: &PgPool) -> Parties {
    let customer = create_user(pool, "cust@example.com", "CUSTOMER").await;
    let provider = create_provider(pool, "pro@example.com").await;
    ProviderProfileRepo::set_stripe_account(pool, provider.id, "acct_test_1")
        .await
        .unwrap();
    ProviderProfileRepo::set_payouts_enabled(pool, "acct_test_1", true)
        .await
        .unwrap();
    Parties {
        customer: token(&customer),
        provider: token(&provider),
    }
}

async fn json_ok(response: axum::response::Response, expected: StatusCode) -> Value {
    let status = response.status();
    let body = body_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body
}

/// Post a request, quote it and accept the quote. Returns the booking id.
async fn book_job(app: &Router, p: &Parties) -> i64 {
    let request = json_ok(
        post_json_auth(
            app.clone(),
            "/api/v1/quote-requests",
            json!({
                "title": "Leaking kitchen tap",
                "description": "Mixer tap drips constantly, probably a worn cartridge.",
                "category": "plumbing",
                "postcode": "sw1a1aa",
                "budget_cents": 15_000
            }),
            &p.customer,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(request["data"]["postcode"], "SW1A 1AA");
    assert_eq!(request["data"]["region"], "london");
    assert_eq!(request["data"]["status"], "OPEN");
    let request_id = request["data"]["id"].as_i64().unwrap();

    let board = json_ok(
        get_auth(app.clone(), "/api/v1/quote-requests", &p.provider).await,
        StatusCode::OK,
    )
    .await;
    assert!(board["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == request_id));

    let quote = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/quote-requests/{request_id}/quotes"),
            json!({ "amount_cents": 12_000, "message": "Can replace the cartridge", "estimated_hours": 2 }),
            &p.provider,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let quote_id = quote["data"]["id"].as_i64().unwrap();

    let booking = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/quotes/{quote_id}/accept"),
            json!({}),
            &p.customer,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(booking["data"]["status"], "PENDING_PAYMENT");
    assert_eq!(booking["data"]["amount_cents"], 12_000);
    assert_eq!(booking["data"]["platform_fee_cents"], 2_160);
    assert_eq!(booking["data"]["provider_earnings_cents"], 9_840);
    booking["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_job_lifecycle(pool: PgPool) {
    let p = parties(&pool).await;
    let test_app = build_test_app_with_payments(pool);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();

    let booking_id = book_job(&app, &p).await;

    let checkout = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/checkout"),
            json!({}),
            &p.customer,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(checkout["data"]["id"], format!("cs_test_{booking_id}"));

    let ack = json_ok(
        deliver_webhook(app.clone(), checkout_completed(booking_id, "pi_test_1")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(ack["received"], true);

    let booking = json_ok(
        get_auth(app.clone(), &format!("/api/v1/bookings/{booking_id}"), &p.provider).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(booking["data"]["status"], "PAID");
    assert_eq!(booking["data"]["status_label"], "Paid");
    assert!(booking["data"].get("review").is_none());

    let started = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/start"),
            json!({}),
            &p.provider,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(started["data"]["status"], "IN_PROGRESS");

    let completed = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/complete"),
            json!({}),
            &p.customer,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(completed["data"]["status"], "COMPLETED");

    let calls = gateway.calls();
    assert!(calls.contains(&format!("checkout:{booking_id}:12000")));
    assert!(calls.contains(&format!("transfer:{booking_id}:9840:acct_test_1")));

    let ledger = json_ok(
        get_auth(app.clone(), &format!("/api/v1/bookings/{booking_id}/ledger"), &p.customer).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(ledger["data"]["fee_split"]["platform_fee"], 2_160);
    let entries = ledger["data"]["entries"].as_array().unwrap();
    let kinds: Vec<&str> = entries.iter().map(|e| e["kind"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        ["CUSTOMER_CHARGE", "PLATFORM_FEE", "PROVIDER_EARNING", "PROVIDER_PAYOUT"]
    );
    assert_eq!(entries[0]["external_ref"], "pi_test_1");
    assert_eq!(entries[3]["external_ref"], format!("tr_test_{booking_id}"));

    let review = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/review"),
            json!({ "rating": 5, "comment": "  Quick and tidy  " }),
            &p.customer,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(review["data"]["rating"], 5);
    assert_eq!(review["data"]["comment"], "Quick and tidy");

    let reviewed = json_ok(
        get_auth(app.clone(), &format!("/api/v1/bookings/{booking_id}"), &p.provider).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(reviewed["data"]["review"]["rating"], 5);
    assert_eq!(reviewed["data"]["review"]["comment"], "Quick and tidy");

    let again = post_json_auth(
        app.clone(),
        &format!("/api/v1/bookings/{booking_id}/review"),
        json!({ "rating": 4 }),
        &p.customer,
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_a_paid_booking_refunds_the_customer(pool: PgPool) {
    let p = parties(&pool).await;
    let test_app = build_test_app_with_payments(pool);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();

    let booking_id = book_job(&app, &p).await;
    json_ok(
        deliver_webhook(app.clone(), checkout_completed(booking_id, "pi_test_9")).await,
        StatusCode::OK,
    )
    .await;

    let cancelled = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/cancel"),
            json!({}),
            &p.customer,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(cancelled["data"]["status"], "CANCELLED");
    assert!(gateway.calls().contains(&"refund:pi_test_9:12000".to_string()));

    let ledger = json_ok(
        get_auth(app, &format!("/api/v1/bookings/{booking_id}/ledger"), &p.customer).await,
        StatusCode::OK,
    )
    .await;
    let refund = ledger["data"]["entries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["kind"] == "REFUND")
        .cloned()
        .expect("refund row");
    assert_eq!(refund["amount_cents"], 12_000);
    assert_eq!(refund["external_ref"], "re_test_1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_before_payment_issues_no_refund(pool: PgPool) {
    let p = parties(&pool).await;
    let test_app = build_test_app_with_payments(pool);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();

    let booking_id = book_job(&app, &p).await;
    let cancelled = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/cancel"),
            json!({ "reason": "Fixed it myself" }),
            &p.provider,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(cancelled["data"]["status"], "CANCELLED");
    assert_eq!(cancelled["data"]["cancellation_reason"], "Fixed it myself");
    assert!(!gateway.calls().iter().any(|c| c.starts_with("refund:")));

}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_after_cancellation_is_refunded(pool: PgPool) {
    let p = parties(&pool).await;
    let test_app = build_test_app_with_payments(pool);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();

    let booking_id = book_job(&app, &p).await;
    json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/checkout"),
            json!({}),
            &p.customer,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/cancel"),
            json!({ "reason": "Changed my mind" }),
            &p.customer,
        )
        .await,
        StatusCode::OK,
    )
    .await;

    // The hosted page was still open and the customer paid anyway.
    for _ in 0..2 {
        let ack = json_ok(
            deliver_webhook(app.clone(), checkout_completed(booking_id, "pi_late")).await,
            StatusCode::OK,
        )
        .await;
        assert_eq!(ack["received"], true);
    }

    let refunds: Vec<String> = gateway
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("refund:"))
        .collect();
    assert_eq!(refunds, vec!["refund:pi_late:12000".to_string()]);

    let booking = json_ok(
        get_auth(app.clone(), &format!("/api/v1/bookings/{booking_id}"), &p.customer).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(booking["data"]["status"], "CANCELLED");

    let ledger = json_ok(
        get_auth(app, &format!("/api/v1/bookings/{booking_id}/ledger"), &p.customer).await,
        StatusCode::OK,
    )
    .await;
    let entries = ledger["data"]["entries"].as_array().unwrap();
    let kinds: Vec<&str> = entries.iter().map(|e| e["kind"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        ["CUSTOMER_CHARGE", "PLATFORM_FEE", "PROVIDER_EARNING", "REFUND"]
    );
    assert_eq!(entries[0]["external_ref"], "pi_late");
    assert_eq!(entries[3]["amount_cents"], 12_000);
    assert_eq!(entries[3]["external_ref"], "re_test_1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn disputed_refund_after_completion_reverses_the_payout(pool: PgPool) {
    let p = parties(&pool).await;
    let admin = create_user(&pool, "admin@example.com", "ADMIN").await;
    let test_app = build_test_app_with_payments(pool);
    let app = test_app.router.clone();
    let gateway = test_app.gateway.clone().unwrap();

    let booking_id = book_job(&app, &p).await;
    json_ok(
        deliver_webhook(app.clone(), checkout_completed(booking_id, "pi_test_5")).await,
        StatusCode::OK,
    )
    .await;
    json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/complete"),
            json!({}),
            &p.customer,
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let opened = json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/bookings/{booking_id}/dispute"),
            json!({ "reason": "The tap started leaking again the next morning" }),
            &p.customer,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let dispute_id = opened["data"]["dispute"]["id"].as_i64().unwrap();

    json_ok(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/admin/disputes/{dispute_id}/resolve"),
            json!({ "outcome": "customer" }),
            &token(&admin),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let calls = gateway.calls();
    assert!(calls.contains(&format!("reversal:tr_test_{booking_id}:9840")));
    assert!(calls.contains(&"refund:pi_test_5:12000".to_string()));

    let ledger = json_ok(
        get_auth(app, &format!("/api/v1/bookings/{booking_id}/ledger"), &p.customer).await,
        StatusCode::OK,
    )
    .await;
    let entries = ledger["data"]["entries"].as_array().unwrap();
    let reversal = entries
        .iter()
        .find(|e| e["kind"] == "PAYOUT_REVERSAL")
        .expect("reversal row");
    assert_eq!(reversal["amount_cents"], 9_840);
    assert_eq!(reversal["external_ref"], "trr_test_1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn provider_cannot_start_an_unpaid_booking(pool: PgPool) {
    let p = parties(&pool).await;
    let app = build_test_app_with_payments(pool).router;
    let booking_id = book_job(&app, &p).await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{booking_id}/start"),
        json!({}),
        &p.provider,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_is_hidden_from_outsiders(pool: PgPool) {
    let p = parties(&pool).await;
    let outsider = create_user(&pool, "nosy@example.com", "CUSTOMER").await;
    let app = build_test_app_with_payments(pool).router;
    let booking_id = book_job(&app, &p).await;

    let response = get_auth(app, &format!("/api/v1/bookings/{booking_id}"), &token(&outsider)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
