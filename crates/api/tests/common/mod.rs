#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use servicematch_api::auth::jwt::{generate_access_token, JwtConfig};
use servicematch_api::auth::password::hash_password;
use servicematch_api::config::ServerConfig;
use servicematch_api::router::build_app_router;
use servicematch_api::state::AppState;
use servicematch_api::ws::WsManager;
use servicematch_core::types::{Cents, DbId};
use servicematch_db::models::booking::Booking;
use servicematch_db::models::profile::UpsertProviderProfile;
use servicematch_db::models::quote::CreateQuote;
use servicematch_db::models::quote_request::CreateQuoteRequest;
use servicematch_db::models::user::{CreateUser, User};
use servicematch_db::repositories::{
    BookingRepo, ProviderProfileRepo, QuoteRepo, QuoteRequestRepo, UserRepo,
};
use servicematch_events::EventBus;
use servicematch_integrations::{
    CheckoutRequest, CheckoutSession, PaymentGateway, StripeError, TransferRequest,
};

pub const TEST_PASSWORD: &str = "correct horse 42";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Build a test `ServerConfig` with safe defaults. Stripe and OpenAI are
/// off; tests that need payments pass a [`RecordingGateway`].
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        platform_fee_bps: 1_800,
        app_base_url: "http://localhost:5173".to_string(),
        stripe: None,
        openai: None,
        quote_expiry_sweep_secs: 300,
    }
}

/// Everything a test may want to poke at besides the router.
pub struct TestApp {
    pub router: Router,
    pub event_bus: Arc<EventBus>,
    pub gateway: Option<Arc<RecordingGateway>>,
}

fn build(pool: PgPool, gateway: Option<Arc<RecordingGateway>>) -> TestApp {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus: Arc::clone(&event_bus),
        payments: gateway
            .clone()
            .map(|g| g as Arc<dyn PaymentGateway>),
        openai: None,
    };
    TestApp {
        router: build_app_router(state, &config),
        event_bus,
        gateway,
    }
}

/// Full application router (same middleware stack as `main.rs`) with
/// payments switched off.
pub fn build_test_app(pool: PgPool) -> Router {
    build(pool, None).router
}

/// Application wired to a [`RecordingGateway`].
pub fn build_test_app_with_payments(pool: PgPool) -> TestApp {
    build(pool, Some(Arc::new(RecordingGateway::default())))
}

// ---------------------------------------------------------------------------
// Payment gateway double
// ---------------------------------------------------------------------------

/// Records every call and answers with deterministic ids.
#[derive(Default)]
pub struct RecordingGateway {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        self.record(format!("checkout:{}:{}", request.booking_id, request.amount_cents));
        Ok(CheckoutSession {
            id: format!("cs_test_{}", request.booking_id),
            url: format!("https://checkout.test/cs_test_{}", request.booking_id),
        })
    }

    async fn create_connect_account(&self, email: &str) -> Result<String, StripeError> {
        self.record(format!("account:{email}"));
        Ok("acct_test_1".to_string())
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<String, StripeError> {
        self.record(format!("account_link:{account_id}"));
        Ok(format!("https://connect.test/{account_id}"))
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, StripeError> {
        self.record(format!(
            "transfer:{}:{}:{}",
            request.booking_id, request.amount_cents, request.destination_account
        ));
        Ok(format!("tr_test_{}", request.booking_id))
    }

    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_cents: Cents,
    ) -> Result<String, StripeError> {
        self.record(format!("refund:{payment_intent_id}:{amount_cents}"));
        Ok("re_test_1".to_string())
    }

    async fn reverse_transfer(
        &self,
        transfer_id: &str,
        amount_cents: Cents,
    ) -> Result<String, StripeError> {
        self.record(format!("reversal:{transfer_id}:{amount_cents}"));
        Ok("trr_test_1".to_string())
    }

    fn webhook_secret(&self) -> Option<&str> {
        Some(WEBHOOK_SECRET)
    }
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
            full_name: email.split('@').next().unwrap_or("user").to_string(),
            role: role.to_string(),
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Insert a provider with a plumbing profile in London.
pub async fn create_provider(pool: &PgPool, email: &str) -> User {
    let user = create_user(pool, email, "PROVIDER").await;
    ProviderProfileRepo::upsert(
        pool,
        user.id,
        &UpsertProviderProfile {
            business_name: format!("{} Plumbing", user.full_name),
            bio: None,
            categories: vec!["plumbing".into()],
            postcode: "SW1A 1AA".into(),
            region: "london".into(),
            service_radius_km: 10,
            hourly_rate_cents: Some(6_000),
        },
    )
    .await
    .expect("profile upsert should succeed");
    user
}

/// Seed an accepted plumbing job straight through the repositories.
/// When `paid` is set the booking is marked paid with intent `pi_seed`.
pub async fn seed_booking(pool: &PgPool, customer: &User, provider: &User, paid: bool) -> Booking {
    let request = QuoteRequestRepo::create(
        pool,
        customer.id,
        &CreateQuoteRequest {
            title: "Leaking kitchen tap".into(),
            description: "The kitchen tap drips constantly".into(),
            category: "plumbing".into(),
            postcode: "SW1A 1AA".into(),
            region: "london".into(),
            budget_cents: Some(15_000),
            preferred_date: None,
        },
    )
    .await
    .expect("request creation should succeed");
    let (quote, _) = QuoteRepo::create(
        pool,
        request.id,
        provider.id,
        &CreateQuote {
            amount_cents: 10_000,
            message: None,
            estimated_hours: Some(2),
            available_from: None,
            valid_until: chrono::Utc::now() + chrono::Duration::days(7),
        },
    )
    .await
    .expect("quote creation should succeed");
    let booking = BookingRepo::accept_quote(pool, quote.id, customer.id, 1_800)
        .await
        .expect("acceptance should succeed")
        .booking;
    if !paid {
        return booking;
    }
    BookingRepo::mark_paid(pool, booking.id, Some("pi_seed"))
        .await
        .expect("payment should apply")
        .0
}

/// Mint an access token without going through `/auth/login`.
pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token generation")
}

pub fn token(user: &User) -> String {
    token_for(user.id, &user.role)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("request should succeed")
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request(Method::POST, uri, None, &body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request(Method::POST, uri, Some(token), &body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request(Method::PUT, uri, Some(token), &body)).await
}

/// POST raw bytes with extra headers (webhooks).
pub async fn post_raw(app: Router, uri: &str, body: Vec<u8>, headers: &[(&str, &str)]) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// A `Stripe-Signature` header for `payload`, signed now with [`WEBHOOK_SECRET`].
pub fn stripe_signature(payload: &[u8]) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = servicematch_integrations::stripe::sign_webhook_payload(
        payload,
        WEBHOOK_SECRET,
        timestamp,
    );
    format!("t={timestamp},v1={signature}")
}

/// A paid `checkout.session.completed` event for a booking.
pub fn checkout_completed(booking_id: DbId, payment_intent: &str) -> Vec<u8> {
    serde_json::json!({
        "id": format!("evt_checkout_{booking_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": format!("cs_test_{booking_id}"),
                "payment_intent": payment_intent,
                "payment_status": "paid",
                "metadata": { "booking_id": booking_id.to_string() }
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Deliver a signed webhook.
pub async fn deliver_webhook(app: Router, payload: Vec<u8>) -> Response {
    let signature = stripe_signature(&payload);
    post_raw(
        app,
        "/api/v1/payments/webhook",
        payload,
        &[("stripe-signature", signature.as_str())],
    )
    .await
}
