//! Stripe REST client.
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed
//! keys for nested objects (`line_items[0][price_data][currency]`) and
//! returns JSON. Only the handful of endpoints the marketplace needs are
//! wrapped here.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use servicematch_core::types::{Cents, DbId};
use sha2::Sha256;

use crate::payments::{CheckoutRequest, CheckoutSession, PaymentGateway, TransferRequest};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a webhook signature timestamp.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// HTTP request timeout for a single Stripe call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Webhook event types the API reacts to.
pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const EVENT_ACCOUNT_UPDATED: &str = "account.updated";

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Stripe request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Stripe returned a non-2xx status code.
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The webhook signature header is missing, malformed, stale or wrong.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// The webhook body is not a Stripe event.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

// ---------------------------------------------------------------------------
// Config + client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    /// ISO currency code, lower case (e.g. `gbp`).
    pub currency: String,
    pub api_base: String,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: None,
            currency: currency.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

pub struct StripeClient {
    client: reqwest::Client,
    config: StripeConfig,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UrlOnly {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeError> {
        let response = self
            .client
            .post(format!("{}{}", self.config.api_base, path))
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            tracing::warn!(path, status = status.as_u16(), %message, "Stripe call failed");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let form = checkout_form(request, &self.config.currency);
        self.post_form("/checkout/sessions", &form).await
    }

    async fn create_connect_account(&self, email: &str) -> Result<String, StripeError> {
        let form = pairs(&[
            ("type", "express"),
            ("email", email),
            ("capabilities[transfers][requested]", "true"),
        ]);
        let account: IdOnly = self.post_form("/accounts", &form).await?;
        Ok(account.id)
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, StripeError> {
        let form = pairs(&[
            ("account", account_id),
            ("refresh_url", refresh_url),
            ("return_url", return_url),
            ("type", "account_onboarding"),
        ]);
        let link: UrlOnly = self.post_form("/account_links", &form).await?;
        Ok(link.url)
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, StripeError> {
        let form = transfer_form(request, &self.config.currency);
        let transfer: IdOnly = self.post_form("/transfers", &form).await?;
        Ok(transfer.id)
    }

    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_cents: Cents,
    ) -> Result<String, StripeError> {
        let amount = amount_cents.to_string();
        let form = pairs(&[("payment_intent", payment_intent_id), ("amount", &amount)]);
        let refund: IdOnly = self.post_form("/refunds", &form).await?;
        Ok(refund.id)
    }

    async fn reverse_transfer(
        &self,
        transfer_id: &str,
        amount_cents: Cents,
    ) -> Result<String, StripeError> {
        let amount = amount_cents.to_string();
        let form = pairs(&[("amount", &amount)]);
        let reversal: IdOnly = self
            .post_form(&format!("/transfers/{transfer_id}/reversals"), &form)
            .await?;
        Ok(reversal.id)
    }

    fn webhook_secret(&self) -> Option<&str> {
        self.config.webhook_secret.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Form builders
// ---------------------------------------------------------------------------

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Form body for `POST /checkout/sessions`: one line item for the full
/// booking amount, tagged with the booking ID so the webhook can find it.
pub fn checkout_form(request: &CheckoutRequest, currency: &str) -> Vec<(String, String)> {
    let booking_id = request.booking_id.to_string();
    let amount = request.amount_cents.to_string();
    let mut form = pairs(&[
        ("mode", "payment"),
        ("success_url", &request.success_url),
        ("cancel_url", &request.cancel_url),
        ("client_reference_id", &booking_id),
        ("metadata[booking_id]", &booking_id),
        ("payment_intent_data[metadata][booking_id]", &booking_id),
        ("line_items[0][quantity]", "1"),
        ("line_items[0][price_data][currency]", currency),
        ("line_items[0][price_data][unit_amount]", &amount),
        ("line_items[0][price_data][product_data][name]", &request.description),
    ]);
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".into(), email.clone()));
    }
    form
}

/// Form body for `POST /transfers`.
pub fn transfer_form(request: &TransferRequest, currency: &str) -> Vec<(String, String)> {
    let booking_id = request.booking_id.to_string();
    let amount = request.amount_cents.to_string();
    pairs(&[
        ("amount", &amount),
        ("currency", currency),
        ("destination", &request.destination_account),
        ("transfer_group", &format!("booking_{booking_id}")),
        ("metadata[booking_id]", &booking_id),
    ])
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix seconds>` and one or more `v1=<hex>`
/// signatures. The expected signature is HMAC-SHA256 over `"{t}.{payload}"`
/// keyed with the endpoint secret; any matching `v1` passes. Timestamps
/// further than `tolerance_secs` from `now` are rejected.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature("no v1 signature".into()));
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature("malformed timestamp".into()))?;
    let within_tolerance = now
        .checked_sub(ts)
        .map(i64::unsigned_abs)
        .is_some_and(|age| age <= tolerance_secs.unsigned_abs());
    if !within_tolerance {
        return Err(StripeError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature("signature mismatch".into()))
    }
}

/// Compute the `v1` signature for a payload. Used to sign test fixtures.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// A Stripe event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, StripeError> {
        serde_json::from_slice(payload).map_err(|e| StripeError::InvalidPayload(e.to_string()))
    }
}

/// The parts of a `checkout.session.completed` event the API needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub booking_id: Option<DbId>,
    pub payment_intent_id: Option<String>,
    /// `payment_status == "paid"`. Delayed payment methods complete the
    /// session before the money arrives.
    pub paid: bool,
}

impl CompletedCheckout {
    pub fn from_event(event: &WebhookEvent) -> Option<Self> {
        if event.event_type != EVENT_CHECKOUT_COMPLETED {
            return None;
        }
        let obj = &event.data.object;
        let session_id = obj.get("id")?.as_str()?.to_string();
        let booking_id = obj
            .pointer("/metadata/booking_id")
            .or_else(|| obj.get("client_reference_id"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok());
        let payment_intent_id = obj
            .get("payment_intent")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let paid = obj.get("payment_status").and_then(|v| v.as_str()) == Some("paid");
        Some(Self {
            session_id,
            booking_id,
            payment_intent_id,
            paid,
        })
    }
}

/// The parts of an `account.updated` event the API needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub account_id: String,
    pub payouts_enabled: bool,
}

impl AccountUpdate {
    pub fn from_event(event: &WebhookEvent) -> Option<Self> {
        if event.event_type != EVENT_ACCOUNT_UPDATED {
            return None;
        }
        let obj = &event.data.object;
        Some(Self {
            account_id: obj.get("id")?.as_str()?.to_string(),
            payouts_enabled: obj
                .get("payouts_enabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}

// ---------------------------------------------------------------------------
// hex encoding helper (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string. Returns `None` on odd length or a non-hex digit.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn header(ts: i64, sig: &str) -> String {
        format!("t={ts},v1={sig}")
    }

    #[test]
    fn valid_signature_passes() {
        let sig = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        let h = header(1_700_000_000, &sig);
        assert!(verify_webhook_signature(BODY, &h, SECRET, 300, 1_700_000_100).is_ok());
    }

    #[test]
    fn any_v1_may_match() {
        let sig = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        let h = format!("t=1700000000,v1={},v1={sig},v0=ignored", "ab".repeat(32));
        assert!(verify_webhook_signature(BODY, &h, SECRET, 300, 1_700_000_000).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        let h = header(1_700_000_000, &sig);
        let result = verify_webhook_signature(b"{}", &h, SECRET, 300, 1_700_000_000);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign_webhook_payload(BODY, "other", 1_700_000_000);
        let h = header(1_700_000_000, &sig);
        assert!(verify_webhook_signature(BODY, &h, SECRET, 300, 1_700_000_000).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let sig = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        let h = header(1_700_000_000, &sig);
        assert!(verify_webhook_signature(BODY, &h, SECRET, 300, 1_700_000_301).is_err());
    }

    #[test]
    fn malformed_headers_fail() {
        for h in [
            "",
            "v1=abc",
            "t=1700000000",
            "t=abc,v1=00",
            "t=1700000000,v1=zz",
            "t=-9223372036854775808,v1=00",
        ] {
            assert!(
                verify_webhook_signature(BODY, h, SECRET, 300, 1_700_000_000).is_err(),
                "header {h:?} should be rejected"
            );
        }
    }

    #[test]
    fn extreme_timestamps_are_outside_tolerance() {
        for ts in [i64::MIN, i64::MAX] {
            let sig = sign_webhook_payload(BODY, SECRET, ts);
            let header = format!("t={ts},v1={sig}");
            assert!(
                verify_webhook_signature(BODY, &header, SECRET, 300, 1_700_000_000).is_err(),
                "t={ts} should be rejected"
            );
        }
    }

    #[test]
    fn hex_round_trip() {
        let bytes = [0u8, 15, 16, 255];
        assert_eq!(hex::encode(bytes), "000f10ff");
        assert_eq!(hex::decode("000f10ff").unwrap(), bytes.to_vec());
        assert!(hex::decode("abc").is_none());
    }

    #[test]
    fn checkout_form_carries_booking_and_amount() {
        let form = checkout_form(
            &CheckoutRequest {
                booking_id: 42,
                amount_cents: 12_345,
                description: "Boiler repair".into(),
                customer_email: Some("cara@example.com".into()),
                success_url: "http://app/bookings/42?paid=1".into(),
                cancel_url: "http://app/bookings/42".into(),
            },
            "gbp",
        );
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("metadata[booking_id]"), Some("42"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("12345"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("gbp"));
        assert_eq!(get("customer_email"), Some("cara@example.com"));
    }

    #[test]
    fn transfer_form_targets_connected_account() {
        let form = transfer_form(
            &TransferRequest {
                booking_id: 7,
                amount_cents: 8_200,
                destination_account: "acct_123".into(),
            },
            "gbp",
        );
        assert!(form.contains(&("destination".into(), "acct_123".into())));
        assert!(form.contains(&("amount".into(), "8200".into())));
        assert!(form.contains(&("transfer_group".into(), "booking_7".into())));
    }

    #[test]
    fn completed_checkout_extracted() {
        let payload = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_1",
                "payment_intent": "pi_1",
                "payment_status": "paid",
                "metadata": {"booking_id": "42"}
            }}
        });
        let event = WebhookEvent::parse(payload.to_string().as_bytes()).unwrap();
        let done = CompletedCheckout::from_event(&event).unwrap();
        assert_eq!(done.session_id, "cs_test_1");
        assert_eq!(done.booking_id, Some(42));
        assert_eq!(done.payment_intent_id.as_deref(), Some("pi_1"));
        assert!(done.paid);
        assert!(AccountUpdate::from_event(&event).is_none());
    }

    #[test]
    fn account_update_extracted() {
        let payload = serde_json::json!({
            "id": "evt_2",
            "type": "account.updated",
            "data": {"object": {"id": "acct_9", "payouts_enabled": true}}
        });
        let event = WebhookEvent::parse(payload.to_string().as_bytes()).unwrap();
        assert_eq!(
            AccountUpdate::from_event(&event),
            Some(AccountUpdate {
                account_id: "acct_9".into(),
                payouts_enabled: true
            })
        );
    }

    #[test]
    fn garbage_payload_is_invalid() {
        assert!(matches!(
            WebhookEvent::parse(b"not json"),
            Err(StripeError::InvalidPayload(_))
        ));
    }
}
