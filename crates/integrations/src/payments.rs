//! Payment processor abstraction.
//!
//! Handlers hold an `Arc<dyn PaymentGateway>`; production wires in
//! [`StripeClient`](crate::stripe::StripeClient), tests wire in a recorder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use servicematch_core::types::{Cents, DbId};

use crate::stripe::StripeError;

/// Parameters for a hosted checkout page charging one booking.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub booking_id: DbId,
    pub amount_cents: Cents,
    pub description: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created checkout session. The customer is redirected to `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Parameters for paying a provider's earnings out to their connected account.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub booking_id: DbId,
    pub amount_cents: Cents,
    pub destination_account: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a booking.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError>;

    /// Create an Express connected account for a provider. Returns the account ID.
    async fn create_connect_account(&self, email: &str) -> Result<String, StripeError>;

    /// Create an onboarding link for a connected account. Returns the URL.
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, StripeError>;

    /// Move funds to a connected account. Returns the transfer ID.
    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, StripeError>;

    /// Refund part or all of a payment. Returns the refund ID.
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_cents: Cents,
    ) -> Result<String, StripeError>;

    /// Pull part or all of a transfer back from a connected account.
    /// Returns the reversal ID.
    async fn reverse_transfer(
        &self,
        transfer_id: &str,
        amount_cents: Cents,
    ) -> Result<String, StripeError>;

    /// Signing secret for inbound webhooks, if configured.
    fn webhook_secret(&self) -> Option<&str>;
}
