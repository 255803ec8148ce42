//! Stripe webhook receiver.
//!
//! Public route; authenticity comes from the `Stripe-Signature` header.
//! Unknown event types are acknowledged with 200 so Stripe stops retrying.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use servicematch_core::error::CoreError;
use servicematch_core::types::DbId;
use servicematch_db::repositories::{BookingRepo, ProviderProfileRepo};
use servicematch_db::RepoError;
use servicematch_events::types;
use servicematch_integrations::stripe::{
    verify_webhook_signature, AccountUpdate, CompletedCheckout, WebhookEvent,
    DEFAULT_WEBHOOK_TOLERANCE_SECS, EVENT_ACCOUNT_UPDATED, EVENT_CHECKOUT_COMPLETED,
};

use crate::error::{AppError, AppResult};
use crate::handlers::bookings::{issue_refund, publish_booking_event};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/v1/payments/webhook
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let gateway = state.payments()?;
    let secret = gateway.webhook_secret().ok_or_else(|| {
        AppError::ServiceUnavailable("Webhook signing secret is not configured".into())
    })?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".into()))?;

    verify_webhook_signature(
        &body,
        signature,
        secret,
        DEFAULT_WEBHOOK_TOLERANCE_SECS,
        Utc::now().timestamp(),
    )?;
    let event = WebhookEvent::parse(&body)?;
    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");

    match event.event_type.as_str() {
        EVENT_CHECKOUT_COMPLETED => handle_checkout_completed(&state, &event).await?,
        EVENT_ACCOUNT_UPDATED => {
            let update = AccountUpdate::from_event(&event)
                .ok_or_else(|| AppError::BadRequest("Malformed account.updated event".into()))?;
            let updated = ProviderProfileRepo::set_payouts_enabled(
                &state.pool,
                &update.account_id,
                update.payouts_enabled,
            )
            .await?;
            if !updated {
                tracing::warn!(account_id = %update.account_id, "Webhook for unknown connected account");
            }
        }
        other => tracing::debug!(event_type = %other, "Ignoring Stripe event"),
    }

    Ok(Json(json!({ "received": true })))
}

async fn handle_checkout_completed(state: &AppState, event: &WebhookEvent) -> AppResult<()> {
    let checkout = CompletedCheckout::from_event(event).ok_or_else(|| {
        AppError::BadRequest("Malformed checkout.session.completed event".into())
    })?;
    if !checkout.paid {
        tracing::info!(session_id = %checkout.session_id, "Checkout completed without payment");
        return Ok(());
    }

    let booking_id = match checkout.booking_id {
        Some(id) => Some(id),
        None => BookingRepo::find_by_checkout_session(&state.pool, &checkout.session_id)
            .await?
            .map(|b| b.id),
    };
    let Some(booking_id) = booking_id else {
        tracing::warn!(session_id = %checkout.session_id, "Checkout session matches no booking");
        return Ok(());
    };

    let paid =
        BookingRepo::mark_paid(&state.pool, booking_id, checkout.payment_intent_id.as_deref()).await;
    let (booking, newly_paid) = match paid {
        Ok(result) => result,
        // Booking closed before the payment landed. Hand the money back and
        // acknowledge so Stripe stops retrying.
        Err(RepoError::Core(CoreError::Conflict(msg))) => {
            tracing::warn!(booking_id, error = %msg, "Payment received for a closed booking");
            if let Some(intent) = checkout.payment_intent_id.as_deref() {
                refund_closed_booking(state, booking_id, intent).await?;
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if newly_paid {
        tracing::info!(booking_id = booking.id, "Booking paid");
        publish_booking_event(
            state,
            types::BOOKING_PAID,
            &booking,
            booking.customer_id,
            json!({}),
        )
        .await;
    }
    Ok(())
}

async fn refund_closed_booking(state: &AppState, booking_id: DbId, intent: &str) -> AppResult<()> {
    let Some(transition) = BookingRepo::refund_late_payment(&state.pool, booking_id, intent).await?
    else {
        return Ok(());
    };
    tracing::info!(booking_id, "Refunding payment for a cancelled booking");
    issue_refund(state, &transition).await;
    Ok(())
}
