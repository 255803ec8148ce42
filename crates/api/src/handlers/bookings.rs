//! Handlers for the `/bookings` resource.
//!
//! A booking moves PENDING_PAYMENT -> PAID (webhook) -> IN_PROGRESS ->
//! COMPLETED, or is cancelled before work starts. Money movements at
//! Stripe (payouts on completion, refunds on cancellation) are issued
//! after the database transition commits; a failed call is logged and
//! leaves the ledger row without an external reference.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use servicematch_core::error::CoreError;
use servicematch_core::fees::FeeSplit;
use servicematch_core::status::BookingStatus;
use servicematch_core::types::DbId;
use servicematch_db::models::booking::{Booking, BookingTransition};
use servicematch_db::models::ledger::LedgerEntry;
use servicematch_db::models::review::Review;
use servicematch_db::repositories::{
    BookingRepo, LedgerRepo, ProviderProfileRepo, ReviewRepo, UserRepo,
};
use servicematch_events::{types, PlatformEvent};
use servicematch_integrations::{CheckoutRequest, CheckoutSession, TransferRequest};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::{job_title, load_booking_for};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireCustomer, RequireProvider};
use crate::query::StatusPageParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A booking with its status badge text.
#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub status_label: &'static str,
    /// The customer's review, once one has been left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

impl BookingView {
    pub fn new(booking: Booking) -> AppResult<Self> {
        let status_label = booking.status()?.label();
        Ok(Self {
            booking,
            status_label,
            review: None,
        })
    }

    fn with_review(mut self, review: Option<Review>) -> Self {
        self.review = review;
        self
    }
}

/// Request body for `POST /bookings/{id}/cancel`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBookingBody {
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Response for `GET /bookings/{id}/ledger`.
#[derive(Debug, Serialize)]
pub struct BookingLedger {
    pub fee_split: FeeSplit,
    pub entries: Vec<LedgerEntry>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/bookings?status=&page=&per_page=
///
/// Bookings where the caller is the customer or the provider.
pub async fn list_bookings(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StatusPageParams>,
) -> AppResult<Json<PageResponse<Booking>>> {
    let status = params.status(BookingStatus::parse)?;
    let bookings = BookingRepo::list_for_participant(
        &state.pool,
        auth.user_id,
        status,
        params.page_request(),
    )
    .await?;
    Ok(Json(bookings.into()))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingView>>> {
    let booking = load_booking_for(&state, &auth, id).await?;
    let review = ReviewRepo::find_for_booking(&state.pool, booking.id).await?;
    Ok(Json(DataResponse::new(BookingView::new(booking)?.with_review(review))))
}

/// POST /api/v1/bookings/{id}/checkout
///
/// Create a hosted checkout page for an unpaid booking. The booking flips
/// to PAID when the payment webhook arrives, not here.
pub async fn create_checkout(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CheckoutSession>>> {
    let booking = load_booking_for(&state, &auth, id).await?;
    if booking.customer_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the customer on this booking can pay for it".into(),
        )));
    }
    if booking.status()? != BookingStatus::PendingPayment {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Booking is {} and cannot be paid",
            booking.status
        ))));
    }
    let gateway = state.payments()?;

    let customer_email = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .map(|u| u.email);
    let title = job_title(&state, booking.quote_request_id).await;
    let base = state.config.app_base_url.trim_end_matches('/');

    let session = gateway
        .create_checkout_session(&CheckoutRequest {
            booking_id: booking.id,
            amount_cents: booking.amount_cents,
            description: title.unwrap_or_else(|| format!("ServiceMatch booking #{}", booking.id)),
            customer_email,
            success_url: format!("{base}/bookings/{}?paid=1", booking.id),
            cancel_url: format!("{base}/bookings/{}", booking.id),
        })
        .await?;
    BookingRepo::set_checkout_session(&state.pool, booking.id, &session.id).await?;

    tracing::info!(booking_id = booking.id, session_id = %session.id, "Checkout session created");
    Ok(Json(DataResponse::new(session)))
}

/// POST /api/v1/bookings/{id}/start
pub async fn start_booking(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingView>>> {
    let booking = BookingRepo::start(&state.pool, id, auth.user_id).await?;
    publish_booking_event(&state, types::BOOKING_STARTED, &booking, auth.user_id, json!({})).await;
    Ok(Json(DataResponse::new(BookingView::new(booking)?)))
}

/// POST /api/v1/bookings/{id}/complete
///
/// Either participant may mark the job done. Releases the provider payout.
pub async fn complete_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingView>>> {
    let transition = BookingRepo::complete(&state.pool, id, auth.user_id).await?;
    release_payout(&state, &transition).await;

    let booking = transition.booking;
    publish_booking_event(&state, types::BOOKING_COMPLETED, &booking, auth.user_id, json!({}))
        .await;
    tracing::info!(booking_id = booking.id, "Booking completed");
    Ok(Json(DataResponse::new(BookingView::new(booking)?)))
}

/// POST /api/v1/bookings/{id}/cancel
///
/// Either participant may cancel before work starts. Paid bookings are
/// refunded in full.
pub async fn cancel_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CancelBookingBody>,
) -> AppResult<Json<DataResponse<BookingView>>> {
    input.validate()?;
    let reason = input.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());

    let transition = BookingRepo::cancel(&state.pool, id, auth.user_id, reason).await?;
    issue_refund(&state, &transition).await;

    let extra = json!({ "refunded_cents": transition.refunded_cents });
    let booking = transition.booking;
    publish_booking_event(&state, types::BOOKING_CANCELLED, &booking, auth.user_id, extra).await;
    tracing::info!(booking_id = booking.id, "Booking cancelled");
    Ok(Json(DataResponse::new(BookingView::new(booking)?)))
}

/// GET /api/v1/bookings/{id}/ledger
pub async fn get_ledger(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingLedger>>> {
    let booking = load_booking_for(&state, &auth, id).await?;
    let entries = LedgerRepo::list_for_booking(&state.pool, booking.id).await?;
    Ok(Json(DataResponse::new(BookingLedger {
        fee_split: booking.fee_split(),
        entries,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Publish a booking event to both participants (the actor is skipped by
/// the router). `extra` fields are merged into the standard payload.
pub(crate) async fn publish_booking_event(
    state: &AppState,
    event_type: &str,
    booking: &Booking,
    actor_id: DbId,
    extra: serde_json::Value,
) {
    let mut payload = json!({
        "booking_id": booking.id,
        "quote_request_id": booking.quote_request_id,
        "title": job_title(state, booking.quote_request_id).await,
        "amount_cents": booking.amount_cents,
        "status": booking.status,
    });
    if let (Some(base), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
        base.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    state.event_bus.publish(
        PlatformEvent::new(event_type)
            .with_source(types::ENTITY_BOOKING, booking.id)
            .with_actor(actor_id)
            .with_recipients([booking.customer_id, booking.provider_id])
            .with_payload(payload),
    );
}

/// Transfer the provider's earnings to their connected account, if they
/// have finished payout onboarding.
pub(crate) async fn release_payout(state: &AppState, transition: &BookingTransition) {
    let (Some(gateway), Some(entry_id)) = (state.payments.as_ref(), transition.ledger_entry_id)
    else {
        return;
    };
    if transition.refunded_cents.is_some() {
        return;
    }
    let booking = &transition.booking;

    let account = match ProviderProfileRepo::find_by_user(&state.pool, booking.provider_id).await {
        Ok(Some(profile)) if profile.payouts_enabled => profile.stripe_account_id,
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, booking_id = booking.id, "Failed to load provider profile for payout");
            None
        }
    };
    let Some(destination_account) = account else {
        tracing::info!(booking_id = booking.id, "Provider has no payout account; payout held");
        return;
    };

    let request = TransferRequest {
        booking_id: booking.id,
        amount_cents: booking.provider_earnings_cents,
        destination_account,
    };
    match gateway.create_transfer(&request).await {
        Ok(transfer_id) => {
            if let Err(e) = LedgerRepo::set_external_ref(&state.pool, entry_id, &transfer_id).await {
                tracing::warn!(error = %e, entry_id, "Failed to record transfer reference");
            }
            tracing::info!(booking_id = booking.id, transfer_id = %transfer_id, "Payout transferred");
        }
        Err(e) => {
            tracing::warn!(error = %e, booking_id = booking.id, "Payout transfer failed");
        }
    }
}

/// Refund the customer's payment at Stripe for a transition that wrote a
/// refund ledger row.
pub(crate) async fn issue_refund(state: &AppState, transition: &BookingTransition) {
    let booking = &transition.booking;
    let (Some(gateway), Some(entry_id), Some(amount), Some(intent)) = (
        state.payments.as_ref(),
        transition.ledger_entry_id,
        transition.refunded_cents,
        booking.stripe_payment_intent_id.as_deref(),
    ) else {
        return;
    };

    match gateway.create_refund(intent, amount).await {
        Ok(refund_id) => {
            if let Err(e) = LedgerRepo::set_external_ref(&state.pool, entry_id, &refund_id).await {
                tracing::warn!(error = %e, entry_id, "Failed to record refund reference");
            }
            tracing::info!(booking_id = booking.id, refund_id = %refund_id, "Refund issued");
        }
        Err(e) => {
            tracing::warn!(error = %e, booking_id = booking.id, "Refund failed");
        }
    }
}

/// Reverse the provider's transfer at Stripe for a transition that wrote a
/// PAYOUT_REVERSAL row. Held payouts have no transfer and need no call.
pub(crate) async fn reverse_payout(state: &AppState, transition: &BookingTransition) {
    let Some(reversal) = transition.reversal.as_ref() else {
        return;
    };
    let booking_id = transition.booking.id;
    let (Some(gateway), Some(transfer_id)) =
        (state.payments.as_ref(), reversal.transfer_id.as_deref())
    else {
        tracing::info!(booking_id, "Payout was never transferred; nothing to reverse");
        return;
    };

    match gateway.reverse_transfer(transfer_id, reversal.amount_cents).await {
        Ok(reversal_id) => {
            let entry_id = reversal.ledger_entry_id;
            if let Err(e) = LedgerRepo::set_external_ref(&state.pool, entry_id, &reversal_id).await {
                tracing::warn!(error = %e, entry_id, "Failed to record reversal reference");
            }
            tracing::info!(booking_id, reversal_id = %reversal_id, "Payout reversed");
        }
        Err(e) => {
            tracing::warn!(error = %e, booking_id, transfer_id, "Payout reversal failed");
        }
    }
}
