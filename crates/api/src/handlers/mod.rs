pub mod admin;
pub mod ai;
pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod disputes;
pub mod messages;
pub mod notifications;
pub mod payments;
pub mod profiles;
pub mod quote_requests;
pub mod quotes;
pub mod reviews;

use servicematch_core::error::CoreError;
use servicematch_core::types::DbId;
use servicematch_db::models::booking::Booking;
use servicematch_db::repositories::{BookingRepo, QuoteRequestRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Load a booking the caller takes part in. Admins see every booking.
///
/// Outsiders get 404 rather than 403 so booking ids cannot be enumerated.
pub(crate) async fn load_booking_for(
    state: &AppState,
    auth: &AuthUser,
    booking_id: DbId,
) -> AppResult<Booking> {
    let booking = BookingRepo::find_by_id(&state.pool, booking_id)
        .await?
        .filter(|b| auth.is_admin() || b.is_participant(auth.user_id))
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id: booking_id,
        }))?;
    Ok(booking)
}

/// Title of the job behind a booking or quote, for notification text.
/// Lookup failures degrade to `None`; the notification falls back to
/// generic wording.
pub(crate) async fn job_title(state: &AppState, quote_request_id: DbId) -> Option<String> {
    match QuoteRequestRepo::find_by_id(&state.pool, quote_request_id).await {
        Ok(request) => request.map(|r| r.title),
        Err(e) => {
            tracing::warn!(error = %e, quote_request_id, "Failed to load job title");
            None
        }
    }
}
