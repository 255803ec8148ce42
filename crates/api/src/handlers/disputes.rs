//! Handlers for disputes raised by booking participants.
//!
//! Resolution is an admin action and lives in [`crate::handlers::admin`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use servicematch_core::error::CoreError;
use servicematch_core::types::DbId;
use servicematch_db::models::dispute::{Dispute, DisputeWithBooking};
use servicematch_db::repositories::DisputeRepo;
use servicematch_events::{types, PlatformEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::{job_title, load_booking_for};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /bookings/{id}/dispute`.
#[derive(Debug, Deserialize, Validate)]
pub struct OpenDisputeBody {
    #[validate(length(min = 10, max = 2000, message = "must be 10-2000 characters"))]
    pub reason: String,
}

/// POST /api/v1/bookings/{id}/dispute
///
/// Either participant may dispute a paid, in-progress or completed booking.
/// Admins are notified.
pub async fn open_dispute(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
    Json(input): Json<OpenDisputeBody>,
) -> AppResult<(StatusCode, Json<DataResponse<DisputeWithBooking>>)> {
    input.validate()?;
    let opened = DisputeRepo::open(&state.pool, booking_id, auth.user_id, input.reason.trim()).await?;
    let booking = &opened.booking;

    state.event_bus.publish(
        PlatformEvent::new(types::DISPUTE_OPENED)
            .with_source(types::ENTITY_DISPUTE, opened.dispute.id)
            .with_actor(auth.user_id)
            .with_recipient(booking.counterpart_of(auth.user_id))
            .with_payload(json!({
                "dispute_id": opened.dispute.id,
                "booking_id": booking.id,
                "title": job_title(&state, booking.quote_request_id).await,
            })),
    );
    tracing::warn!(
        dispute_id = opened.dispute.id,
        booking_id = booking.id,
        opened_by = auth.user_id,
        "Dispute opened",
    );

    Ok((StatusCode::CREATED, Json(DataResponse::new(opened))))
}

/// GET /api/v1/disputes/{id}
pub async fn get_dispute(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Dispute>>> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Dispute",
            id,
        })
    };
    let dispute = DisputeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    // Visibility follows the booking.
    load_booking_for(&state, &auth, dispute.booking_id)
        .await
        .map_err(|_| not_found())?;
    Ok(Json(DataResponse::new(dispute)))
}
