//! Handlers for booking message threads.
//!
//! Sends are idempotent on the client-generated `client_id`: a retried
//! POST returns the stored message with 200 instead of 201 and does not
//! notify again.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use servicematch_core::error::CoreError;
use servicematch_core::messaging::{thread_channel, validate_client_id, validate_message_body};
use servicematch_core::types::{DbId, Timestamp};
use servicematch_db::models::message::Message;
use servicematch_db::repositories::MessageRepo;
use servicematch_events::{types, PlatformEvent};

use crate::error::{AppError, AppResult};
use crate::handlers::load_booking_for;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

/// Query parameters for `GET /bookings/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct MessageListParams {
    /// Return messages strictly older than this timestamp.
    pub before: Option<Timestamp>,
    pub limit: Option<i64>,
}

/// Request body for `POST /bookings/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub body: String,
    pub client_id: String,
}

/// GET /api/v1/bookings/{id}/messages
///
/// Oldest first. Reading the thread marks the counterpart's messages read.
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
    Query(params): Query<MessageListParams>,
) -> AppResult<Json<DataResponse<Vec<Message>>>> {
    let booking = load_booking_for(&state, &auth, booking_id).await?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let messages =
        MessageRepo::list_for_booking(&state.pool, booking.id, params.before, limit).await?;
    if booking.is_participant(auth.user_id) {
        MessageRepo::mark_read(&state.pool, booking.id, auth.user_id).await?;
    }
    Ok(Json(DataResponse::new(messages)))
}

/// POST /api/v1/bookings/{id}/messages
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
    Json(input): Json<SendMessageBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    validate_message_body(&input.body)?;
    validate_client_id(&input.client_id)?;

    let booking = load_booking_for(&state, &auth, booking_id).await?;
    if !booking.is_participant(auth.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the customer and provider can post in this thread".into(),
        )));
    }

    let (message, created) = MessageRepo::create(
        &state.pool,
        booking.id,
        auth.user_id,
        input.body.trim(),
        &input.client_id,
    )
    .await?;

    if !created {
        return Ok((StatusCode::OK, Json(DataResponse::new(message))));
    }

    state.event_bus.publish(
        PlatformEvent::new(types::MESSAGE_SENT)
            .with_source(types::ENTITY_BOOKING, booking.id)
            .with_actor(auth.user_id)
            .with_recipient(booking.counterpart_of(auth.user_id))
            .with_payload(json!({
                "booking_id": booking.id,
                "channel": thread_channel(booking.id),
                "body": message.body,
                "message": message,
            })),
    );
    tracing::debug!(message_id = message.id, booking_id = booking.id, "Message sent");

    Ok((StatusCode::CREATED, Json(DataResponse::new(message))))
}
