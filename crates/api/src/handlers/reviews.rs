//! Handlers for reviews of completed bookings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use servicematch_core::types::DbId;
use servicematch_db::models::review::{CreateReview, Review};
use servicematch_db::repositories::{BookingRepo, ReviewRepo};
use servicematch_events::{types, PlatformEvent};

use crate::error::AppResult;
use crate::handlers::job_title;
use crate::middleware::rbac::RequireCustomer;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /bookings/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct CreateReviewBody {
    pub rating: i16,
    pub comment: Option<String>,
}

/// POST /api/v1/bookings/{id}/review
///
/// One review per completed booking, by its customer. The provider's rating
/// average is updated in the same transaction.
pub async fn create_review(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
    Json(input): Json<CreateReviewBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Review>>)> {
    let comment = input
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let review = ReviewRepo::create(
        &state.pool,
        booking_id,
        auth.user_id,
        &CreateReview {
            rating: input.rating,
            comment,
        },
    )
    .await?;

    let title = match BookingRepo::find_by_id(&state.pool, booking_id).await? {
        Some(booking) => job_title(&state, booking.quote_request_id).await,
        None => None,
    };
    state.event_bus.publish(
        PlatformEvent::new(types::REVIEW_CREATED)
            .with_source(types::ENTITY_BOOKING, booking_id)
            .with_actor(auth.user_id)
            .with_recipient(review.provider_id)
            .with_payload(json!({
                "booking_id": booking_id,
                "review_id": review.id,
                "rating": review.rating,
                "title": title,
            })),
    );
    tracing::info!(review_id = review.id, provider_id = review.provider_id, "Review created");

    Ok((StatusCode::CREATED, Json(DataResponse::new(review))))
}
