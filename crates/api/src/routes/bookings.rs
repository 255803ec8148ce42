//! Route definitions for the `/bookings` resource and its sub-resources
//! (ledger, review, dispute, message thread).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{bookings, disputes, messages, reviews};
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// GET       /                   -> list_bookings
/// GET       /{id}               -> get_booking
/// POST      /{id}/checkout      -> create_checkout
/// POST      /{id}/start         -> start_booking
/// POST      /{id}/complete      -> complete_booking
/// POST      /{id}/cancel        -> cancel_booking
/// GET       /{id}/ledger        -> get_ledger
/// POST      /{id}/review        -> create_review
/// POST      /{id}/dispute       -> open_dispute
/// GET, POST /{id}/messages      -> list_messages, send_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bookings::list_bookings))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/checkout", post(bookings::create_checkout))
        .route("/{id}/start", post(bookings::start_booking))
        .route("/{id}/complete", post(bookings::complete_booking))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .route("/{id}/ledger", get(bookings::get_ledger))
        .route("/{id}/review", post(reviews::create_review))
        .route("/{id}/dispute", post(disputes::open_dispute))
        .route(
            "/{id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
}

/// Routes mounted at `/disputes`.
pub fn disputes_router() -> Router<AppState> {
    Router::new().route("/{id}", get(disputes::get_dispute))
}
