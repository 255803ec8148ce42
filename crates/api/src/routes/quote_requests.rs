//! Route definitions for `/quote-requests` and `/quotes`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{quote_requests, quotes};
use crate::state::AppState;

/// Routes mounted at `/quote-requests`.
///
/// ```text
/// POST, GET /                  -> create_quote_request, list_quote_requests
/// GET       /{id}              -> get_quote_request
/// POST      /{id}/cancel       -> cancel_quote_request
/// POST, GET /{id}/quotes       -> submit_quote, list_quotes_for_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(quote_requests::create_quote_request).get(quote_requests::list_quote_requests),
        )
        .route("/{id}", get(quote_requests::get_quote_request))
        .route("/{id}/cancel", post(quote_requests::cancel_quote_request))
        .route(
            "/{id}/quotes",
            post(quotes::submit_quote).get(quotes::list_quotes_for_request),
        )
}

/// Routes mounted at `/quotes`.
///
/// ```text
/// GET    /mine               -> list_my_quotes
/// POST   /{id}/withdraw      -> withdraw_quote
/// POST   /{id}/accept        -> accept_quote
/// ```
pub fn quotes_router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(quotes::list_my_quotes))
        .route("/{id}/withdraw", post(quotes::withdraw_quote))
        .route("/{id}/accept", post(quotes::accept_quote))
}
