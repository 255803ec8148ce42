//! Route definitions for the `/ai` helpers.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ai;
use crate::state::AppState;

/// Routes mounted at `/ai`.
///
/// ```text
/// POST   /fair-price     -> fair_price
/// POST   /snap-fix       -> snap_fix
/// GET    /history        -> history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fair-price", post(ai::fair_price))
        .route("/snap-fix", post(ai::snap_fix))
        .route("/history", get(ai::history))
}
