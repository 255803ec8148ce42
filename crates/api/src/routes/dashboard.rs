use axum::routing::get;
use axum::Router;

use crate::handlers::dashboard;
use crate::state::AppState;

/// Routes mounted at `/dashboard`.
///
/// ```text
/// GET    /customer     -> customer_dashboard
/// GET    /provider     -> provider_dashboard
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer", get(dashboard::customer_dashboard))
        .route("/provider", get(dashboard::provider_dashboard))
}
