//! Route definitions for the `/admin` console. Admin only.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /stats                     -> platform_stats
/// GET    /users                     -> list_users
/// PUT    /users/{id}/active         -> set_user_active
/// GET    /bookings                  -> list_bookings
/// GET    /disputes                  -> list_disputes
/// POST   /disputes/{id}/review      -> review_dispute
/// POST   /disputes/{id}/resolve     -> resolve_dispute
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::platform_stats))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/active", put(admin::set_user_active))
        .route("/bookings", get(admin::list_bookings))
        .route("/disputes", get(admin::list_disputes))
        .route("/disputes/{id}/review", post(admin::review_dispute))
        .route("/disputes/{id}/resolve", post(admin::resolve_dispute))
}
