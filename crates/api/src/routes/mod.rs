pub mod admin;
pub mod ai;
pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod profiles;
pub mod quote_requests;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                      WebSocket (?token=)
///
/// /auth/register, /login, /refresh         public
/// /auth/logout, /me                        requires auth
///
/// /me/customer-profile                     get, put (customer)
/// /me/provider-profile                     get, put (provider)
/// /me/provider-profile/payouts             onboarding link (provider)
///
/// /providers                               search (public)
/// /providers/{id}                          detail (public)
/// /providers/{id}/reviews                  reviews (public)
///
/// /quote-requests                          create (customer), list
/// /quote-requests/{id}                     get
/// /quote-requests/{id}/cancel              cancel (customer)
/// /quote-requests/{id}/quotes              submit (provider), list
///
/// /quotes/mine                             provider's quotes
/// /quotes/{id}/withdraw                    withdraw (provider)
/// /quotes/{id}/accept                      accept -> booking (customer)
///
/// /bookings                                list
/// /bookings/{id}                           get
/// /bookings/{id}/checkout                  hosted checkout (customer)
/// /bookings/{id}/start                     start (provider)
/// /bookings/{id}/complete                  complete
/// /bookings/{id}/cancel                    cancel
/// /bookings/{id}/ledger                    fee split + ledger rows
/// /bookings/{id}/review                    review (customer)
/// /bookings/{id}/dispute                   open dispute
/// /bookings/{id}/messages                  thread: list, send
///
/// /disputes/{id}                           get
///
/// /payments/webhook                        Stripe webhook (public, signed)
///
/// /notifications                           list
/// /notifications/unread-count              count
/// /notifications/{id}/read                 mark read
/// /notifications/read-all                  mark all read
///
/// /ai/fair-price                           FairPrice estimate
/// /ai/snap-fix                             SnapFix diagnosis
/// /ai/history                              caller's past checks
///
/// /dashboard/customer, /dashboard/provider role dashboards
///
/// /admin/stats                             platform totals
/// /admin/users                             list
/// /admin/users/{id}/active                 activate / deactivate
/// /admin/bookings                          list
/// /admin/disputes                          list
/// /admin/disputes/{id}/review              pick up (under review)
/// /admin/disputes/{id}/resolve             resolve
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/me", profiles::me_router())
        .nest("/providers", profiles::providers_router())
        .nest("/quote-requests", quote_requests::router())
        .nest("/quotes", quote_requests::quotes_router())
        .nest("/bookings", bookings::router())
        .nest("/disputes", bookings::disputes_router())
        .route(
            "/payments/webhook",
            post(handlers::payments::stripe_webhook),
        )
        .nest("/notifications", notifications::router())
        .nest("/ai", ai::router())
        .nest("/dashboard", dashboard::router())
        .nest("/admin", admin::router())
}
