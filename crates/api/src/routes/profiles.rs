//! Route definitions for the caller's own profiles (`/me`) and the public
//! provider directory (`/providers`).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::profiles;
use crate::state::AppState;

/// Routes mounted at `/me`.
///
/// ```text
/// GET, PUT /customer-profile            -> get_customer_profile, put_customer_profile
/// GET, PUT /provider-profile            -> get_provider_profile, put_provider_profile
/// POST     /provider-profile/payouts    -> start_payout_onboarding
/// ```
pub fn me_router() -> Router<AppState> {
    Router::new()
        .route(
            "/customer-profile",
            get(profiles::get_customer_profile).put(profiles::put_customer_profile),
        )
        .route(
            "/provider-profile",
            get(profiles::get_provider_profile).put(profiles::put_provider_profile),
        )
        .route(
            "/provider-profile/payouts",
            post(profiles::start_payout_onboarding),
        )
}

/// Routes mounted at `/providers`.
///
/// ```text
/// GET    /                 -> search_providers
/// GET    /{id}             -> get_provider
/// GET    /{id}/reviews     -> list_provider_reviews
/// ```
pub fn providers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(profiles::search_providers))
        .route("/{id}", get(profiles::get_provider))
        .route("/{id}/reviews", get(profiles::list_provider_reviews))
}
