//! Handlers for the `/admin` console.
//!
//! All handlers require the `ADMIN` role via [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use servicematch_core::error::CoreError;
use servicematch_core::pagination::PageRequest;
use servicematch_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_PROVIDER};
use servicematch_core::status::{BookingStatus, DisputeStatus};
use servicematch_core::types::DbId;
use servicematch_db::models::booking::Booking;
use servicematch_db::models::dashboard::PlatformStats;
use servicematch_db::models::dispute::{Dispute, DisputeOutcome};
use servicematch_db::models::user::UserResponse;
use servicematch_db::repositories::{AdminRepo, BookingRepo, DisputeRepo, SessionRepo, UserRepo};
use servicematch_events::{types, PlatformEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::bookings::{issue_refund, release_payout, reverse_payout};
use crate::handlers::job_title;
use crate::middleware::rbac::RequireAdmin;
use crate::query::StatusPageParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /admin/users`.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub role: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Request body for `PUT /admin/users/{id}/active`.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Request body for `POST /admin/disputes/{id}/resolve`.
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveDisputeRequest {
    /// `customer` (refund) or `provider` (release payout).
    pub outcome: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

fn parse_outcome(value: &str) -> Result<DisputeOutcome, CoreError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "customer" => Ok(DisputeOutcome::Customer),
        "provider" => Ok(DisputeOutcome::Provider),
        other => Err(CoreError::Validation(format!(
            "Unknown outcome '{other}'. Valid values: customer, provider"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/stats
pub async fn platform_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PlatformStats>>> {
    let stats = AdminRepo::platform_stats(&state.pool).await?;
    Ok(Json(DataResponse::new(stats)))
}

/// GET /api/v1/admin/users?role=&page=&per_page=
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<PageResponse<UserResponse>>> {
    let role = params
        .role
        .filter(|r| !r.is_empty())
        .map(|r| r.to_uppercase());
    if let Some(r) = role.as_deref() {
        if ![ROLE_ADMIN, ROLE_PROVIDER, ROLE_CUSTOMER].contains(&r) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown role '{r}'"
            ))));
        }
    }
    let page = PageRequest::new(params.page, params.per_page);
    let users = UserRepo::list(&state.pool, role.as_deref(), page).await?;
    Ok(Json(users.into()))
}

/// PUT /api/v1/admin/users/{id}/active
///
/// Deactivating a user also revokes their sessions. Admins cannot
/// deactivate themselves.
pub async fn set_user_active(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<SetActiveRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if user_id == admin.user_id && !input.is_active {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot deactivate your own account".into(),
        )));
    }
    let user = UserRepo::set_active(&state.pool, user_id, input.is_active)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;
    if !input.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, user_id).await?;
    }
    tracing::info!(
        user_id,
        is_active = input.is_active,
        admin_id = admin.user_id,
        "User active flag changed",
    );
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

/// GET /api/v1/admin/bookings?status=&page=&per_page=
pub async fn list_bookings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<StatusPageParams>,
) -> AppResult<Json<PageResponse<Booking>>> {
    let status = params.status(BookingStatus::parse)?;
    let bookings = BookingRepo::list_all(&state.pool, status, params.page_request()).await?;
    Ok(Json(bookings.into()))
}

/// GET /api/v1/admin/disputes?status=&page=&per_page=
pub async fn list_disputes(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<StatusPageParams>,
) -> AppResult<Json<PageResponse<Dispute>>> {
    let status = params.status(DisputeStatus::parse)?;
    let disputes = DisputeRepo::list(&state.pool, status, params.page_request()).await?;
    Ok(Json(disputes.into()))
}

/// POST /api/v1/admin/disputes/{id}/review
///
/// Move an open dispute to UNDER_REVIEW so other admins can see it is taken.
pub async fn review_dispute(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(dispute_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Dispute>>> {
    let dispute = DisputeRepo::mark_under_review(&state.pool, dispute_id).await?;
    tracing::info!(
        dispute_id,
        booking_id = dispute.booking_id,
        admin_id = admin.user_id,
        "Dispute under review",
    );
    Ok(Json(DataResponse::new(dispute)))
}

/// POST /api/v1/admin/disputes/{id}/resolve
///
/// `customer` refunds the booking in full, reversing any payout already
/// sent; `provider` completes it and releases the payout.
pub async fn resolve_dispute(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(dispute_id): Path<DbId>,
    Json(input): Json<ResolveDisputeRequest>,
) -> AppResult<Json<DataResponse<Dispute>>> {
    input.validate()?;
    let outcome = parse_outcome(&input.outcome)?;
    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let (dispute, transition) =
        DisputeRepo::resolve(&state.pool, dispute_id, admin.user_id, outcome, notes).await?;
    match outcome {
        DisputeOutcome::Customer => {
            reverse_payout(&state, &transition).await;
            issue_refund(&state, &transition).await;
        }
        DisputeOutcome::Provider => release_payout(&state, &transition).await,
    }

    let booking = &transition.booking;
    let outcome_name = match outcome {
        DisputeOutcome::Customer => "customer",
        DisputeOutcome::Provider => "provider",
    };
    state.event_bus.publish(
        PlatformEvent::new(types::DISPUTE_RESOLVED)
            .with_source(types::ENTITY_DISPUTE, dispute.id)
            .with_actor(admin.user_id)
            .with_recipients([booking.customer_id, booking.provider_id])
            .with_payload(json!({
                "dispute_id": dispute.id,
                "booking_id": booking.id,
                "outcome": outcome_name,
                "refunded_cents": transition.refunded_cents,
                "title": job_title(&state, booking.quote_request_id).await,
            })),
    );
    tracing::info!(
        dispute_id = dispute.id,
        booking_id = booking.id,
        outcome = outcome_name,
        admin_id = admin.user_id,
        "Dispute resolved",
    );

    Ok(Json(DataResponse::new(dispute)))
}
