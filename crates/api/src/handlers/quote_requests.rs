//! Handlers for the `/quote-requests` resource.
//!
//! Customers post and manage their own requests. Providers see the open
//! requests in the categories their profile lists.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use servicematch_core::categories::{
    normalize_postcode, region_for_postcode, validate_category, validate_region,
};
use servicematch_core::error::CoreError;
use servicematch_core::pagination::PageRequest;
use servicematch_core::status::QuoteRequestStatus;
use servicematch_core::types::{Cents, DbId};
use servicematch_db::models::quote_request::{CreateQuoteRequest, QuoteRequest};
use servicematch_db::repositories::{
    AnalyticsRepo, ProviderProfileRepo, QuoteRepo, QuoteRequestRepo,
};
use servicematch_events::{types, PlatformEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireCustomer;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /quote-requests`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuoteRequestBody {
    #[validate(length(min = 5, max = 120, message = "must be 5-120 characters"))]
    pub title: String,
    #[validate(length(min = 10, max = 5000, message = "must be 10-5000 characters"))]
    pub description: String,
    pub category: String,
    pub postcode: String,
    #[validate(range(min = 1, message = "must be positive"))]
    pub budget_cents: Option<Cents>,
    pub preferred_date: Option<NaiveDate>,
}

/// Query parameters for `GET /quote-requests`.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteRequestListParams {
    /// Customers only: filter their own requests by status.
    pub status: Option<String>,
    /// Providers only: narrow the job board to one region.
    pub region: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/quote-requests
pub async fn create_quote_request(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
    Json(input): Json<CreateQuoteRequestBody>,
) -> AppResult<(StatusCode, Json<DataResponse<QuoteRequest>>)> {
    input.validate()?;
    validate_category(&input.category)?;
    let postcode = normalize_postcode(&input.postcode)?;
    let region = region_for_postcode(&postcode).to_string();

    let request = QuoteRequestRepo::create(
        &state.pool,
        auth.user_id,
        &CreateQuoteRequest {
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            category: input.category,
            postcode,
            region,
            budget_cents: input.budget_cents,
            preferred_date: input.preferred_date,
        },
    )
    .await?;

    tracing::info!(
        quote_request_id = request.id,
        category = %request.category,
        region = %request.region,
        "Quote request posted",
    );
    AnalyticsRepo::record(
        &state.pool,
        Some(auth.user_id),
        "quote_request_created",
        json!({ "quote_request_id": request.id, "category": request.category }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(request))))
}

/// GET /api/v1/quote-requests
///
/// Customers get their own requests; providers get the open job board for
/// their categories.
pub async fn list_quote_requests(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<QuoteRequestListParams>,
) -> AppResult<Json<PageResponse<QuoteRequest>>> {
    let page = PageRequest::new(params.page, params.per_page);

    let results = if auth.is_customer() {
        let status = params
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| QuoteRequestStatus::parse(&s.to_uppercase()))
            .transpose()?;
        QuoteRequestRepo::list_for_customer(&state.pool, auth.user_id, status, page).await?
    } else if auth.is_provider() {
        let profile = ProviderProfileRepo::find_by_user(&state.pool, auth.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(
                    "Create your provider profile to see matching jobs".into(),
                ))
            })?;
        let region = params.region.filter(|r| !r.is_empty());
        if let Some(r) = &region {
            validate_region(r)?;
        }
        QuoteRequestRepo::list_open_in_categories(
            &state.pool,
            &profile.categories,
            region.as_deref(),
            page,
        )
        .await?
    } else {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only customers and providers have quote requests".into(),
        )));
    };

    Ok(Json(results.into()))
}

/// GET /api/v1/quote-requests/{id}
///
/// Visible to the owning customer, to admins, to providers who already
/// quoted on it, and to providers whose categories match an open request.
pub async fn get_quote_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<QuoteRequest>>> {
    let request = QuoteRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(not_found(id))?;

    if !can_view(&state, &auth, &request).await? {
        return Err(not_found(id));
    }
    Ok(Json(DataResponse::new(request)))
}

/// POST /api/v1/quote-requests/{id}/cancel
///
/// Cancels the request and declines every pending quote on it.
pub async fn cancel_quote_request(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<QuoteRequest>>> {
    let (request, declined) = QuoteRequestRepo::cancel(&state.pool, id, auth.user_id).await?;

    if !declined.is_empty() {
        state.event_bus.publish(
            PlatformEvent::new(types::QUOTE_DECLINED)
                .with_source(types::ENTITY_QUOTE_REQUEST, request.id)
                .with_actor(auth.user_id)
                .with_recipients(declined)
                .with_payload(json!({
                    "quote_request_id": request.id,
                    "title": request.title,
                })),
        );
    }
    tracing::info!(quote_request_id = request.id, "Quote request cancelled");
    Ok(Json(DataResponse::new(request)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "QuoteRequest",
        id,
    })
}

pub(crate) async fn can_view(
    state: &AppState,
    auth: &AuthUser,
    request: &QuoteRequest,
) -> AppResult<bool> {
    if auth.is_admin() || request.customer_id == auth.user_id {
        return Ok(true);
    }
    if !auth.is_provider() {
        return Ok(false);
    }
    if QuoteRepo::find_for_provider_on_request(&state.pool, request.id, auth.user_id)
        .await?
        .is_some()
    {
        return Ok(true);
    }
    let matches_profile = ProviderProfileRepo::find_by_user(&state.pool, auth.user_id)
        .await?
        .is_some_and(|p| p.categories.contains(&request.category));
    Ok(matches_profile && request.status()? == QuoteRequestStatus::Open)
}
