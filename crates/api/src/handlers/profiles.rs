//! Handlers for customer and provider profiles and the provider directory.
//!
//! `/me/...` endpoints act on the caller's own profile. `/providers` is the
//! public directory customers browse before posting a job.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use servicematch_core::categories::{
    normalize_postcode, region_for_postcode, validate_category, validate_category_list,
    validate_region,
};
use servicematch_core::error::CoreError;
use servicematch_core::types::{Cents, DbId};
use servicematch_db::models::profile::{
    CustomerProfile, ProviderProfile, ProviderSearch, ProviderSummary, UpsertCustomerProfile,
    UpsertProviderProfile,
};
use servicematch_db::models::review::ReviewWithAuthor;
use servicematch_db::repositories::{
    CustomerProfileRepo, ProviderProfileRepo, ReviewRepo, UserRepo,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireCustomer, RequireProvider};
use crate::query::PaginationParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerProfileRequest {
    #[validate(length(max = 32, message = "must be at most 32 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub address: Option<String>,
    pub postcode: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProviderProfileRequest {
    #[validate(length(min = 2, max = 120, message = "must be 2-120 characters"))]
    pub business_name: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub bio: Option<String>,
    pub categories: Vec<String>,
    pub postcode: String,
    #[validate(range(min = 1, max = 200, message = "must be between 1 and 200 km"))]
    pub service_radius_km: Option<i32>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub hourly_rate_cents: Option<Cents>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSearchParams {
    pub category: Option<String>,
    pub region: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PayoutOnboarding {
    /// Hosted onboarding page the provider is sent to.
    pub url: String,
    pub payouts_enabled: bool,
}

const DEFAULT_SERVICE_RADIUS_KM: i32 = 25;

// ---------------------------------------------------------------------------
// Customer profile
// ---------------------------------------------------------------------------

/// GET /api/v1/me/customer-profile
pub async fn get_customer_profile(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Option<CustomerProfile>>>> {
    let profile = CustomerProfileRepo::find_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /api/v1/me/customer-profile
pub async fn put_customer_profile(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
    Json(input): Json<CustomerProfileRequest>,
) -> AppResult<Json<DataResponse<CustomerProfile>>> {
    input.validate()?;
    let postcode = input
        .postcode
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(normalize_postcode)
        .transpose()?;

    let profile = CustomerProfileRepo::upsert(
        &state.pool,
        auth.user_id,
        &UpsertCustomerProfile {
            phone: input.phone,
            address: input.address,
            postcode,
        },
    )
    .await?;
    Ok(Json(DataResponse::new(profile)))
}

// ---------------------------------------------------------------------------
// Provider profile
// ---------------------------------------------------------------------------

/// GET /api/v1/me/provider-profile
pub async fn get_provider_profile(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Option<ProviderProfile>>>> {
    let profile = ProviderProfileRepo::find_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /api/v1/me/provider-profile
///
/// The pricing region is derived from the postcode.
pub async fn put_provider_profile(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
    Json(input): Json<ProviderProfileRequest>,
) -> AppResult<Json<DataResponse<ProviderProfile>>> {
    input.validate()?;
    validate_category_list(&input.categories)?;
    let postcode = normalize_postcode(&input.postcode)?;
    let region = region_for_postcode(&postcode).to_string();

    let profile = ProviderProfileRepo::upsert(
        &state.pool,
        auth.user_id,
        &UpsertProviderProfile {
            business_name: input.business_name.trim().to_string(),
            bio: input.bio,
            categories: input.categories,
            postcode,
            region,
            service_radius_km: input.service_radius_km.unwrap_or(DEFAULT_SERVICE_RADIUS_KM),
            hourly_rate_cents: input.hourly_rate_cents,
        },
    )
    .await?;
    Ok(Json(DataResponse::new(profile)))
}

/// POST /api/v1/me/provider-profile/payouts
///
/// Create the provider's connected payout account on first use, then return
/// a fresh onboarding link for it.
pub async fn start_payout_onboarding(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PayoutOnboarding>>> {
    let gateway = state.payments()?;
    let profile = ProviderProfileRepo::find_by_user(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Create your provider profile before setting up payouts".into(),
            ))
        })?;

    let account_id = match profile.stripe_account_id {
        Some(id) => id,
        None => {
            let user = UserRepo::find_by_id(&state.pool, auth.user_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "User",
                    id: auth.user_id,
                }))?;
            let id = gateway.create_connect_account(&user.email).await?;
            ProviderProfileRepo::set_stripe_account(&state.pool, auth.user_id, &id).await?;
            tracing::info!(user_id = auth.user_id, account_id = %id, "Connected account created");
            id
        }
    };

    let base = state.config.app_base_url.trim_end_matches('/');
    let url = gateway
        .create_account_link(
            &account_id,
            &format!("{base}/provider/payouts?refresh=1"),
            &format!("{base}/provider/payouts?onboarded=1"),
        )
        .await?;

    Ok(Json(DataResponse::new(PayoutOnboarding {
        url,
        payouts_enabled: profile.payouts_enabled,
    })))
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// GET /api/v1/providers?category=&region=&page=&per_page=
pub async fn search_providers(
    State(state): State<AppState>,
    Query(params): Query<ProviderSearchParams>,
) -> AppResult<Json<PageResponse<ProviderSummary>>> {
    let category = params.category.filter(|c| !c.is_empty());
    let region = params.region.filter(|r| !r.is_empty());
    if let Some(c) = &category {
        validate_category(c)?;
    }
    if let Some(r) = &region {
        validate_region(r)?;
    }

    let page = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    }
    .page_request();
    let results =
        ProviderProfileRepo::search(&state.pool, &ProviderSearch { category, region }, page)
            .await?;
    Ok(Json(results.into()))
}

/// GET /api/v1/providers/{id}
pub async fn get_provider(
    State(state): State<AppState>,
    Path(provider_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProviderSummary>>> {
    let summary = ProviderProfileRepo::find_summary(&state.pool, provider_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Provider",
            id: provider_id,
        }))?;
    Ok(Json(DataResponse::new(summary)))
}

/// GET /api/v1/providers/{id}/reviews
pub async fn list_provider_reviews(
    State(state): State<AppState>,
    Path(provider_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<ReviewWithAuthor>>> {
    let reviews =
        ReviewRepo::list_for_provider(&state.pool, provider_id, params.page_request()).await?;
    Ok(Json(reviews.into()))
}
