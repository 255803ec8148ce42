//! Handlers for quotes: submission against a request, the provider's own
//! quotes, withdrawal, and acceptance (which creates the booking).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use servicematch_core::error::CoreError;
use servicematch_core::status::QuoteStatus;
use servicematch_core::types::{Cents, DbId, Timestamp};
use servicematch_db::models::booking::Booking;
use servicematch_db::models::quote::{CreateQuote, Quote, QuoteWithProvider};
use servicematch_db::repositories::{
    AnalyticsRepo, BookingRepo, ProviderProfileRepo, QuoteRepo, QuoteRequestRepo,
};
use servicematch_events::{types, PlatformEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::job_title;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireCustomer, RequireProvider};
use crate::query::StatusPageParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

/// Validity window applied when a provider does not set `valid_until`.
const DEFAULT_QUOTE_VALIDITY_DAYS: i64 = 14;

/// Request body for `POST /quote-requests/{id}/quotes`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuoteBody {
    pub amount_cents: Cents,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub message: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000 hours"))]
    pub estimated_hours: Option<i32>,
    pub available_from: Option<NaiveDate>,
    pub valid_until: Option<Timestamp>,
}

/// POST /api/v1/quote-requests/{id}/quotes
///
/// The provider must offer the request's category. One quote per provider
/// per request.
pub async fn submit_quote(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<SubmitQuoteBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Quote>>)> {
    input.validate()?;

    let profile = ProviderProfileRepo::find_by_user(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Create your provider profile before quoting".into(),
            ))
        })?;
    let request = QuoteRequestRepo::find_by_id(&state.pool, request_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "QuoteRequest",
            id: request_id,
        }))?;
    if !profile.categories.contains(&request.category) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Your profile does not offer '{}' work",
            request.category
        ))));
    }

    let now = Utc::now();
    let valid_until = input
        .valid_until
        .unwrap_or_else(|| now + Duration::days(DEFAULT_QUOTE_VALIDITY_DAYS));
    if valid_until <= now {
        return Err(AppError::Core(CoreError::Validation(
            "valid_until must be in the future".into(),
        )));
    }

    let (quote, request) = QuoteRepo::create(
        &state.pool,
        request_id,
        auth.user_id,
        &CreateQuote {
            amount_cents: input.amount_cents,
            message: input.message,
            estimated_hours: input.estimated_hours,
            available_from: input.available_from,
            valid_until,
        },
    )
    .await?;

    state.event_bus.publish(
        PlatformEvent::new(types::QUOTE_SUBMITTED)
            .with_source(types::ENTITY_QUOTE, quote.id)
            .with_actor(auth.user_id)
            .with_recipient(request.customer_id)
            .with_payload(json!({
                "quote_id": quote.id,
                "quote_request_id": request.id,
                "title": request.title,
                "amount_cents": quote.amount_cents,
            })),
    );
    tracing::info!(quote_id = quote.id, quote_request_id = request.id, "Quote submitted");

    Ok((StatusCode::CREATED, Json(DataResponse::new(quote))))
}

/// GET /api/v1/quote-requests/{id}/quotes
///
/// The owning customer and admins see every quote. A provider sees only
/// their own.
pub async fn list_quotes_for_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<QuoteWithProvider>>>> {
    let request = QuoteRequestRepo::find_by_id(&state.pool, request_id)
        .await?
        .filter(|r| auth.is_admin() || auth.is_provider() || r.customer_id == auth.user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "QuoteRequest",
            id: request_id,
        }))?;

    let mut quotes = QuoteRepo::list_for_request(&state.pool, request.id).await?;
    if auth.is_provider() {
        quotes.retain(|q| q.provider_id == auth.user_id);
    }
    Ok(Json(DataResponse::new(quotes)))
}

/// GET /api/v1/quotes/mine?status=&page=&per_page=
pub async fn list_my_quotes(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
    Query(params): Query<StatusPageParams>,
) -> AppResult<Json<PageResponse<Quote>>> {
    let status = params.status(QuoteStatus::parse)?;
    let quotes =
        QuoteRepo::list_for_provider(&state.pool, auth.user_id, status, params.page_request())
            .await?;
    Ok(Json(quotes.into()))
}

/// POST /api/v1/quotes/{id}/withdraw
pub async fn withdraw_quote(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
    Path(quote_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Quote>>> {
    let quote = QuoteRepo::withdraw(&state.pool, quote_id, auth.user_id).await?;

    if let Some(request) = QuoteRequestRepo::find_by_id(&state.pool, quote.quote_request_id).await? {
        state.event_bus.publish(
            PlatformEvent::new(types::QUOTE_WITHDRAWN)
                .with_source(types::ENTITY_QUOTE, quote.id)
                .with_actor(auth.user_id)
                .with_recipient(request.customer_id)
                .with_payload(json!({
                    "quote_id": quote.id,
                    "quote_request_id": request.id,
                    "title": request.title,
                })),
        );
    }
    Ok(Json(DataResponse::new(quote)))
}

/// POST /api/v1/quotes/{id}/accept
///
/// Creates the booking and its ledger rows in one transaction; every other
/// pending quote on the request is declined. Returns 201 with the booking.
pub async fn accept_quote(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
    Path(quote_id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<Booking>>)> {
    let accepted = BookingRepo::accept_quote(
        &state.pool,
        quote_id,
        auth.user_id,
        state.config.platform_fee_bps,
    )
    .await?;
    let booking = accepted.booking;
    let title = job_title(&state, booking.quote_request_id).await;

    state.event_bus.publish(
        PlatformEvent::new(types::QUOTE_ACCEPTED)
            .with_source(types::ENTITY_BOOKING, booking.id)
            .with_actor(auth.user_id)
            .with_recipient(booking.provider_id)
            .with_payload(json!({
                "booking_id": booking.id,
                "quote_id": booking.quote_id,
                "quote_request_id": booking.quote_request_id,
                "title": title,
                "amount_cents": booking.amount_cents,
            })),
    );
    if !accepted.declined_provider_ids.is_empty() {
        state.event_bus.publish(
            PlatformEvent::new(types::QUOTE_DECLINED)
                .with_source(types::ENTITY_QUOTE_REQUEST, booking.quote_request_id)
                .with_actor(auth.user_id)
                .with_recipients(accepted.declined_provider_ids)
                .with_payload(json!({
                    "quote_request_id": booking.quote_request_id,
                    "title": title,
                })),
        );
    }

    tracing::info!(
        booking_id = booking.id,
        quote_id = booking.quote_id,
        amount_cents = booking.amount_cents,
        platform_fee_cents = booking.platform_fee_cents,
        "Quote accepted",
    );
    AnalyticsRepo::record(
        &state.pool,
        Some(auth.user_id),
        "quote_accepted",
        json!({ "booking_id": booking.id, "amount_cents": booking.amount_cents }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(booking))))
}
