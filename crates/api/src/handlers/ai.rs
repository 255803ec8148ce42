//! FairPrice and SnapFix helper endpoints.
//!
//! Both ask the LLM when a client is configured and fall back to the static
//! tables in `servicematch_core` when it is not, when the call fails, or
//! when the answer does not pass validation. The caller always gets an
//! answer. History rows and analytics are best effort.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use servicematch_core::categories::{
    normalize_postcode, region_for_postcode, validate_category, validate_region, REGION_OTHER,
};
use servicematch_core::diagnosis::{
    fallback_diagnosis, parse_ai_diagnosis, validate_description, Diagnosis,
};
use servicematch_core::fees::format_gbp;
use servicematch_core::pricing::{
    assess_quote, fallback_estimate, parse_ai_estimate, PriceEstimate, QuoteAssessment,
};
use servicematch_core::types::Cents;
use servicematch_db::models::ai::{CreateDiagnosis, CreatePriceCheck, DiagnosisRecord, PriceCheck};
use servicematch_db::repositories::{AnalyticsRepo, DiagnosisRepo, PriceCheckRepo};
use servicematch_integrations::{DiagnosisPrompt, PricePrompt};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /ai/fair-price`.
#[derive(Debug, Deserialize, Validate)]
pub struct FairPriceRequest {
    pub category: String,
    /// Region is derived from the postcode when given.
    pub postcode: Option<String>,
    pub region: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    /// A quote the customer received, to be judged against the estimate.
    pub quoted_cents: Option<Cents>,
}

#[derive(Debug, Serialize)]
pub struct FairPriceResponse {
    pub category: String,
    pub region: String,
    pub estimate: PriceEstimate,
    /// `low`, `typical` and `high` as display strings.
    pub display: PriceDisplay,
    pub assessment: Option<AssessmentView>,
}

#[derive(Debug, Serialize)]
pub struct PriceDisplay {
    pub low: String,
    pub typical: String,
    pub high: String,
}

#[derive(Debug, Serialize)]
pub struct AssessmentView {
    #[serde(flatten)]
    pub assessment: QuoteAssessment,
    pub verdict_label: &'static str,
}

/// Request body for `POST /ai/snap-fix`.
#[derive(Debug, Deserialize, Validate)]
pub struct SnapFixRequest {
    pub description: String,
    pub category_hint: Option<String>,
    /// Photo of the problem, already uploaded to blob storage.
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapFixResponse {
    #[serde(flatten)]
    pub diagnosis: Diagnosis,
    pub urgency_label: &'static str,
    pub estimated_range: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AiHistory {
    pub price_checks: Vec<PriceCheck>,
    pub diagnoses: Vec<DiagnosisRecord>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/ai/fair-price
pub async fn fair_price(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FairPriceRequest>,
) -> AppResult<Json<DataResponse<FairPriceResponse>>> {
    input.validate()?;
    validate_category(&input.category)?;
    let region = resolve_region(input.postcode.as_deref(), input.region.as_deref())?;
    let description = input.description.as_deref().map(str::trim).unwrap_or_default();
    let month = Utc::now().month();

    let estimate = match ai_estimate(&state, &input.category, &region, description, month).await {
        Some(estimate) => estimate,
        None => fallback_estimate(&input.category, &region, month)?,
    };
    let assessment = input
        .quoted_cents
        .map(|amount| assess_quote(amount, &estimate))
        .transpose()?
        .map(|assessment| AssessmentView {
            verdict_label: assessment.verdict.label(),
            assessment,
        });

    let record = CreatePriceCheck {
        user_id: Some(auth.user_id),
        category: input.category.clone(),
        region: region.clone(),
        description: Some(description.to_string()).filter(|d| !d.is_empty()),
        quoted_cents: input.quoted_cents,
        low_cents: estimate.low,
        typical_cents: estimate.typical,
        high_cents: estimate.high,
        verdict: assessment
            .as_ref()
            .map(|a| a.assessment.verdict.as_str().to_string()),
        source: estimate.source.clone(),
    };
    if let Err(e) = PriceCheckRepo::create(&state.pool, &record).await {
        tracing::warn!(error = %e, user_id = auth.user_id, "Failed to store price check");
    }
    AnalyticsRepo::record(
        &state.pool,
        Some(auth.user_id),
        "fair_price_checked",
        json!({ "category": input.category, "region": region, "source": estimate.source }),
    )
    .await;

    Ok(Json(DataResponse::new(FairPriceResponse {
        category: input.category,
        region,
        display: PriceDisplay {
            low: format_gbp(estimate.low),
            typical: format_gbp(estimate.typical),
            high: format_gbp(estimate.high),
        },
        estimate,
        assessment,
    })))
}

/// POST /api/v1/ai/snap-fix
pub async fn snap_fix(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SnapFixRequest>,
) -> AppResult<Json<DataResponse<SnapFixResponse>>> {
    input.validate()?;
    validate_description(&input.description)?;
    let hint = input.category_hint.as_deref().filter(|c| !c.is_empty());
    if let Some(c) = hint {
        validate_category(c)?;
    }
    let description = input.description.trim();

    let diagnosis = match ai_diagnosis(&state, description, hint, input.image_url.as_deref()).await
    {
        Some(diagnosis) => diagnosis,
        None => fallback_diagnosis(description, hint)?,
    };

    let record = CreateDiagnosis {
        user_id: Some(auth.user_id),
        description: description.to_string(),
        image_url: input.image_url.clone(),
        likely_issue: diagnosis.likely_issue.clone(),
        category: diagnosis.category.clone(),
        urgency: diagnosis.urgency.as_str().to_string(),
        diy_possible: diagnosis.diy_possible,
        estimated_low_cents: diagnosis.estimated_low,
        estimated_high_cents: diagnosis.estimated_high,
        source: diagnosis.source.clone(),
    };
    if let Err(e) = DiagnosisRepo::create(&state.pool, &record).await {
        tracing::warn!(error = %e, user_id = auth.user_id, "Failed to store diagnosis");
    }
    AnalyticsRepo::record(
        &state.pool,
        Some(auth.user_id),
        "snap_fix_used",
        json!({
            "category": diagnosis.category,
            "urgency": diagnosis.urgency.as_str(),
            "with_image": input.image_url.is_some(),
            "source": diagnosis.source,
        }),
    )
    .await;

    Ok(Json(DataResponse::new(SnapFixResponse {
        urgency_label: diagnosis.urgency.label(),
        estimated_range: format!(
            "{} - {}",
            format_gbp(diagnosis.estimated_low),
            format_gbp(diagnosis.estimated_high)
        ),
        diagnosis,
    })))
}

/// GET /api/v1/ai/history?limit=
///
/// The caller's recent price checks and diagnoses, newest first.
pub async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<AiHistory>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let price_checks = PriceCheckRepo::list_for_user(&state.pool, auth.user_id, limit).await?;
    let diagnoses = DiagnosisRepo::list_for_user(&state.pool, auth.user_id, limit).await?;
    Ok(Json(DataResponse::new(AiHistory {
        price_checks,
        diagnoses,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_region(postcode: Option<&str>, region: Option<&str>) -> AppResult<String> {
    if let Some(postcode) = postcode.filter(|p| !p.trim().is_empty()) {
        let normalized = normalize_postcode(postcode)?;
        return Ok(region_for_postcode(&normalized).to_string());
    }
    match region.filter(|r| !r.is_empty()) {
        Some(r) => {
            validate_region(r)?;
            Ok(r.to_string())
        }
        None => Ok(REGION_OTHER.to_string()),
    }
}

async fn ai_estimate(
    state: &AppState,
    category: &str,
    region: &str,
    description: &str,
    month: u32,
) -> Option<PriceEstimate> {
    let client = state.openai.as_ref()?;
    let prompt = PricePrompt {
        category,
        region,
        description,
        month,
    };
    match client.estimate_price(&prompt).await {
        Ok(answer) => {
            let parsed = parse_ai_estimate(&answer);
            if parsed.is_none() {
                tracing::warn!(category, "LLM price estimate failed validation; using fallback");
            }
            parsed
        }
        Err(e) => {
            tracing::warn!(error = %e, category, "LLM price estimate failed; using fallback");
            None
        }
    }
}

async fn ai_diagnosis(
    state: &AppState,
    description: &str,
    category_hint: Option<&str>,
    image_url: Option<&str>,
) -> Option<Diagnosis> {
    let client = state.openai.as_ref()?;
    let prompt = DiagnosisPrompt {
        description,
        category_hint,
        image_url,
    };
    match client.diagnose(&prompt).await {
        Ok(answer) => {
            let parsed = parse_ai_diagnosis(&answer);
            if parsed.is_none() {
                tracing::warn!("LLM diagnosis failed validation; using fallback");
            }
            parsed
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM diagnosis failed; using fallback");
            None
        }
    }
}
