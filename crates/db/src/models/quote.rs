//! Provider quotes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use servicematch_core::error::CoreError;
use servicematch_core::status::QuoteStatus;
use servicematch_core::types::{Cents, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `quotes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quote {
    pub id: DbId,
    pub quote_request_id: DbId,
    pub provider_id: DbId,
    pub amount_cents: Cents,
    pub message: Option<String>,
    pub estimated_hours: Option<i32>,
    pub available_from: Option<NaiveDate>,
    pub valid_until: Timestamp,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Quote {
    pub fn status(&self) -> Result<QuoteStatus, CoreError> {
        QuoteStatus::parse(&self.status)
    }
}

/// A quote joined with the provider's public profile, as shown to the
/// customer comparing offers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuoteWithProvider {
    pub id: DbId,
    pub quote_request_id: DbId,
    pub provider_id: DbId,
    pub amount_cents: Cents,
    pub message: Option<String>,
    pub estimated_hours: Option<i32>,
    pub available_from: Option<NaiveDate>,
    pub valid_until: Timestamp,
    pub status: String,
    pub created_at: Timestamp,
    pub provider_name: String,
    pub business_name: Option<String>,
    #[serde(serialize_with = "crate::models::rating::serialize_opt")]
    pub rating_avg: Option<f64>,
    pub rating_count: Option<i32>,
}

/// Insert payload for a quote.
#[derive(Debug, Deserialize)]
pub struct CreateQuote {
    pub amount_cents: Cents,
    pub message: Option<String>,
    pub estimated_hours: Option<i32>,
    pub available_from: Option<NaiveDate>,
    pub valid_until: Timestamp,
}
