//! Customer job posts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use servicematch_core::error::CoreError;
use servicematch_core::status::QuoteRequestStatus;
use servicematch_core::types::{Cents, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `quote_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuoteRequest {
    pub id: DbId,
    pub customer_id: DbId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub postcode: String,
    pub region: String,
    pub budget_cents: Option<Cents>,
    pub preferred_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QuoteRequest {
    pub fn status(&self) -> Result<QuoteRequestStatus, CoreError> {
        QuoteRequestStatus::parse(&self.status)
    }
}

/// Insert payload. Category, postcode and region are validated upstream.
#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub postcode: String,
    pub region: String,
    pub budget_cents: Option<Cents>,
    pub preferred_date: Option<NaiveDate>,
}
