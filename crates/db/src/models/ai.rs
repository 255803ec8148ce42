//! Stored FairPrice checks and SnapFix diagnoses.

use serde::Serialize;
use servicematch_core::types::{Cents, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `price_checks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriceCheck {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub category: String,
    pub region: String,
    pub description: Option<String>,
    pub quoted_cents: Option<Cents>,
    pub low_cents: Cents,
    pub typical_cents: Cents,
    pub high_cents: Cents,
    pub verdict: Option<String>,
    pub source: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreatePriceCheck {
    pub user_id: Option<DbId>,
    pub category: String,
    pub region: String,
    pub description: Option<String>,
    pub quoted_cents: Option<Cents>,
    pub low_cents: Cents,
    pub typical_cents: Cents,
    pub high_cents: Cents,
    pub verdict: Option<String>,
    pub source: String,
}

/// A row from the `diagnoses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DiagnosisRecord {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub description: String,
    pub image_url: Option<String>,
    pub likely_issue: String,
    pub category: String,
    pub urgency: String,
    pub diy_possible: bool,
    pub estimated_low_cents: Cents,
    pub estimated_high_cents: Cents,
    pub source: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateDiagnosis {
    pub user_id: Option<DbId>,
    pub description: String,
    pub image_url: Option<String>,
    pub likely_issue: String,
    pub category: String,
    pub urgency: String,
    pub diy_possible: bool,
    pub estimated_low_cents: Cents,
    pub estimated_high_cents: Cents,
    pub source: String,
}
