//! Financial trail rows attached to bookings.

use serde::Serialize;
use servicematch_core::error::CoreError;
use servicematch_core::status::LedgerEntryKind;
use servicematch_core::types::{Cents, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `ledger_entries` table. Amounts are always non-negative;
/// the direction is implied by `kind`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub booking_id: DbId,
    pub kind: String,
    pub amount_cents: Cents,
    pub description: String,
    pub external_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LedgerEntry {
    pub fn kind(&self) -> Result<LedgerEntryKind, CoreError> {
        LedgerEntryKind::parse(&self.kind)
    }
}
