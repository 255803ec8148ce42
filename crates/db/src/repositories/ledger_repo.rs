//! Repository for the `ledger_entries` table.
//!
//! Entries are written only inside the booking, dispute and payment
//! transactions; the public API here is read-mostly.

use servicematch_core::status::LedgerEntryKind;
use servicematch_core::types::{Cents, DbId};
use sqlx::{PgConnection, PgPool};

use crate::models::ledger::LedgerEntry;

const COLUMNS: &str =
    "id, booking_id, kind, amount_cents, description, external_ref, created_at, updated_at";

pub struct LedgerRepo;

impl LedgerRepo {
    /// Every entry for a booking in the order it was written.
    pub async fn list_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ledger_entries WHERE booking_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(booking_id)
            .fetch_all(pool)
            .await
    }

    /// Attach a processor reference (transfer or refund ID) to an entry.
    pub async fn set_external_ref(
        pool: &PgPool,
        entry_id: DbId,
        external_ref: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE ledger_entries SET external_ref = $2 WHERE id = $1")
            .bind(entry_id)
            .bind(external_ref)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn insert(
        conn: &mut PgConnection,
        booking_id: DbId,
        kind: LedgerEntryKind,
        amount: Cents,
        description: &str,
    ) -> Result<LedgerEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO ledger_entries (booking_id, kind, amount_cents, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(booking_id)
            .bind(kind.as_str())
            .bind(amount)
            .bind(description)
            .fetch_one(&mut *conn)
            .await
    }

    pub(crate) async fn find_of_kind(
        conn: &mut PgConnection,
        booking_id: DbId,
        kind: LedgerEntryKind,
    ) -> Result<Option<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ledger_entries
             WHERE booking_id = $1 AND kind = $2
             ORDER BY id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(booking_id)
            .bind(kind.as_str())
            .fetch_optional(&mut *conn)
            .await
    }

    pub(crate) async fn exists_of_kind(
        conn: &mut PgConnection,
        booking_id: DbId,
        kind: LedgerEntryKind,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ledger_entries WHERE booking_id = $1 AND kind = $2)",
        )
        .bind(booking_id)
        .bind(kind.as_str())
        .fetch_one(&mut *conn)
        .await
    }
}
