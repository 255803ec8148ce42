//! Repository for the `disputes` table.

use servicematch_core::pagination::{PageRequest, Paginated};
use servicematch_core::status::{ensure_transition, BookingStatus, DisputeStatus, LedgerEntryKind};
use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoError;
use crate::models::booking::BookingTransition;
use crate::models::dispute::{Dispute, DisputeOutcome, DisputeWithBooking};
use crate::repositories::{booking_repo, LedgerRepo};

const COLUMNS: &str = "id, booking_id, opened_by, reason, status, resolution_notes, \
                        resolved_by, resolved_at, created_at, updated_at";

pub struct DisputeRepo;

impl DisputeRepo {
    /// Open a dispute against a booking and move the booking to DISPUTED.
    pub async fn open(
        pool: &PgPool,
        booking_id: DbId,
        opened_by: DbId,
        reason: &str,
    ) -> Result<DisputeWithBooking, RepoError> {
        let mut tx = pool.begin().await?;
        let booking = booking_repo::lock(&mut tx, booking_id).await?;

        if !booking.is_participant(opened_by) {
            return Err(RepoError::forbidden("You are not part of this booking"));
        }
        ensure_transition(booking.status()?, BookingStatus::Disputed)?;

        let query = format!(
            "INSERT INTO disputes (booking_id, opened_by, reason)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let dispute = sqlx::query_as::<_, Dispute>(&query)
            .bind(booking_id)
            .bind(opened_by)
            .bind(reason)
            .fetch_one(&mut *tx)
            .await?;
        let booking = booking_repo::set_status(&mut tx, booking_id, BookingStatus::Disputed).await?;

        tx.commit().await?;
        Ok(DisputeWithBooking { dispute, booking })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dispute>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM disputes WHERE id = $1");
        sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Disputes for the admin queue, oldest unresolved first.
    pub async fn list(
        pool: &PgPool,
        status: Option<DisputeStatus>,
        page: PageRequest,
    ) -> Result<Paginated<Dispute>, sqlx::Error> {
        let status = status.map(|s| s.as_str());
        let query = format!(
            "SELECT {COLUMNS} FROM disputes
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, Dispute>(&query)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM disputes WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(pool)
                .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// An admin picks up an open dispute. Resolution is still possible
    /// afterwards; a second pick-up or a resolved dispute is a conflict.
    pub async fn mark_under_review(pool: &PgPool, id: DbId) -> Result<Dispute, RepoError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM disputes WHERE id = $1 FOR UPDATE");
        let dispute = sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::not_found("Dispute", id))?;
        ensure_transition(dispute.status()?, DisputeStatus::UnderReview)?;

        let query = format!("UPDATE disputes SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        let dispute = sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .bind(DisputeStatus::UnderReview.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(dispute)
    }

    /// Close a dispute.
    ///
    /// For the customer: the booking is REFUNDED and a REFUND row for the
    /// full amount is written. A payout already released is reversed first
    /// so the provider does not keep it. For the provider: the booking returns to
    /// COMPLETED and the payout is released if it was not already.
    pub async fn resolve(
        pool: &PgPool,
        id: DbId,
        admin_id: DbId,
        outcome: DisputeOutcome,
        notes: Option<&str>,
    ) -> Result<(Dispute, BookingTransition), RepoError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM disputes WHERE id = $1 FOR UPDATE");
        let dispute = sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::not_found("Dispute", id))?;
        ensure_transition(dispute.status()?, outcome.status())?;

        let booking = booking_repo::lock(&mut tx, dispute.booking_id).await?;
        let transition = match outcome {
            DisputeOutcome::Customer => {
                ensure_transition(booking.status()?, BookingStatus::Refunded)?;
                let booking =
                    booking_repo::set_status(&mut tx, booking.id, BookingStatus::Refunded).await?;
                let reversal = booking_repo::reverse_payout(&mut tx, &booking).await?;
                let entry = LedgerRepo::insert(
                    &mut tx,
                    booking.id,
                    LedgerEntryKind::Refund,
                    booking.amount_cents,
                    "Refund after dispute",
                )
                .await?;
                BookingTransition {
                    refunded_cents: Some(booking.amount_cents),
                    ledger_entry_id: Some(entry.id),
                    reversal,
                    booking,
                }
            }
            DisputeOutcome::Provider => {
                ensure_transition(booking.status()?, BookingStatus::Completed)?;
                let booking = booking_repo::set_completed(&mut tx, booking.id).await?;
                let ledger_entry_id = booking_repo::release_payout(&mut tx, &booking).await?;
                BookingTransition {
                    booking,
                    ledger_entry_id,
                    refunded_cents: None,
                    reversal: None,
                }
            }
        };

        let query = format!(
            "UPDATE disputes
             SET status = $2, resolution_notes = $3, resolved_by = $4, resolved_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let dispute = sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .bind(outcome.status().as_str())
            .bind(notes)
            .bind(admin_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((dispute, transition))
    }
}
