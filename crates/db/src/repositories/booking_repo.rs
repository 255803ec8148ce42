//! Repository for the `bookings` table.
//!
//! Every status change goes through a locked read, an
//! [`ensure_transition`] check, and the write, all in one transaction.
//! Transitions that move money write their ledger rows in the same
//! transaction.

use servicematch_core::fees::compute_fee_split;
use servicematch_core::pagination::{PageRequest, Paginated};
use servicematch_core::status::{
    ensure_transition, BookingStatus, LedgerEntryKind, QuoteRequestStatus, QuoteStatus,
};
use servicematch_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::booking::{AcceptedQuote, Booking, BookingTransition, PayoutReversal};
use crate::models::quote::Quote;
use crate::models::quote_request::QuoteRequest;
use crate::repositories::{quote_repo, quote_request_repo, LedgerRepo};

pub(crate) const COLUMNS: &str = "id, quote_id, quote_request_id, customer_id, provider_id, \
                                   amount_cents, platform_fee_cents, provider_earnings_cents, \
                                   fee_bps, scheduled_for, status, stripe_checkout_session_id, \
                                   stripe_payment_intent_id, paid_at, started_at, completed_at, \
                                   cancelled_at, cancellation_reason, created_at, updated_at";

pub struct BookingRepo;

impl BookingRepo {
    /// Accept a quote on behalf of the customer who owns its request.
    ///
    /// In one transaction: the quote moves to ACCEPTED, competing pending
    /// quotes to DECLINED, the request to ACCEPTED; a PENDING_PAYMENT
    /// booking is created with the fee split frozen at `fee_bps`, and the
    /// CUSTOMER_CHARGE, PLATFORM_FEE and PROVIDER_EARNING ledger rows are
    /// written.
    pub async fn accept_quote(
        pool: &PgPool,
        quote_id: DbId,
        customer_id: DbId,
        fee_bps: i64,
    ) -> Result<AcceptedQuote, RepoError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {} FROM quotes WHERE id = $1 FOR UPDATE", quote_repo::COLUMNS);
        let quote = sqlx::query_as::<_, Quote>(&query)
            .bind(quote_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::not_found("Quote", quote_id))?;

        let query = format!(
            "SELECT {} FROM quote_requests WHERE id = $1 FOR UPDATE",
            quote_request_repo::COLUMNS
        );
        let request = sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(quote.quote_request_id)
            .fetch_one(&mut *tx)
            .await?;

        if request.customer_id != customer_id {
            return Err(RepoError::forbidden("Only the customer who posted this request can accept quotes"));
        }
        ensure_transition(quote.status()?, QuoteStatus::Accepted)?;
        if quote.valid_until < chrono::Utc::now() {
            return Err(RepoError::conflict("This quote has expired"));
        }
        ensure_transition(request.status()?, QuoteRequestStatus::Accepted)?;

        let split = compute_fee_split(quote.amount_cents, fee_bps)?;

        sqlx::query("UPDATE quotes SET status = $2 WHERE id = $1")
            .bind(quote.id)
            .bind(QuoteStatus::Accepted.as_str())
            .execute(&mut *tx)
            .await?;

        let declined_provider_ids: Vec<DbId> = sqlx::query_scalar(
            "UPDATE quotes SET status = $3
             WHERE quote_request_id = $1 AND id <> $2 AND status = $4
             RETURNING provider_id",
        )
        .bind(request.id)
        .bind(quote.id)
        .bind(QuoteStatus::Declined.as_str())
        .bind(QuoteStatus::Pending.as_str())
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("UPDATE quote_requests SET status = $2 WHERE id = $1")
            .bind(request.id)
            .bind(QuoteRequestStatus::Accepted.as_str())
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO bookings
                (quote_id, quote_request_id, customer_id, provider_id, amount_cents,
                 platform_fee_cents, provider_earnings_cents, fee_bps, scheduled_for, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(quote.id)
            .bind(request.id)
            .bind(request.customer_id)
            .bind(quote.provider_id)
            .bind(split.quote_amount)
            .bind(split.platform_fee)
            .bind(split.provider_earnings)
            .bind(split.fee_bps)
            .bind(quote.available_from.or(request.preferred_date))
            .bind(BookingStatus::PendingPayment.as_str())
            .fetch_one(&mut *tx)
            .await?;

        let lines = [
            (LedgerEntryKind::CustomerCharge, split.customer_total, "Customer payment for booking"),
            (LedgerEntryKind::PlatformFee, split.platform_fee, "Platform fee"),
            (LedgerEntryKind::ProviderEarning, split.provider_earnings, "Provider earnings"),
        ];
        for (kind, amount, description) in lines {
            LedgerRepo::insert(&mut tx, booking.id, kind, amount, description).await?;
        }

        tx.commit().await?;
        Ok(AcceptedQuote {
            booking,
            declined_provider_ids,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_checkout_session(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE stripe_checkout_session_id = $1");
        sqlx::query_as::<_, Booking>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Bookings where the user is either the customer or the provider.
    pub async fn list_for_participant(
        pool: &PgPool,
        user_id: DbId,
        status: Option<BookingStatus>,
        page: PageRequest,
    ) -> Result<Paginated<Booking>, sqlx::Error> {
        let status = status.map(|s| s.as_str());
        let query = format!(
            "SELECT {COLUMNS} FROM bookings
             WHERE (customer_id = $1 OR provider_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Booking>(&query)
            .bind(user_id)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings
             WHERE (customer_id = $1 OR provider_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(pool)
        .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Every booking, for the admin console.
    pub async fn list_all(
        pool: &PgPool,
        status: Option<BookingStatus>,
        page: PageRequest,
    ) -> Result<Paginated<Booking>, sqlx::Error> {
        let status = status.map(|s| s.as_str());
        let query = format!(
            "SELECT {COLUMNS} FROM bookings
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, Booking>(&query)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(pool)
                .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Remember the hosted checkout session created for a booking.
    pub async fn set_checkout_session(
        pool: &PgPool,
        id: DbId,
        session_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings SET stripe_checkout_session_id = $2
             WHERE id = $1 AND status = 'PENDING_PAYMENT'",
        )
        .bind(id)
        .bind(session_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful payment.
    ///
    /// Idempotent: a webhook redelivered for a booking that is already past
    /// PENDING_PAYMENT returns the booking with `false`. The payment intent
    /// is stamped on the CUSTOMER_CHARGE ledger row.
    pub async fn mark_paid(
        pool: &PgPool,
        id: DbId,
        payment_intent_id: Option<&str>,
    ) -> Result<(Booking, bool), RepoError> {
        let mut tx = pool.begin().await?;
        let booking = lock(&mut tx, id).await?;

        let status = booking.status()?;
        if status != BookingStatus::PendingPayment {
            if status.holds_customer_funds() || status == BookingStatus::Refunded {
                return Ok((booking, false));
            }
            ensure_transition(status, BookingStatus::Paid)?;
        }

        let query = format!(
            "UPDATE bookings
             SET status = $2, paid_at = NOW(),
                 stripe_payment_intent_id = COALESCE($3, stripe_payment_intent_id)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(BookingStatus::Paid.as_str())
            .bind(payment_intent_id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(intent) = payment_intent_id {
            sqlx::query(
                "UPDATE ledger_entries SET external_ref = $2
                 WHERE booking_id = $1 AND kind = $3",
            )
            .bind(id)
            .bind(intent)
            .bind(LedgerEntryKind::CustomerCharge.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((booking, true))
    }

    /// Record a payment that landed after the booking was cancelled.
    ///
    /// The customer can finish the hosted checkout page after cancelling.
    /// The booking stays CANCELLED; the payment intent is stamped on the
    /// booking and its CUSTOMER_CHARGE row, and a REFUND row for the full
    /// amount is written. Returns `None` when the booking is not cancelled
    /// or a refund is already on the ledger, so redelivered webhooks do not
    /// refund twice.
    pub async fn refund_late_payment(
        pool: &PgPool,
        id: DbId,
        payment_intent_id: &str,
    ) -> Result<Option<BookingTransition>, RepoError> {
        let mut tx = pool.begin().await?;
        let booking = lock(&mut tx, id).await?;

        if booking.status()? != BookingStatus::Cancelled
            || LedgerRepo::exists_of_kind(&mut tx, id, LedgerEntryKind::Refund).await?
        {
            return Ok(None);
        }

        let query = format!(
            "UPDATE bookings SET stripe_payment_intent_id = $2, paid_at = COALESCE(paid_at, NOW())
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(payment_intent_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE ledger_entries SET external_ref = $2
             WHERE booking_id = $1 AND kind = $3",
        )
        .bind(id)
        .bind(payment_intent_id)
        .bind(LedgerEntryKind::CustomerCharge.as_str())
        .execute(&mut *tx)
        .await?;

        let entry = LedgerRepo::insert(
            &mut tx,
            id,
            LedgerEntryKind::Refund,
            booking.amount_cents,
            "Refund of payment received after cancellation",
        )
        .await?;

        tx.commit().await?;
        Ok(Some(BookingTransition {
            ledger_entry_id: Some(entry.id),
            refunded_cents: Some(booking.amount_cents),
            reversal: None,
            booking,
        }))
    }

    /// Provider marks the job as started.
    pub async fn start(pool: &PgPool, id: DbId, provider_id: DbId) -> Result<Booking, RepoError> {
        let mut tx = pool.begin().await?;
        let booking = lock(&mut tx, id).await?;

        if booking.provider_id != provider_id {
            return Err(RepoError::forbidden("Only the booked provider can start this job"));
        }
        ensure_transition(booking.status()?, BookingStatus::InProgress)?;

        let query = format!(
            "UPDATE bookings SET status = $2, started_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(BookingStatus::InProgress.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(booking)
    }

    /// Mark a paid or in-progress job as completed and release the
    /// provider's earnings.
    ///
    /// Writes a PROVIDER_PAYOUT ledger row and bumps the provider's
    /// completed job count.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
    ) -> Result<BookingTransition, RepoError> {
        let mut tx = pool.begin().await?;
        let booking = lock(&mut tx, id).await?;

        if !booking.is_participant(actor_id) {
            return Err(RepoError::forbidden("You are not part of this booking"));
        }
        ensure_transition(booking.status()?, BookingStatus::Completed)?;

        let booking = set_completed(&mut tx, id).await?;
        let ledger_entry_id = release_payout(&mut tx, &booking).await?;

        tx.commit().await?;
        Ok(BookingTransition {
            booking,
            ledger_entry_id,
            refunded_cents: None,
            reversal: None,
        })
    }

    /// Cancel a booking before the work starts.
    ///
    /// If the customer had already paid, a REFUND ledger row for the full
    /// amount is written and returned.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
        reason: Option<&str>,
    ) -> Result<BookingTransition, RepoError> {
        let mut tx = pool.begin().await?;
        let booking = lock(&mut tx, id).await?;

        if !booking.is_participant(actor_id) {
            return Err(RepoError::forbidden("You are not part of this booking"));
        }
        let status = booking.status()?;
        ensure_transition(status, BookingStatus::Cancelled)?;

        let query = format!(
            "UPDATE bookings
             SET status = $2, cancelled_at = NOW(), cancellation_reason = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(BookingStatus::Cancelled.as_str())
            .bind(reason)
            .fetch_one(&mut *tx)
            .await?;

        let (ledger_entry_id, refunded_cents) = if status.holds_customer_funds() {
            let entry = LedgerRepo::insert(
                &mut tx,
                booking.id,
                LedgerEntryKind::Refund,
                booking.amount_cents,
                "Refund on cancellation",
            )
            .await?;
            (Some(entry.id), Some(booking.amount_cents))
        } else {
            (None, None)
        };

        tx.commit().await?;
        Ok(BookingTransition {
            booking,
            ledger_entry_id,
            refunded_cents,
            reversal: None,
        })
    }
}

pub(crate) async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Booking, RepoError> {
    let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Booking>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepoError::not_found("Booking", id))
}

pub(crate) async fn set_status(
    conn: &mut PgConnection,
    id: DbId,
    status: BookingStatus,
) -> Result<Booking, sqlx::Error> {
    let query = format!("UPDATE bookings SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
    sqlx::query_as::<_, Booking>(&query)
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut *conn)
        .await
}

pub(crate) async fn set_completed(conn: &mut PgConnection, id: DbId) -> Result<Booking, sqlx::Error> {
    let query = format!(
        "UPDATE bookings
         SET status = $2, completed_at = COALESCE(completed_at, NOW())
         WHERE id = $1
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Booking>(&query)
        .bind(id)
        .bind(BookingStatus::Completed.as_str())
        .fetch_one(&mut *conn)
        .await
}

/// Write the PROVIDER_PAYOUT row once per booking and count the job.
///
/// A booking that returns to COMPLETED after a dispute already has its
/// payout row, so nothing is written twice.
pub(crate) async fn release_payout(
    conn: &mut PgConnection,
    booking: &Booking,
) -> Result<Option<DbId>, sqlx::Error> {
    if LedgerRepo::exists_of_kind(conn, booking.id, LedgerEntryKind::ProviderPayout).await? {
        return Ok(None);
    }
    let entry = LedgerRepo::insert(
        conn,
        booking.id,
        LedgerEntryKind::ProviderPayout,
        booking.provider_earnings_cents,
        "Payout to provider",
    )
    .await?;
    sqlx::query("UPDATE provider_profiles SET completed_jobs = completed_jobs + 1 WHERE user_id = $1")
        .bind(booking.provider_id)
        .execute(&mut *conn)
        .await?;
    Ok(Some(entry.id))
}

/// Undo a released payout ahead of a full refund.
///
/// Writes one PAYOUT_REVERSAL row matching the PROVIDER_PAYOUT row and takes
/// the job back off the provider's completed count. Returns `None` when no
/// payout was released or it was already reversed.
pub(crate) async fn reverse_payout(
    conn: &mut PgConnection,
    booking: &Booking,
) -> Result<Option<PayoutReversal>, sqlx::Error> {
    let Some(payout) =
        LedgerRepo::find_of_kind(conn, booking.id, LedgerEntryKind::ProviderPayout).await?
    else {
        return Ok(None);
    };
    if LedgerRepo::exists_of_kind(conn, booking.id, LedgerEntryKind::PayoutReversal).await? {
        return Ok(None);
    }
    let entry = LedgerRepo::insert(
        conn,
        booking.id,
        LedgerEntryKind::PayoutReversal,
        payout.amount_cents,
        "Payout reversed after dispute",
    )
    .await?;
    sqlx::query(
        "UPDATE provider_profiles SET completed_jobs = GREATEST(completed_jobs - 1, 0)
         WHERE user_id = $1",
    )
    .bind(booking.provider_id)
    .execute(&mut *conn)
    .await?;
    Ok(Some(PayoutReversal {
        ledger_entry_id: entry.id,
        amount_cents: payout.amount_cents,
        transfer_id: payout.external_ref,
    }))
}
