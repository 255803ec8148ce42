//! Repository for the `quotes` table.

use servicematch_core::fees::validate_quote_amount;
use servicematch_core::pagination::{PageRequest, Paginated};
use servicematch_core::status::{ensure_transition, QuoteRequestStatus, QuoteStatus};
use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoError;
use crate::models::quote::{CreateQuote, Quote, QuoteWithProvider};
use crate::models::quote_request::QuoteRequest;
use crate::repositories::quote_request_repo;

pub(crate) const COLUMNS: &str = "id, quote_request_id, provider_id, amount_cents, message, \
                                   estimated_hours, available_from, valid_until, status, \
                                   created_at, updated_at";

pub struct QuoteRepo;

impl QuoteRepo {
    /// Submit a quote against an open request.
    ///
    /// The request row is locked so a quote cannot land on a request that is
    /// being accepted or cancelled concurrently. A second quote from the same
    /// provider violates `uq_quotes_request_provider`.
    pub async fn create(
        pool: &PgPool,
        quote_request_id: DbId,
        provider_id: DbId,
        input: &CreateQuote,
    ) -> Result<(Quote, QuoteRequest), RepoError> {
        validate_quote_amount(input.amount_cents)?;
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {} FROM quote_requests WHERE id = $1 FOR UPDATE",
            quote_request_repo::COLUMNS
        );
        let request = sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(quote_request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::not_found("QuoteRequest", quote_request_id))?;

        if request.status()? != QuoteRequestStatus::Open {
            return Err(RepoError::conflict("This request is no longer accepting quotes"));
        }
        if request.customer_id == provider_id {
            return Err(RepoError::forbidden("You cannot quote on your own request"));
        }

        let query = format!(
            "INSERT INTO quotes
                (quote_request_id, provider_id, amount_cents, message, estimated_hours,
                 available_from, valid_until)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let quote = sqlx::query_as::<_, Quote>(&query)
            .bind(quote_request_id)
            .bind(provider_id)
            .bind(input.amount_cents)
            .bind(&input.message)
            .bind(input.estimated_hours)
            .bind(input.available_from)
            .bind(input.valid_until)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((quote, request))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Quote>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quotes WHERE id = $1");
        sqlx::query_as::<_, Quote>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All quotes on a request with provider details, cheapest first.
    pub async fn list_for_request(
        pool: &PgPool,
        quote_request_id: DbId,
    ) -> Result<Vec<QuoteWithProvider>, sqlx::Error> {
        sqlx::query_as::<_, QuoteWithProvider>(
            "SELECT q.id, q.quote_request_id, q.provider_id, q.amount_cents, q.message,
                    q.estimated_hours, q.available_from, q.valid_until, q.status, q.created_at,
                    u.full_name AS provider_name, p.business_name, p.rating_avg, p.rating_count
             FROM quotes q
             JOIN users u ON u.id = q.provider_id
             LEFT JOIN provider_profiles p ON p.user_id = q.provider_id
             WHERE q.quote_request_id = $1
             ORDER BY q.amount_cents ASC, q.id ASC",
        )
        .bind(quote_request_id)
        .fetch_all(pool)
        .await
    }

    /// The single quote a provider placed on a request, if any.
    pub async fn find_for_provider_on_request(
        pool: &PgPool,
        quote_request_id: DbId,
        provider_id: DbId,
    ) -> Result<Option<Quote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quotes WHERE quote_request_id = $1 AND provider_id = $2"
        );
        sqlx::query_as::<_, Quote>(&query)
            .bind(quote_request_id)
            .bind(provider_id)
            .fetch_optional(pool)
            .await
    }

    /// A provider's quotes, newest first.
    pub async fn list_for_provider(
        pool: &PgPool,
        provider_id: DbId,
        status: Option<QuoteStatus>,
        page: PageRequest,
    ) -> Result<Paginated<Quote>, sqlx::Error> {
        let status = status.map(|s| s.as_str());
        let query = format!(
            "SELECT {COLUMNS} FROM quotes
             WHERE provider_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Quote>(&query)
            .bind(provider_id)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quotes
             WHERE provider_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(provider_id)
        .bind(status)
        .fetch_one(pool)
        .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Withdraw a pending quote. Only its author may do so.
    pub async fn withdraw(pool: &PgPool, id: DbId, provider_id: DbId) -> Result<Quote, RepoError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM quotes WHERE id = $1 FOR UPDATE");
        let quote = sqlx::query_as::<_, Quote>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::not_found("Quote", id))?;

        if quote.provider_id != provider_id {
            return Err(RepoError::forbidden("Only the provider who sent this quote can withdraw it"));
        }
        ensure_transition(quote.status()?, QuoteStatus::Withdrawn)?;

        let query = format!("UPDATE quotes SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        let quote = sqlx::query_as::<_, Quote>(&query)
            .bind(id)
            .bind(QuoteStatus::Withdrawn.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(quote)
    }

    /// Move every pending quote whose `valid_until` has passed to EXPIRED.
    ///
    /// Returns the expired rows so callers can notify their providers.
    pub async fn expire_stale(pool: &PgPool) -> Result<Vec<Quote>, sqlx::Error> {
        let query = format!(
            "UPDATE quotes SET status = $1
             WHERE status = $2 AND valid_until < NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Quote>(&query)
            .bind(QuoteStatus::Expired.as_str())
            .bind(QuoteStatus::Pending.as_str())
            .fetch_all(pool)
            .await
    }
}
