//! Repository for the `quote_requests` table.

use servicematch_core::pagination::{PageRequest, Paginated};
use servicematch_core::status::{ensure_transition, QuoteRequestStatus, QuoteStatus};
use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoError;
use crate::models::quote_request::{CreateQuoteRequest, QuoteRequest};

pub(crate) const COLUMNS: &str = "id, customer_id, title, description, category, postcode, \
                                   region, budget_cents, preferred_date, status, \
                                   created_at, updated_at";

pub struct QuoteRequestRepo;

impl QuoteRequestRepo {
    pub async fn create(
        pool: &PgPool,
        customer_id: DbId,
        input: &CreateQuoteRequest,
    ) -> Result<QuoteRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO quote_requests
                (customer_id, title, description, category, postcode, region,
                 budget_cents, preferred_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(customer_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.postcode)
            .bind(&input.region)
            .bind(input.budget_cents)
            .bind(input.preferred_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QuoteRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quote_requests WHERE id = $1");
        sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A customer's own requests, newest first.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
        status: Option<QuoteRequestStatus>,
        page: PageRequest,
    ) -> Result<Paginated<QuoteRequest>, sqlx::Error> {
        let status = status.map(|s| s.as_str());
        let query = format!(
            "SELECT {COLUMNS} FROM quote_requests
             WHERE customer_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(customer_id)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quote_requests
             WHERE customer_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(customer_id)
        .bind(status)
        .fetch_one(pool)
        .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Open requests in any of the given categories, newest first. Used for
    /// the provider job board.
    pub async fn list_open_in_categories(
        pool: &PgPool,
        categories: &[String],
        region: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<QuoteRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quote_requests
             WHERE status = 'OPEN'
               AND category = ANY($1)
               AND ($2::TEXT IS NULL OR region = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(categories)
            .bind(region)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quote_requests
             WHERE status = 'OPEN'
               AND category = ANY($1)
               AND ($2::TEXT IS NULL OR region = $2)",
        )
        .bind(categories)
        .bind(region)
        .fetch_one(pool)
        .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Cancel an open request and decline every pending quote on it.
    ///
    /// Returns the cancelled request and the providers whose quotes were
    /// declined.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        customer_id: DbId,
    ) -> Result<(QuoteRequest, Vec<DbId>), RepoError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM quote_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::not_found("QuoteRequest", id))?;

        if request.customer_id != customer_id {
            return Err(RepoError::forbidden("Only the customer who posted this request can cancel it"));
        }
        ensure_transition(request.status()?, QuoteRequestStatus::Cancelled)?;

        let declined: Vec<DbId> = sqlx::query_scalar(
            "UPDATE quotes SET status = $2
             WHERE quote_request_id = $1 AND status = $3
             RETURNING provider_id",
        )
        .bind(id)
        .bind(QuoteStatus::Declined.as_str())
        .bind(QuoteStatus::Pending.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let query =
            format!("UPDATE quote_requests SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        let request = sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(id)
            .bind(QuoteRequestStatus::Cancelled.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((request, declined))
    }
}
