//! Repository for the `reviews` table.

use servicematch_core::pagination::{PageRequest, Paginated};
use servicematch_core::review::{updated_average, validate_comment, validate_rating};
use servicematch_core::status::BookingStatus;
use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoError;
use crate::models::review::{CreateReview, Review, ReviewWithAuthor};
use crate::repositories::booking_repo;

const COLUMNS: &str =
    "id, booking_id, customer_id, provider_id, rating, comment, created_at, updated_at";

pub struct ReviewRepo;

impl ReviewRepo {
    /// Leave a review on a completed booking and fold the rating into the
    /// provider's running average, in one transaction.
    ///
    /// A second review for the same booking violates `uq_reviews_booking_id`.
    pub async fn create(
        pool: &PgPool,
        booking_id: DbId,
        customer_id: DbId,
        input: &CreateReview,
    ) -> Result<Review, RepoError> {
        validate_rating(input.rating)?;
        validate_comment(input.comment.as_deref())?;

        let mut tx = pool.begin().await?;
        let booking = booking_repo::lock(&mut tx, booking_id).await?;

        if booking.customer_id != customer_id {
            return Err(RepoError::forbidden("Only the customer on this booking can review it"));
        }
        if booking.status()? != BookingStatus::Completed {
            return Err(RepoError::conflict("Only completed bookings can be reviewed"));
        }

        let query = format!(
            "INSERT INTO reviews (booking_id, customer_id, provider_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(booking.id)
            .bind(customer_id)
            .bind(booking.provider_id)
            .bind(input.rating)
            .bind(&input.comment)
            .fetch_one(&mut *tx)
            .await?;

        let current: Option<(f64, i32)> = sqlx::query_as(
            "SELECT rating_avg, rating_count FROM provider_profiles WHERE user_id = $1 FOR UPDATE",
        )
        .bind(booking.provider_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((avg, count)) = current {
            let (avg, count) = updated_average(avg, count, input.rating);
            sqlx::query(
                "UPDATE provider_profiles SET rating_avg = $2, rating_count = $3 WHERE user_id = $1",
            )
            .bind(booking.provider_id)
            .bind(avg)
            .bind(count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(review)
    }

    pub async fn find_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE booking_id = $1");
        sqlx::query_as::<_, Review>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Reviews of a provider, newest first.
    pub async fn list_for_provider(
        pool: &PgPool,
        provider_id: DbId,
        page: PageRequest,
    ) -> Result<Paginated<ReviewWithAuthor>, sqlx::Error> {
        let items = sqlx::query_as::<_, ReviewWithAuthor>(
            "SELECT r.id, r.booking_id, r.rating, r.comment, u.full_name AS customer_name,
                    r.created_at
             FROM reviews r
             JOIN users u ON u.id = r.customer_id
             WHERE r.provider_id = $1
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(provider_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE provider_id = $1")
            .bind(provider_id)
            .fetch_one(pool)
            .await?;
        Ok(Paginated::new(items, total, page))
    }
}
