//! Repository for the `provider_profiles` table.

use servicematch_core::pagination::{PageRequest, Paginated};
use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::models::profile::{ProviderProfile, ProviderSearch, ProviderSummary, UpsertProviderProfile};

const COLUMNS: &str = "id, user_id, business_name, bio, categories, postcode, region, \
                        service_radius_km, hourly_rate_cents, is_verified, rating_avg, \
                        rating_count, completed_jobs, stripe_account_id, payouts_enabled, \
                        created_at, updated_at";

const SUMMARY_COLUMNS: &str = "p.user_id, u.full_name, p.business_name, p.bio, p.categories, \
                                p.region, p.hourly_rate_cents, p.is_verified, p.rating_avg, \
                                p.rating_count, p.completed_jobs";

/// Directory filter shared by the list and count queries. Inactive accounts
/// are hidden.
const SEARCH_FILTER: &str = "u.is_active = true
               AND ($1::TEXT IS NULL OR $1 = ANY(p.categories))
               AND ($2::TEXT IS NULL OR p.region = $2)";

pub struct ProviderProfileRepo;

impl ProviderProfileRepo {
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<ProviderProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provider_profiles WHERE user_id = $1");
        sqlx::query_as::<_, ProviderProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the profile or replace its editable fields. Rating, job count
    /// and payout state are never touched here.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertProviderProfile,
    ) -> Result<ProviderProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO provider_profiles
                (user_id, business_name, bio, categories, postcode, region,
                 service_radius_km, hourly_rate_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT ON CONSTRAINT uq_provider_profiles_user_id DO UPDATE SET
                business_name = EXCLUDED.business_name,
                bio = EXCLUDED.bio,
                categories = EXCLUDED.categories,
                postcode = EXCLUDED.postcode,
                region = EXCLUDED.region,
                service_radius_km = EXCLUDED.service_radius_km,
                hourly_rate_cents = EXCLUDED.hourly_rate_cents
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProviderProfile>(&query)
            .bind(user_id)
            .bind(&input.business_name)
            .bind(&input.bio)
            .bind(&input.categories)
            .bind(&input.postcode)
            .bind(&input.region)
            .bind(input.service_radius_km)
            .bind(input.hourly_rate_cents)
            .fetch_one(pool)
            .await
    }

    /// Public profile of one provider.
    pub async fn find_summary(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<ProviderSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM provider_profiles p
             JOIN users u ON u.id = p.user_id
             WHERE p.user_id = $1 AND u.is_active = true"
        );
        sqlx::query_as::<_, ProviderSummary>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Search the provider directory, best rated first.
    pub async fn search(
        pool: &PgPool,
        filter: &ProviderSearch,
        page: PageRequest,
    ) -> Result<Paginated<ProviderSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM provider_profiles p
             JOIN users u ON u.id = p.user_id
             WHERE {SEARCH_FILTER}
             ORDER BY p.rating_avg DESC, p.rating_count DESC, p.user_id
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, ProviderSummary>(&query)
            .bind(&filter.category)
            .bind(&filter.region)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!(
            "SELECT COUNT(*) FROM provider_profiles p
             JOIN users u ON u.id = p.user_id
             WHERE {SEARCH_FILTER}"
        );
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&filter.category)
            .bind(&filter.region)
            .fetch_one(pool)
            .await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Attach a Stripe Connect account to the provider's profile.
    pub async fn set_stripe_account(
        pool: &PgPool,
        user_id: DbId,
        account_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE provider_profiles SET stripe_account_id = $2 WHERE user_id = $1")
                .bind(user_id)
                .bind(account_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record whether Stripe reports payouts as enabled for an account.
    pub async fn set_payouts_enabled(
        pool: &PgPool,
        account_id: &str,
        enabled: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE provider_profiles SET payouts_enabled = $2 WHERE stripe_account_id = $1",
        )
        .bind(account_id)
        .bind(enabled)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
