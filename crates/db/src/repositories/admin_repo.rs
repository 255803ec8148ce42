//! Aggregate queries for the admin console and role dashboards.

use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::models::dashboard::{CustomerDashboard, PlatformStats, ProviderDashboard};

pub struct AdminRepo;

impl AdminRepo {
    /// Platform-wide counts and money totals.
    ///
    /// Gross volume counts bookings that were paid and not refunded or
    /// cancelled after payment.
    pub async fn platform_stats(pool: &PgPool) -> Result<PlatformStats, sqlx::Error> {
        sqlx::query_as::<_, PlatformStats>(
            "SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE role = 'CUSTOMER') AS total_customers,
                (SELECT COUNT(*) FROM users WHERE role = 'PROVIDER') AS total_providers,
                (SELECT COUNT(*) FROM quote_requests WHERE status = 'OPEN') AS open_quote_requests,
                (SELECT COUNT(*) FROM bookings
                  WHERE status IN ('PENDING_PAYMENT', 'PAID', 'IN_PROGRESS')) AS active_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'COMPLETED') AS completed_bookings,
                (SELECT COUNT(*) FROM disputes
                  WHERE status IN ('OPEN', 'UNDER_REVIEW')) AS open_disputes,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM bookings
                  WHERE status IN ('PAID', 'IN_PROGRESS', 'COMPLETED', 'DISPUTED'))
                  AS gross_volume_cents,
                (SELECT COALESCE(SUM(platform_fee_cents), 0)::BIGINT FROM bookings
                  WHERE status IN ('PAID', 'IN_PROGRESS', 'COMPLETED', 'DISPUTED'))
                  AS platform_revenue_cents",
        )
        .fetch_one(pool)
        .await
    }

    pub async fn customer_dashboard(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<CustomerDashboard, sqlx::Error> {
        sqlx::query_as::<_, CustomerDashboard>(
            "SELECT
                (SELECT COUNT(*) FROM quote_requests
                  WHERE customer_id = $1 AND status = 'OPEN') AS open_requests,
                (SELECT COUNT(*) FROM quotes q
                  JOIN quote_requests r ON r.id = q.quote_request_id
                  WHERE r.customer_id = $1 AND r.status = 'OPEN' AND q.status = 'PENDING')
                  AS quotes_awaiting_decision,
                (SELECT COUNT(*) FROM bookings
                  WHERE customer_id = $1 AND status IN ('PENDING_PAYMENT', 'PAID', 'IN_PROGRESS'))
                  AS upcoming_bookings,
                (SELECT COUNT(*) FROM bookings
                  WHERE customer_id = $1 AND status = 'COMPLETED') AS completed_bookings,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM bookings
                  WHERE customer_id = $1 AND status IN ('PAID', 'IN_PROGRESS', 'COMPLETED', 'DISPUTED'))
                  AS total_spent_cents,
                (SELECT COUNT(*) FROM notifications
                  WHERE user_id = $1 AND is_read = false) AS unread_notifications",
        )
        .bind(customer_id)
        .fetch_one(pool)
        .await
    }

    /// Provider dashboard. A provider without a profile gets zero rating
    /// and no matching requests.
    pub async fn provider_dashboard(
        pool: &PgPool,
        provider_id: DbId,
    ) -> Result<ProviderDashboard, sqlx::Error> {
        sqlx::query_as::<_, ProviderDashboard>(
            "SELECT
                (SELECT COUNT(*) FROM quote_requests r
                  WHERE r.status = 'OPEN'
                    AND r.category = ANY(COALESCE(
                        (SELECT categories FROM provider_profiles WHERE user_id = $1),
                        '{}'::TEXT[])))
                  AS matching_open_requests,
                (SELECT COUNT(*) FROM quotes
                  WHERE provider_id = $1 AND status = 'PENDING') AS pending_quotes,
                (SELECT COUNT(*) FROM bookings
                  WHERE provider_id = $1 AND status IN ('PENDING_PAYMENT', 'PAID', 'IN_PROGRESS'))
                  AS active_bookings,
                (SELECT COUNT(*) FROM bookings
                  WHERE provider_id = $1 AND status = 'COMPLETED') AS completed_bookings,
                (SELECT COALESCE(SUM(provider_earnings_cents), 0)::BIGINT FROM bookings
                  WHERE provider_id = $1 AND status = 'COMPLETED') AS total_earned_cents,
                COALESCE((SELECT rating_avg FROM provider_profiles WHERE user_id = $1), 0)
                  AS rating_avg,
                COALESCE((SELECT rating_count FROM provider_profiles WHERE user_id = $1), 0)
                  AS rating_count,
                (SELECT COUNT(*) FROM notifications
                  WHERE user_id = $1 AND is_read = false) AS unread_notifications",
        )
        .bind(provider_id)
        .fetch_one(pool)
        .await
    }
}
