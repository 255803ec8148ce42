//! Best-effort product analytics.

use servicematch_core::types::DbId;
use sqlx::PgPool;

pub struct AnalyticsRepo;

impl AnalyticsRepo {
    /// Record an analytics event. Failures are logged and swallowed.
    pub async fn record(
        pool: &PgPool,
        user_id: Option<DbId>,
        name: &str,
        properties: serde_json::Value,
    ) {
        let result = sqlx::query(
            "INSERT INTO analytics_events (user_id, name, properties) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(name)
        .bind(&properties)
        .execute(pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, event = name, "Failed to record analytics event");
        }
    }
}
