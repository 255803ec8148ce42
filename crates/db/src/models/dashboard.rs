//! Aggregates for dashboards and the admin console.

use serde::Serialize;
use servicematch_core::types::Cents;
use sqlx::FromRow;

/// Platform-wide totals for the admin console.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_customers: i64,
    pub total_providers: i64,
    pub open_quote_requests: i64,
    pub active_bookings: i64,
    pub completed_bookings: i64,
    pub open_disputes: i64,
    /// Sum of bookings that have been paid and not refunded.
    pub gross_volume_cents: Cents,
    /// Platform fee earned on those bookings.
    pub platform_revenue_cents: Cents,
}

/// Summary counts for a customer's dashboard.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct CustomerDashboard {
    pub open_requests: i64,
    pub quotes_awaiting_decision: i64,
    pub upcoming_bookings: i64,
    pub completed_bookings: i64,
    pub total_spent_cents: Cents,
    pub unread_notifications: i64,
}

/// Summary counts for a provider's dashboard.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct ProviderDashboard {
    pub matching_open_requests: i64,
    pub pending_quotes: i64,
    pub active_bookings: i64,
    pub completed_bookings: i64,
    /// Earnings on completed bookings, after the platform fee.
    pub total_earned_cents: Cents,
    #[serde(serialize_with = "crate::models::rating::serialize")]
    pub rating_avg: f64,
    pub rating_count: i32,
    pub unread_notifications: i64,
}
