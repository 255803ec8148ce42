//! Customer and provider profile models.

use serde::{Deserialize, Serialize};
use servicematch_core::types::{Cents, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `customer_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerProfile {
    pub id: DbId,
    pub user_id: DbId,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Upsert payload for a customer profile. The postcode is already normalised.
#[derive(Debug, Deserialize)]
pub struct UpsertCustomerProfile {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
}

/// A row from the `provider_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProviderProfile {
    pub id: DbId,
    pub user_id: DbId,
    pub business_name: String,
    pub bio: Option<String>,
    pub categories: Vec<String>,
    pub postcode: String,
    pub region: String,
    pub service_radius_km: i32,
    pub hourly_rate_cents: Option<Cents>,
    pub is_verified: bool,
    #[serde(serialize_with = "crate::models::rating::serialize")]
    pub rating_avg: f64,
    pub rating_count: i32,
    pub completed_jobs: i32,
    #[serde(skip_serializing)]
    pub stripe_account_id: Option<String>,
    pub payouts_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Upsert payload for a provider profile. `region` is derived from the
/// postcode by the caller.
#[derive(Debug, Deserialize)]
pub struct UpsertProviderProfile {
    pub business_name: String,
    pub bio: Option<String>,
    pub categories: Vec<String>,
    pub postcode: String,
    pub region: String,
    pub service_radius_km: i32,
    pub hourly_rate_cents: Option<Cents>,
}

/// Public search result: profile fields joined with the owner's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProviderSummary {
    pub user_id: DbId,
    pub full_name: String,
    pub business_name: String,
    pub bio: Option<String>,
    pub categories: Vec<String>,
    pub region: String,
    pub hourly_rate_cents: Option<Cents>,
    pub is_verified: bool,
    #[serde(serialize_with = "crate::models::rating::serialize")]
    pub rating_avg: f64,
    pub rating_count: i32,
    pub completed_jobs: i32,
}

/// Filters for the provider directory.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderSearch {
    pub category: Option<String>,
    pub region: Option<String>,
}
