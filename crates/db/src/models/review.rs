//! Customer reviews of completed bookings.

use serde::{Deserialize, Serialize};
use servicematch_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `reviews` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: DbId,
    pub booking_id: DbId,
    pub customer_id: DbId,
    pub provider_id: DbId,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A review with the reviewer's display name, for provider pages.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewWithAuthor {
    pub id: DbId,
    pub booking_id: DbId,
    pub rating: i16,
    pub comment: Option<String>,
    pub customer_name: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub rating: i16,
    pub comment: Option<String>,
}
