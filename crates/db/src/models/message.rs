//! Booking message threads.

use serde::Serialize;
use servicematch_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `messages` table.
///
/// `client_id` is generated by the sender so that retries and optimistic
/// UI entries can be reconciled with the stored row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub booking_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    pub client_id: String,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
