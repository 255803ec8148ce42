//! Dispute cases opened against bookings.

use serde::Serialize;
use servicematch_core::error::CoreError;
use servicematch_core::status::DisputeStatus;
use servicematch_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::models::booking::Booking;

/// A row from the `disputes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dispute {
    pub id: DbId,
    pub booking_id: DbId,
    pub opened_by: DbId,
    pub reason: String,
    pub status: String,
    pub resolution_notes: Option<String>,
    pub resolved_by: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dispute {
    pub fn status(&self) -> Result<DisputeStatus, CoreError> {
        DisputeStatus::parse(&self.status)
    }
}

/// Outcome chosen by an admin when closing a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeOutcome {
    /// Refund the customer in full.
    Customer,
    /// Release funds to the provider.
    Provider,
}

impl DisputeOutcome {
    pub fn status(self) -> DisputeStatus {
        match self {
            Self::Customer => DisputeStatus::ResolvedCustomer,
            Self::Provider => DisputeStatus::ResolvedProvider,
        }
    }
}

/// A dispute together with the booking it changed.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeWithBooking {
    pub dispute: Dispute,
    pub booking: Booking,
}
