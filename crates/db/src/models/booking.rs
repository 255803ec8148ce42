//! Bookings created from accepted quotes.

use chrono::NaiveDate;
use serde::Serialize;
use servicematch_core::error::CoreError;
use servicematch_core::fees::FeeSplit;
use servicematch_core::status::BookingStatus;
use servicematch_core::types::{Cents, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `bookings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: DbId,
    pub quote_id: DbId,
    pub quote_request_id: DbId,
    pub customer_id: DbId,
    pub provider_id: DbId,
    pub amount_cents: Cents,
    pub platform_fee_cents: Cents,
    pub provider_earnings_cents: Cents,
    pub fee_bps: i64,
    pub scheduled_for: Option<NaiveDate>,
    pub status: String,
    #[serde(skip_serializing)]
    pub stripe_checkout_session_id: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_payment_intent_id: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Booking {
    pub fn status(&self) -> Result<BookingStatus, CoreError> {
        BookingStatus::parse(&self.status)
    }

    /// Whether `user_id` is the customer or the provider on this booking.
    pub fn is_participant(&self, user_id: DbId) -> bool {
        self.customer_id == user_id || self.provider_id == user_id
    }

    /// The other side of the booking from `user_id`.
    pub fn counterpart_of(&self, user_id: DbId) -> DbId {
        if self.customer_id == user_id {
            self.provider_id
        } else {
            self.customer_id
        }
    }

    pub fn fee_split(&self) -> FeeSplit {
        FeeSplit {
            quote_amount: self.amount_cents,
            platform_fee: self.platform_fee_cents,
            provider_earnings: self.provider_earnings_cents,
            customer_total: self.amount_cents,
            fee_bps: self.fee_bps,
        }
    }
}

/// Result of accepting a quote.
#[derive(Debug, Clone)]
pub struct AcceptedQuote {
    pub booking: Booking,
    /// Providers whose competing quotes were declined.
    pub declined_provider_ids: Vec<DbId>,
}

/// Result of a booking transition that may move money.
#[derive(Debug, Clone)]
pub struct BookingTransition {
    pub booking: Booking,
    /// Ledger entry written by the transition (payout or refund), if any.
    pub ledger_entry_id: Option<DbId>,
    /// Amount refunded to the customer, if the transition refunded.
    pub refunded_cents: Option<Cents>,
    /// Payout clawed back from the provider, if one had been released.
    pub reversal: Option<PayoutReversal>,
}

/// A PAYOUT_REVERSAL ledger row written when a refund follows a payout.
#[derive(Debug, Clone)]
pub struct PayoutReversal {
    pub ledger_entry_id: DbId,
    pub amount_cents: Cents,
    /// Transfer recorded on the original PROVIDER_PAYOUT row. `None` when
    /// the payout was held and never reached Stripe.
    pub transfer_id: Option<String>,
}
