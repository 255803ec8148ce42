//! Lifecycle status enums for marketplace entities.
//!
//! Statuses are stored as upper-case TEXT columns guarded by CHECK
//! constraints. Each enum knows its database string, its badge label, and the
//! set of statuses it may move to. Repositories call [`ensure_transition`]
//! before writing a new status so illegal moves surface as 409 Conflict.

use crate::error::CoreError;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($db:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $db)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// The value stored in the database.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $db ),+
                }
            }

            /// Human-readable badge text.
            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Parse a database value. Unknown values are a validation error.
            pub fn parse(value: &str) -> Result<Self, CoreError> {
                match value {
                    $( $db => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {} '{}'. Valid values: {}",
                        stringify!($name),
                        other,
                        [$( $db ),+].join(", ")
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle of a customer's job post.
    QuoteRequestStatus {
        Open => ("OPEN", "Open"),
        Accepted => ("ACCEPTED", "Quote accepted"),
        Closed => ("CLOSED", "Closed"),
        Cancelled => ("CANCELLED", "Cancelled"),
    }
}

define_status_enum! {
    /// Lifecycle of a provider's priced response.
    QuoteStatus {
        Pending => ("PENDING", "Awaiting response"),
        Accepted => ("ACCEPTED", "Accepted"),
        Declined => ("DECLINED", "Declined"),
        Withdrawn => ("WITHDRAWN", "Withdrawn"),
        Expired => ("EXPIRED", "Expired"),
    }
}

define_status_enum! {
    /// Lifecycle of a booking created from an accepted quote.
    BookingStatus {
        PendingPayment => ("PENDING_PAYMENT", "Awaiting payment"),
        Paid => ("PAID", "Paid"),
        InProgress => ("IN_PROGRESS", "In progress"),
        Completed => ("COMPLETED", "Completed"),
        Cancelled => ("CANCELLED", "Cancelled"),
        Disputed => ("DISPUTED", "In dispute"),
        Refunded => ("REFUNDED", "Refunded"),
    }
}

define_status_enum! {
    /// Lifecycle of a dispute case.
    DisputeStatus {
        Open => ("OPEN", "Open"),
        UnderReview => ("UNDER_REVIEW", "Under review"),
        ResolvedCustomer => ("RESOLVED_CUSTOMER", "Resolved for customer"),
        ResolvedProvider => ("RESOLVED_PROVIDER", "Resolved for provider"),
    }
}

define_status_enum! {
    /// Kind of financial line recorded against a booking.
    LedgerEntryKind {
        CustomerCharge => ("CUSTOMER_CHARGE", "Customer charge"),
        PlatformFee => ("PLATFORM_FEE", "Platform fee"),
        ProviderEarning => ("PROVIDER_EARNING", "Provider earning"),
        ProviderPayout => ("PROVIDER_PAYOUT", "Provider payout"),
        Refund => ("REFUND", "Refund"),
        PayoutReversal => ("PAYOUT_REVERSAL", "Payout reversal"),
    }
}

// ---------------------------------------------------------------------------
// Transition graphs
// ---------------------------------------------------------------------------

/// An entity status with a fixed transition graph.
pub trait Lifecycle: Copy + Eq + std::fmt::Display {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Whether moving from `self` to `next` is allowed.
    fn can_transition_to(self, next: Self) -> bool;

    /// Whether no further transitions are possible.
    fn is_terminal(self) -> bool;
}

impl Lifecycle for QuoteRequestStatus {
    const ENTITY: &'static str = "Quote request";

    fn can_transition_to(self, next: Self) -> bool {
        use QuoteRequestStatus::*;
        matches!(
            (self, next),
            (Open, Accepted) | (Open, Closed) | (Open, Cancelled)
        )
    }

    fn is_terminal(self) -> bool {
        !matches!(self, QuoteRequestStatus::Open)
    }
}

impl Lifecycle for QuoteStatus {
    const ENTITY: &'static str = "Quote";

    fn can_transition_to(self, next: Self) -> bool {
        use QuoteStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Declined) | (Pending, Withdrawn) | (Pending, Expired)
        )
    }

    fn is_terminal(self) -> bool {
        !matches!(self, QuoteStatus::Pending)
    }
}

impl Lifecycle for BookingStatus {
    const ENTITY: &'static str = "Booking";

    fn can_transition_to(self, next: Self) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Paid)
                | (PendingPayment, Cancelled)
                | (Paid, InProgress)
                | (Paid, Completed)
                | (Paid, Cancelled)
                | (Paid, Disputed)
                | (InProgress, Completed)
                | (InProgress, Disputed)
                | (Completed, Disputed)
                | (Disputed, Completed)
                | (Disputed, Refunded)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }
}

impl Lifecycle for DisputeStatus {
    const ENTITY: &'static str = "Dispute";

    fn can_transition_to(self, next: Self) -> bool {
        use DisputeStatus::*;
        matches!(
            (self, next),
            (Open, UnderReview)
                | (Open, ResolvedCustomer)
                | (Open, ResolvedProvider)
                | (UnderReview, ResolvedCustomer)
                | (UnderReview, ResolvedProvider)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            DisputeStatus::ResolvedCustomer | DisputeStatus::ResolvedProvider
        )
    }
}

/// Reject an illegal status move with a 409-mapped error.
pub fn ensure_transition<S: Lifecycle>(from: S, to: S) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "{} cannot move from {from} to {to}",
            S::ENTITY
        )))
    }
}

impl BookingStatus {
    /// Statuses in which either party may open a dispute.
    pub fn is_disputable(self) -> bool {
        self.can_transition_to(BookingStatus::Disputed)
    }

    /// Whether the customer has been charged and not yet refunded.
    pub fn holds_customer_funds(self) -> bool {
        matches!(
            self,
            BookingStatus::Paid
                | BookingStatus::InProgress
                | BookingStatus::Completed
                | BookingStatus::Disputed
        )
    }
}
