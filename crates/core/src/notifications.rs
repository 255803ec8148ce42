//! Notification kinds shown in the bell menu.
//!
//! Stored verbatim in `notifications.kind`.

pub const KIND_NEW_QUOTE: &str = "new_quote";
pub const KIND_QUOTE_ACCEPTED: &str = "quote_accepted";
pub const KIND_QUOTE_DECLINED: &str = "quote_declined";
pub const KIND_BOOKING_PAID: &str = "booking_paid";
pub const KIND_BOOKING_STARTED: &str = "booking_started";
pub const KIND_BOOKING_COMPLETED: &str = "booking_completed";
pub const KIND_BOOKING_CANCELLED: &str = "booking_cancelled";
pub const KIND_NEW_REVIEW: &str = "new_review";
pub const KIND_DISPUTE_OPENED: &str = "dispute_opened";
pub const KIND_DISPUTE_RESOLVED: &str = "dispute_resolved";
pub const KIND_NEW_MESSAGE: &str = "new_message";
pub const KIND_QUOTE_WITHDRAWN: &str = "quote_withdrawn";
pub const KIND_QUOTE_EXPIRED: &str = "quote_expired";
