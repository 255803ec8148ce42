//! Event names, `"<entity>.<verb>"`.

pub const QUOTE_SUBMITTED: &str = "quote.submitted";
pub const QUOTE_ACCEPTED: &str = "quote.accepted";
pub const QUOTE_DECLINED: &str = "quote.declined";
pub const QUOTE_WITHDRAWN: &str = "quote.withdrawn";
pub const QUOTE_EXPIRED: &str = "quote.expired";

pub const BOOKING_PAID: &str = "booking.paid";
pub const BOOKING_STARTED: &str = "booking.started";
pub const BOOKING_COMPLETED: &str = "booking.completed";
pub const BOOKING_CANCELLED: &str = "booking.cancelled";

pub const REVIEW_CREATED: &str = "review.created";

pub const DISPUTE_OPENED: &str = "dispute.opened";
pub const DISPUTE_RESOLVED: &str = "dispute.resolved";

pub const MESSAGE_SENT: &str = "message.sent";

/// Source entity kinds used with [`PlatformEvent::with_source`](crate::PlatformEvent::with_source).
pub const ENTITY_QUOTE_REQUEST: &str = "quote_request";
pub const ENTITY_QUOTE: &str = "quote";
pub const ENTITY_BOOKING: &str = "booking";
pub const ENTITY_DISPUTE: &str = "dispute";

/// Every known event name.
pub const ALL: &[&str] = &[
    QUOTE_SUBMITTED,
    QUOTE_ACCEPTED,
    QUOTE_DECLINED,
    QUOTE_WITHDRAWN,
    QUOTE_EXPIRED,
    BOOKING_PAID,
    BOOKING_STARTED,
    BOOKING_COMPLETED,
    BOOKING_CANCELLED,
    REVIEW_CREATED,
    DISPUTE_OPENED,
    DISPUTE_RESOLVED,
    MESSAGE_SENT,
];
