//! Notification text for each event type.

use serde_json::Value;
use servicematch_core::fees::format_gbp;
use servicematch_core::notifications::*;
use servicematch_events::types;
use servicematch_events::PlatformEvent;

/// What a recipient sees in the bell menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub kind: &'static str,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn id_field(payload: &Value, key: &str) -> Option<i64> {
    payload.get(key).and_then(Value::as_i64)
}

fn money_field(payload: &Value, key: &str) -> Option<String> {
    id_field(payload, key).map(format_gbp)
}

fn booking_link(payload: &Value) -> Option<String> {
    id_field(payload, "booking_id").map(|id| format!("/bookings/{id}"))
}

fn request_link(payload: &Value) -> Option<String> {
    id_field(payload, "quote_request_id").map(|id| format!("/quote-requests/{id}"))
}

/// Render the notification for an event, or `None` for events that do not
/// notify anyone.
pub fn render(event: &PlatformEvent) -> Option<NotificationTemplate> {
    let p = &event.payload;
    let job = str_field(p, "title").unwrap_or("your job");

    let (kind, title, body, link) = match event.event_type.as_str() {
        types::QUOTE_SUBMITTED => (
            KIND_NEW_QUOTE,
            "New quote received".to_string(),
            match money_field(p, "amount_cents") {
                Some(amount) => format!("A provider quoted {amount} for \"{job}\"."),
                None => format!("A provider sent a quote for \"{job}\"."),
            },
            request_link(p),
        ),
        types::QUOTE_ACCEPTED => (
            KIND_QUOTE_ACCEPTED,
            "Quote accepted".to_string(),
            format!("Your quote for \"{job}\" was accepted. The customer will pay next."),
            booking_link(p),
        ),
        types::QUOTE_DECLINED => (
            KIND_QUOTE_DECLINED,
            "Quote not selected".to_string(),
            format!("The customer chose another provider for \"{job}\"."),
            None,
        ),
        types::QUOTE_WITHDRAWN => (
            KIND_QUOTE_WITHDRAWN,
            "Quote withdrawn".to_string(),
            format!("A provider withdrew their quote for \"{job}\"."),
            request_link(p),
        ),
        types::QUOTE_EXPIRED => (
            KIND_QUOTE_EXPIRED,
            "Quote expired".to_string(),
            format!("Your quote for \"{job}\" expired before the customer decided."),
            None,
        ),
        types::BOOKING_PAID => (
            KIND_BOOKING_PAID,
            "Booking paid".to_string(),
            match money_field(p, "amount_cents") {
                Some(amount) => format!("Payment of {amount} received for \"{job}\"."),
                None => format!("Payment received for \"{job}\"."),
            },
            booking_link(p),
        ),
        types::BOOKING_STARTED => (
            KIND_BOOKING_STARTED,
            "Work started".to_string(),
            format!("Your provider has started work on \"{job}\"."),
            booking_link(p),
        ),
        types::BOOKING_COMPLETED => (
            KIND_BOOKING_COMPLETED,
            "Job completed".to_string(),
            format!("\"{job}\" has been marked complete."),
            booking_link(p),
        ),
        types::BOOKING_CANCELLED => (
            KIND_BOOKING_CANCELLED,
            "Booking cancelled".to_string(),
            match money_field(p, "refunded_cents") {
                Some(amount) => format!("\"{job}\" was cancelled and {amount} refunded."),
                None => format!("\"{job}\" was cancelled."),
            },
            booking_link(p),
        ),
        types::REVIEW_CREATED => (
            KIND_NEW_REVIEW,
            "New review".to_string(),
            match id_field(p, "rating") {
                Some(rating) => format!("You received a {rating}-star review for \"{job}\"."),
                None => format!("You received a review for \"{job}\"."),
            },
            booking_link(p),
        ),
        types::DISPUTE_OPENED => (
            KIND_DISPUTE_OPENED,
            "Dispute opened".to_string(),
            format!("A dispute was opened on \"{job}\". Our team will review it."),
            booking_link(p),
        ),
        types::DISPUTE_RESOLVED => (
            KIND_DISPUTE_RESOLVED,
            "Dispute resolved".to_string(),
            match str_field(p, "outcome") {
                Some("customer") => format!("The dispute on \"{job}\" was resolved with a refund."),
                Some("provider") => {
                    format!("The dispute on \"{job}\" was resolved in the provider's favour.")
                }
                _ => format!("The dispute on \"{job}\" was resolved."),
            },
            booking_link(p),
        ),
        types::MESSAGE_SENT => (
            KIND_NEW_MESSAGE,
            "New message".to_string(),
            preview(str_field(p, "body").unwrap_or_default()),
            booking_link(p),
        ),
        _ => return None,
    };

    Some(NotificationTemplate {
        kind,
        title,
        body,
        link,
    })
}

const PREVIEW_CHARS: usize = 120;

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}
