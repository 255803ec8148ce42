//! Turning platform events into notifications.
//!
//! [`NotificationRouter`] subscribes to the event bus, stores one
//! notification row per recipient and pushes it over the WebSocket.
//! [`templates`] holds the event-to-text mapping.

pub mod router;
pub mod templates;

pub use router::NotificationRouter;
