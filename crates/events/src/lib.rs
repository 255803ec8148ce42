//! ServiceMatch event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope, addressed to the users
//!   who should hear about it.
//! - [`types`]: the event names handlers publish.

pub mod bus;
pub mod types;

pub use bus::{EventBus, PlatformEvent};
