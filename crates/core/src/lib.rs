//! Pure domain logic for the ServiceMatch marketplace.
//!
//! Nothing in this crate performs I/O; the database, HTTP and integration
//! crates build on these types and rules.

pub mod categories;
pub mod diagnosis;
pub mod error;
pub mod fees;
pub mod messaging;
pub mod notifications;
pub mod pagination;
pub mod pricing;
pub mod review;
pub mod roles;
pub mod status;
pub mod types;
