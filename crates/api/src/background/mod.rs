//! Background jobs.
//!
//! Each submodule exposes a long-running async `run` meant for
//! `tokio::spawn`, stopped through a [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod quote_expiry;
