//! Periodic expiry of stale quotes.
//!
//! Pending quotes whose `valid_until` has passed move to `EXPIRED`, and
//! their providers are told through the event bus.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use servicematch_db::repositories::{QuoteRepo, QuoteRequestRepo};
use servicematch_db::DbPool;
use servicematch_events::{types, EventBus, PlatformEvent};
use tokio_util::sync::CancellationToken;

/// Run one sweep. Returns how many quotes expired.
pub async fn sweep(pool: &DbPool, event_bus: &EventBus) -> Result<usize, sqlx::Error> {
    let expired = QuoteRepo::expire_stale(pool).await?;
    for quote in &expired {
        let title = QuoteRequestRepo::find_by_id(pool, quote.quote_request_id)
            .await?
            .map(|r| r.title);
        event_bus.publish(
            PlatformEvent::new(types::QUOTE_EXPIRED)
                .with_source(types::ENTITY_QUOTE, quote.id)
                .with_recipient(quote.provider_id)
                .with_payload(json!({
                    "quote_id": quote.id,
                    "quote_request_id": quote.quote_request_id,
                    "title": title,
                })),
        );
    }
    Ok(expired.len())
}

/// Sweep every `interval` until `cancel` fires.
pub async fn run(
    pool: DbPool,
    event_bus: Arc<EventBus>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Quote expiry job started");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Quote expiry job stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep(&pool, &event_bus).await {
                    Ok(0) => tracing::debug!("Quote expiry: nothing to expire"),
                    Ok(n) => tracing::info!(expired = n, "Quote expiry: expired stale quotes"),
                    Err(e) => tracing::error!(error = %e, "Quote expiry sweep failed"),
                }
            }
        }
    }
}
