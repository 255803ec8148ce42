use std::sync::Arc;

use servicematch_integrations::{OpenAiClient, PaymentGateway};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: servicematch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<servicematch_events::EventBus>,
    /// Payment processor; `None` when Stripe is not configured.
    pub payments: Option<Arc<dyn PaymentGateway>>,
    /// LLM client; `None` when no API key is configured.
    pub openai: Option<OpenAiClient>,
}

impl AppState {
    /// The payment gateway, or 503 when payments are switched off.
    pub fn payments(&self) -> AppResult<&Arc<dyn PaymentGateway>> {
        self.payments.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Payments are not configured on this server".into())
        })
    }
}
