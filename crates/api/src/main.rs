use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servicematch_api::background::quote_expiry;
use servicematch_api::config::ServerConfig;
use servicematch_api::notifications::NotificationRouter;
use servicematch_api::router::build_app_router;
use servicematch_api::state::AppState;
use servicematch_api::ws;
use servicematch_integrations::{
    OpenAiClient, OpenAiConfig, PaymentGateway, StripeClient, StripeConfig,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "servicematch_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        fee_bps = config.platform_fee_bps,
        payments = config.stripe.is_some(),
        ai = config.openai.is_some(),
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = servicematch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    servicematch_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    servicematch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let (payments, openai) = build_integrations(&config);

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Event bus ---
    let event_bus = Arc::new(servicematch_events::EventBus::default());

    let notification_router = NotificationRouter::new(pool.clone(), Arc::clone(&ws_manager));
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let expiry_handle = tokio::spawn(quote_expiry::run(
        pool.clone(),
        Arc::clone(&event_bus),
        Duration::from_secs(config.quote_expiry_sweep_secs),
        cancel.clone(),
    ));
    tracing::info!("Event services started (notification router, quote expiry)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
        payments,
        openai,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), expiry_handle).await;

    // Dropping the last sender closes the channel and ends the router loop.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;

    ws_manager.shutdown_all().await;
    heartbeat_handle.abort();

    tracing::info!("Graceful shutdown complete");
}

/// Clients for the optional third-party services. Either may be absent, in
/// which case checkout answers 503 and the AI endpoints use static tables.
fn build_integrations(
    config: &ServerConfig,
) -> (Option<Arc<dyn PaymentGateway>>, Option<OpenAiClient>) {
    let payments = config.stripe.as_ref().map(|settings| {
        let mut stripe = StripeConfig::new(&settings.secret_key, &settings.currency);
        stripe.webhook_secret = settings.webhook_secret.clone();
        let client = StripeClient::new(stripe).expect("Failed to build Stripe client");
        tracing::info!(currency = %settings.currency, "Stripe payments enabled");
        Arc::new(client) as Arc<dyn PaymentGateway>
    });

    let openai = config.openai.as_ref().map(|settings| {
        tracing::info!(model = %settings.model, "OpenAI estimates enabled");
        OpenAiClient::new(OpenAiConfig::new(&settings.api_key, &settings.model))
            .expect("Failed to build OpenAI client")
    });

    (payments, openai)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
