use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roundup_core::{
    load_config, validate_config, AggregatorSettings, Config, TicketAggregator, ZendeskApi,
    ZendeskClient,
};
use roundup_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ROUNDUP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    let aggregator = build_aggregator(&config)?;

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), aggregator));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Build the aggregation engine, or `None` when Zendesk is not configured.
fn build_aggregator(config: &Config) -> Result<Option<Arc<TicketAggregator>>> {
    let Some(zendesk) = &config.zendesk else {
        warn!("Zendesk not configured; ticket requests will be rejected");
        return Ok(None);
    };

    info!(
        "Initializing Zendesk client for {} (office field {})",
        zendesk.api_base_url(),
        zendesk.office_field_id
    );
    let client: Arc<dyn ZendeskApi> =
        Arc::new(ZendeskClient::new(zendesk).context("Failed to create Zendesk client")?);

    let settings = AggregatorSettings::from_config(zendesk, &config.aggregation)
        .context("Invalid aggregation settings")?;
    info!(
        "Aggregation settings: time zone {}, {} parallel searches, {} parallel lookups",
        settings.time_zone, settings.max_parallel_searches, settings.max_parallel_lookups
    );

    Ok(Some(Arc::new(TicketAggregator::new(client, settings))))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
