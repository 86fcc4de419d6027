// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::kernel::{
    event_pipeline, start_publish_worker, AdyenOptions, AdyenProcessor, BasePaymentProcessor,
    NatsConnector, PgOrganizationStore, ServerDeps, StripeOptions, StripeProcessor,
};
use server_core::server::{auth::JwtService, build_app};
use server_core::{Config, ProcessorConfig};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Organizations API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let processor: Arc<dyn BasePaymentProcessor> = match &config.processor {
        ProcessorConfig::Stripe { api_key } => {
            Arc::new(StripeProcessor::new(StripeOptions::new(api_key.clone()))?)
        }
        ProcessorConfig::Adyen {
            api_key,
            environment,
        } => Arc::new(AdyenProcessor::new(AdyenOptions::new(
            api_key.clone(),
            *environment,
        ))?),
    };
    tracing::info!(processor = processor.name(), "Payment processor ready");

    // Event pipeline: handlers publish into the queue, the worker drains it to NATS
    let (publisher, queue) = event_pipeline(config.publish_queue);
    let shutdown = CancellationToken::new();
    let worker = start_publish_worker(
        &NatsConnector::new(config.nats_url.clone()),
        queue,
        shutdown.clone(),
    )
    .await
    .context("Failed to start event publish worker")?;
    tracing::info!(url = %config.nats_url, "Event publish worker started");

    let deps = ServerDeps::new(
        Arc::new(PgOrganizationStore::new(pool)),
        processor,
        publisher,
    )
    .with_creation_timeout(config.creation_timeout);

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let app = build_app(deps, jwt_service);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped, shutting down publish worker");
    match worker.stop().await {
        Ok(exit) => tracing::info!(?exit, "Publish worker stopped"),
        Err(e) => tracing::error!(error = %e, "Publish worker failed"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
