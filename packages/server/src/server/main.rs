// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use listings_core::domains::auth::JwtService;
use listings_core::domains::listings::{ListingStores, ListingTier};
use listings_core::kernel::{ampre_pipeline, ampre_writer, start_scheduler, upstream_http_client};
use listings_core::server::{build_app, AppState};
use listings_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listings_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting listings API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
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

    let stores = ListingStores::postgres(pool);

    // Background sync
    let pipeline = Arc::new(
        ampre_pipeline(&config, &stores, &ListingTier::ALL)
            .context("Failed to build ingestion pipeline")?,
    );
    let _scheduler = start_scheduler(pipeline.clone(), &config.sync.cron)
        .await
        .context("Failed to start scheduler")?;
    if config.sync.on_startup {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.run_once().await {
                tracing::warn!(error = %e, "Startup sync skipped");
            }
        });
    }

    // Build application
    let http = upstream_http_client()?;
    let state = AppState::new(
        stores,
        Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())),
        Some(ampre_writer(&http, &config.upstream)),
    );
    let app = build_app(state, config.rate_limit)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
