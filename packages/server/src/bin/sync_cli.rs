//! CLI for running the listing sync by hand
//!
//! Prints the run report as JSON and exits non-zero when any feed failed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listings_core::config::Config;
use listings_core::domains::listings::{ListingFilter, ListingStores, ListingTier};
use listings_core::kernel::ampre_pipeline;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sync_cli")]
#[command(about = "Upstream listing sync CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass
    Run {
        /// Limit the run to these tiers (repeatable). Defaults to all.
        #[arg(long = "tier")]
        tiers: Vec<ListingTier>,
    },

    /// Show stored listing counts per tier
    Status,
}

#[derive(Serialize)]
struct TierCount {
    tier: ListingTier,
    listings: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listings_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    let stores = ListingStores::postgres(pool);

    match cli.command {
        Commands::Run { tiers } => {
            let pipeline = ampre_pipeline(&config, &stores, &tiers)?;
            let run = pipeline.run_once().await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
            if !run.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Status => {
            let mut counts = Vec::new();
            for tier in ListingTier::ALL {
                let listings = stores.get(tier).count(&ListingFilter::all()).await?;
                counts.push(TierCount { tier, listings });
            }
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }

    Ok(())
}
