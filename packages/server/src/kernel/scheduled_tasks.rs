//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The only recurring task is the upstream listing sync:
//!
//! ```text
//! Scheduler (SYNC_CRON, default every 12 hours)
//!     │
//!     └─► IngestionPipeline::run_once()
//!             └─► For each feed → page → media → upsert
//! ```
//!
//! A tick that lands while a run is still in progress is skipped.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::sync::{IngestionPipeline, SyncError};

/// Start all scheduled tasks
pub async fn start_scheduler(pipeline: Arc<IngestionPipeline>, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sync_job = Job::new_async(cron, move |_uuid, _lock| {
        let pipeline = pipeline.clone();
        Box::pin(async move {
            run_scheduled_sync(&pipeline).await;
        })
    })?;

    scheduler.add(sync_job).await?;
    scheduler.start().await?;

    tracing::info!(cron, "Scheduled tasks started (listing sync)");
    Ok(scheduler)
}

async fn run_scheduled_sync(pipeline: &IngestionPipeline) {
    tracing::info!("Running scheduled listing sync");

    match pipeline.run_once().await {
        Ok(run) if run.is_success() => {
            tracing::info!(upserted = run.total_upserted(), "Scheduled sync complete");
        }
        Ok(run) => {
            tracing::error!(
                upserted = run.total_upserted(),
                failed_feeds = run.failed_feeds().count(),
                "Scheduled sync finished with feed errors"
            );
        }
        Err(SyncError::AlreadyRunning) => {
            tracing::warn!("Previous sync still running, skipping this tick");
        }
    }
}
