//! Upstream listing ingestion.

pub mod pipeline;
pub mod report;

pub use pipeline::{Feed, IngestionPipeline, SyncError};
pub use report::{FeedReport, SyncRun};
