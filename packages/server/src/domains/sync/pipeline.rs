//! Upstream → store ingestion.
//!
//! Feeds run one after another. Each feed pages through the upstream with a
//! `skip`/`top` cursor until a page comes back empty, fetches media for every
//! record on the page (bounded fan-out) and upserts into the feed's store.
//! A failed page or store write ends that feed; a failed media fetch drops
//! only that listing.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::report::{FeedReport, SyncRun};
use crate::domains::listings::{ListingDetails, ListingStore, ListingTier};
use crate::kernel::BaseListingFeed;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("a sync run is already in progress")]
    AlreadyRunning,
}

/// One upstream source bound to the store it fills.
#[derive(Clone)]
pub struct Feed {
    pub tier: ListingTier,
    pub source: Arc<dyn BaseListingFeed>,
    pub store: Arc<dyn ListingStore>,
    pub page_size: u64,
}

impl Feed {
    pub fn new(
        tier: ListingTier,
        source: Arc<dyn BaseListingFeed>,
        store: Arc<dyn ListingStore>,
        page_size: u64,
    ) -> Self {
        Self {
            tier,
            source,
            store,
            page_size: page_size.max(1),
        }
    }
}

pub struct IngestionPipeline {
    feeds: Vec<Feed>,
    media_concurrency: usize,
    running: Mutex<()>,
}

impl IngestionPipeline {
    pub fn new(feeds: Vec<Feed>, media_concurrency: usize) -> Self {
        Self {
            feeds,
            media_concurrency: media_concurrency.max(1),
            running: Mutex::new(()),
        }
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    /// Run every feed once. Returns `AlreadyRunning` without doing any work
    /// if another run holds the pipeline.
    pub async fn run_once(&self) -> Result<SyncRun, SyncError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;

        let started_at = Utc::now();
        info!(feeds = self.feeds.len(), "Listing sync started");

        let mut reports = Vec::with_capacity(self.feeds.len());
        for feed in &self.feeds {
            let mut report = FeedReport::new(feed.tier);
            if let Err(e) = self.sync_feed(feed, &mut report).await {
                warn!(tier = %feed.tier, error = %format!("{e:#}"), "Feed sync aborted");
                report.error = Some(format!("{e:#}"));
            }
            info!(
                tier = %feed.tier,
                pages = report.pages_fetched,
                upserted = report.upserted,
                skipped = report.skipped,
                media_failed = report.media_failed,
                "Feed sync finished"
            );
            reports.push(report);
        }

        let run = SyncRun {
            started_at,
            finished_at: Utc::now(),
            feeds: reports,
        };
        info!(
            upserted = run.total_upserted(),
            success = run.is_success(),
            "Listing sync finished"
        );
        Ok(run)
    }

    async fn sync_feed(&self, feed: &Feed, report: &mut FeedReport) -> Result<()> {
        let mut skip = 0u64;

        loop {
            let records = feed
                .source
                .fetch_listings(skip, feed.page_size)
                .await
                .with_context(|| format!("{} page fetch at skip={skip}", feed.tier))?;
            report.pages_fetched += 1;

            if records.is_empty() {
                debug!(tier = %feed.tier, skip, "Empty page, feed exhausted");
                return Ok(());
            }
            let fetched = records.len() as u64;
            debug!(tier = %feed.tier, skip, fetched, "Fetched page");

            let entries = keyed_records(records, report);
            let source = &feed.source;
            let with_media: Vec<_> = stream::iter(entries)
                .map(|(key, details)| async move {
                    let media = source.fetch_media(&key).await;
                    (key, details, media)
                })
                .buffered(self.media_concurrency)
                .collect()
                .await;

            for (key, details, media) in with_media {
                let media = match media {
                    Ok(media) => media,
                    Err(e) => {
                        warn!(tier = %feed.tier, listing_key = %key, error = %e, "Media fetch failed, skipping listing");
                        report.media_failed += 1;
                        continue;
                    }
                };
                feed.store
                    .upsert(&key, &details, &media)
                    .await
                    .with_context(|| format!("{} upsert of {key}", feed.tier))?;
                report.upserted += 1;
            }

            skip += fetched;
        }
    }
}

/// Pair each record with its `ListingKey`, counting records that have none.
fn keyed_records(records: Vec<Value>, report: &mut FeedReport) -> Vec<(String, ListingDetails)> {
    records
        .into_iter()
        .filter_map(|record| {
            let keyed = ListingDetails::from_value(record).and_then(|details| {
                let key = details.listing_key()?.trim().to_string();
                (!key.is_empty()).then_some((key, details))
            });
            if keyed.is_none() {
                report.skipped += 1;
            }
            keyed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::listings::MemoryListingStore;
    use crate::kernel::test_dependencies::{MockListingFeed, PageCall};
    use serde_json::json;

    fn pipeline_for(
        source: &MockListingFeed,
        store: &Arc<MemoryListingStore>,
        page_size: u64,
    ) -> IngestionPipeline {
        let feed = Feed::new(
            ListingTier::Idx,
            Arc::new(source.clone()),
            store.clone(),
            page_size,
        );
        IngestionPipeline::new(vec![feed], 4)
    }

    #[tokio::test]
    async fn pages_until_an_empty_page() {
        let source = MockListingFeed::new().with_page_sizes("L", &[100, 100, 37]);
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));

        let run = pipeline_for(&source, &store, 100).run_once().await.unwrap();

        let report = run.feed(ListingTier::Idx).unwrap();
        assert_eq!(report.upserted, 237);
        assert_eq!(report.pages_fetched, 4);
        assert_eq!(store.len().await, 237);
        assert_eq!(
            source.page_calls(),
            vec![
                PageCall { skip: 0, top: 100 },
                PageCall { skip: 100, top: 100 },
                PageCall { skip: 200, top: 100 },
                PageCall { skip: 237, top: 100 },
            ]
        );
    }

    #[tokio::test]
    async fn short_page_does_not_stop_paging() {
        let source = MockListingFeed::new().with_page_sizes("L", &[3, 10]);
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));

        let run = pipeline_for(&source, &store, 10).run_once().await.unwrap();

        assert_eq!(run.total_upserted(), 13);
        assert_eq!(source.page_calls().len(), 3);
    }

    #[tokio::test]
    async fn media_is_stored_with_the_listing() {
        let source = MockListingFeed::new()
            .with_page(vec![MockListingFeed::record("K1")])
            .with_media("K1", vec![json!({"MediaURL": "https://cdn/1.jpg"})]);
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));

        pipeline_for(&source, &store, 10).run_once().await.unwrap();

        let stored = store.find_by_key("K1").await.unwrap().unwrap();
        assert_eq!(stored.media, vec![json!({"MediaURL": "https://cdn/1.jpg"})]);
        assert_eq!(source.media_calls(), vec!["K1"]);
    }

    #[tokio::test]
    async fn media_failure_skips_only_that_listing() {
        let source = MockListingFeed::new()
            .with_page(vec![
                MockListingFeed::record("A"),
                MockListingFeed::record("B"),
                MockListingFeed::record("C"),
            ])
            .with_media_error("B");
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));

        let run = pipeline_for(&source, &store, 10).run_once().await.unwrap();

        let report = run.feed(ListingTier::Idx).unwrap();
        assert!(report.is_success());
        assert_eq!(report.upserted, 2);
        assert_eq!(report.media_failed, 1);
        assert!(store.find_by_key("B").await.unwrap().is_none());
        assert!(store.find_by_key("C").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn records_without_key_are_counted_as_skipped() {
        let source = MockListingFeed::new().with_page(vec![
            MockListingFeed::record("A"),
            json!({"ListPrice": 1}),
            json!({"ListingKey": 42}),
            json!("not an object"),
        ]);
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));

        let run = pipeline_for(&source, &store, 10).run_once().await.unwrap();

        let report = run.feed(ListingTier::Idx).unwrap();
        assert_eq!(report.upserted, 1);
        assert_eq!(report.skipped, 3);
    }

    #[tokio::test]
    async fn page_failure_aborts_feed_but_keeps_earlier_upserts() {
        let failing = MockListingFeed::new()
            .with_page_sizes("A", &[5])
            .with_page_error("upstream 503");
        let healthy = MockListingFeed::new().with_page_sizes("B", &[2]);
        let idx = Arc::new(MemoryListingStore::new(ListingTier::Idx));
        let vow = Arc::new(MemoryListingStore::new(ListingTier::Vow));

        let pipeline = IngestionPipeline::new(
            vec![
                Feed::new(ListingTier::Idx, Arc::new(failing.clone()), idx.clone(), 5),
                Feed::new(ListingTier::Vow, Arc::new(healthy), vow.clone(), 5),
            ],
            2,
        );
        let run = pipeline.run_once().await.unwrap();

        let idx_report = run.feed(ListingTier::Idx).unwrap();
        assert_eq!(idx_report.upserted, 5);
        assert!(idx_report.error.as_deref().unwrap().contains("upstream 503"));
        assert_eq!(failing.page_calls().len(), 2);
        assert_eq!(idx.len().await, 5);

        assert!(run.feed(ListingTier::Vow).unwrap().is_success());
        assert_eq!(vow.len().await, 2);
        assert!(!run.is_success());
        assert_eq!(run.failed_feeds().count(), 1);
    }

    #[tokio::test]
    async fn overlapping_run_is_rejected() {
        let source = MockListingFeed::new();
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));
        let pipeline = pipeline_for(&source, &store, 10);

        let _held = pipeline.running.try_lock().unwrap();
        assert_eq!(pipeline.run_once().await.unwrap_err(), SyncError::AlreadyRunning);
        assert!(source.page_calls().is_empty());
    }

    #[tokio::test]
    async fn rerun_overwrites_instead_of_duplicating() {
        let source = MockListingFeed::new()
            .with_page_sizes("L", &[4])
            .with_page(vec![])
            .with_page_sizes("L", &[4]);
        let store = Arc::new(MemoryListingStore::new(ListingTier::Idx));
        let pipeline = pipeline_for(&source, &store, 10);

        pipeline.run_once().await.unwrap();
        pipeline.run_once().await.unwrap();

        assert_eq!(store.len().await, 4);
    }
}
