use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domains::listings::ListingTier;

/// Outcome of one feed inside a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedReport {
    pub tier: ListingTier,
    /// Page fetches issued, including the terminating empty page.
    pub pages_fetched: u64,
    pub upserted: u64,
    /// Records dropped for lacking a usable `ListingKey`.
    pub skipped: u64,
    /// Listings dropped because their media fetch failed.
    pub media_failed: u64,
    /// Set when the feed stopped early.
    pub error: Option<String>,
}

impl FeedReport {
    pub fn new(tier: ListingTier) -> Self {
        Self {
            tier,
            pages_fetched: 0,
            upserted: 0,
            skipped: 0,
            media_failed: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub feeds: Vec<FeedReport>,
}

impl SyncRun {
    pub fn is_success(&self) -> bool {
        self.feeds.iter().all(FeedReport::is_success)
    }

    pub fn total_upserted(&self) -> u64 {
        self.feeds.iter().map(|f| f.upserted).sum()
    }

    pub fn failed_feeds(&self) -> impl Iterator<Item = &FeedReport> {
        self.feeds.iter().filter(|f| !f.is_success())
    }

    pub fn feed(&self, tier: ListingTier) -> Option<&FeedReport> {
        self.feeds.iter().find(|f| f.tier == tier)
    }
}
