// Mock upstream implementations for testing
//
// Scripted pages and media, with every call recorded so tests can assert
// exactly what the pipeline asked for.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BaseListingFeed, BaseListingWriter};

// =============================================================================
// Mock Listing Feed
// =============================================================================

/// Arguments captured from a page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCall {
    pub skip: u64,
    pub top: u64,
}

/// Serves scripted pages in call order. Once the script runs out every
/// further page is empty.
#[derive(Clone, Default)]
pub struct MockListingFeed {
    pages: Arc<Mutex<Vec<Result<Vec<Value>, String>>>>,
    media: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    failing_media: Arc<Mutex<HashSet<String>>>,
    page_calls: Arc<Mutex<Vec<PageCall>>>,
    media_calls: Arc<Mutex<Vec<String>>>,
    page_delay: Option<Duration>,
}

impl MockListingFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimal upstream property record.
    pub fn record(listing_key: &str) -> Value {
        json!({ "ListingKey": listing_key, "ListPrice": 500000 })
    }

    pub fn with_page(self, records: Vec<Value>) -> Self {
        self.pages.lock().unwrap().push(Ok(records));
        self
    }

    /// Queue pages of generated records, keys `{prefix}-{n}` counting across pages.
    pub fn with_page_sizes(self, prefix: &str, sizes: &[usize]) -> Self {
        let mut n = 0;
        for size in sizes {
            let records = (0..*size)
                .map(|_| {
                    n += 1;
                    Self::record(&format!("{prefix}-{n}"))
                })
                .collect();
            self.pages.lock().unwrap().push(Ok(records));
        }
        self
    }

    /// Queue a page fetch that fails.
    pub fn with_page_error(self, message: &str) -> Self {
        self.pages.lock().unwrap().push(Err(message.to_string()));
        self
    }

    pub fn with_media(self, listing_key: &str, media: Vec<Value>) -> Self {
        self.media
            .lock()
            .unwrap()
            .insert(listing_key.to_string(), media);
        self
    }

    pub fn with_media_error(self, listing_key: &str) -> Self {
        self.failing_media
            .lock()
            .unwrap()
            .insert(listing_key.to_string());
        self
    }

    /// Sleep before answering each page fetch.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    /// Get all page fetches in call order
    pub fn page_calls(&self) -> Vec<PageCall> {
        self.page_calls.lock().unwrap().clone()
    }

    /// Get all listing keys media was requested for
    pub fn media_calls(&self) -> Vec<String> {
        self.media_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseListingFeed for MockListingFeed {
    async fn fetch_listings(&self, skip: u64, top: u64) -> Result<Vec<Value>> {
        self.page_calls.lock().unwrap().push(PageCall { skip, top });
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }

        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            return Ok(Vec::new());
        }
        pages.remove(0).map_err(|message| anyhow!(message))
    }

    async fn fetch_media(&self, listing_key: &str) -> Result<Vec<Value>> {
        self.media_calls
            .lock()
            .unwrap()
            .push(listing_key.to_string());

        if self.failing_media.lock().unwrap().contains(listing_key) {
            return Err(anyhow!("mock media failure for {listing_key}"));
        }
        Ok(self
            .media
            .lock()
            .unwrap()
            .get(listing_key)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// Mock Listing Writer
// =============================================================================

#[derive(Clone, Default)]
pub struct MockListingWriter {
    updates: Arc<Mutex<Vec<(String, Value)>>>,
    fail: bool,
}

impl MockListingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer whose every forward fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Get all forwarded updates as (listing key, body) pairs
    pub fn updates(&self) -> Vec<(String, Value)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseListingWriter for MockListingWriter {
    async fn forward_update(&self, listing_key: &str, patch: &Value) -> Result<()> {
        self.updates
            .lock()
            .unwrap()
            .push((listing_key.to_string(), patch.clone()));

        if self.fail {
            return Err(anyhow!("mock upstream rejected update"));
        }
        Ok(())
    }
}
