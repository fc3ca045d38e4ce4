//! AMPRE adapters for the upstream traits, plus the feed wiring used by the
//! server and the sync CLI.

use std::sync::Arc;

use ampre_client::{AmpreClient, PropertyQuery};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{BaseListingFeed, BaseListingWriter};
use crate::config::{Config, SyncConfig, UpstreamConfig};
use crate::domains::listings::{ListingStores, ListingTier};
use crate::domains::sync::{Feed, IngestionPipeline};

/// Upstream filter applied to the Sold feed.
pub const SOLD_FEED_FILTER: &str = "MlsStatus eq 'Sold'";

// =============================================================================
// Feed Adapter
// =============================================================================

/// Reads one feed family. `filter` is forwarded as `$filter` on every page.
pub struct AmpreListingFeed {
    client: AmpreClient,
    filter: Option<String>,
}

impl AmpreListingFeed {
    pub fn new(client: AmpreClient, filter: Option<String>) -> Self {
        Self { client, filter }
    }
}

#[async_trait]
impl BaseListingFeed for AmpreListingFeed {
    async fn fetch_listings(&self, skip: u64, top: u64) -> Result<Vec<Value>> {
        let query = PropertyQuery::page(skip, top).with_filter(self.filter.clone());
        self.client
            .fetch_properties(&query)
            .await
            .with_context(|| format!("Property page at skip={skip} failed"))
    }

    async fn fetch_media(&self, listing_key: &str) -> Result<Vec<Value>> {
        self.client
            .fetch_media(listing_key)
            .await
            .with_context(|| format!("Media fetch for {listing_key} failed"))
    }
}

// =============================================================================
// Writer Adapter
// =============================================================================

pub struct AmpreListingWriter(pub AmpreClient);

#[async_trait]
impl BaseListingWriter for AmpreListingWriter {
    async fn forward_update(&self, listing_key: &str, patch: &Value) -> Result<()> {
        let outcome = self
            .0
            .patch_property(listing_key, patch)
            .await
            .with_context(|| format!("Upstream update for {listing_key} failed"))?;
        tracing::debug!(listing_key, status = outcome.status, "Forwarded listing update");
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// One feed per tier: IDX on the IDX credential, VOW and Sold on the VOW
/// credential, Sold narrowed upstream to sold records.
pub fn ampre_feeds(
    http: &reqwest::Client,
    upstream: &UpstreamConfig,
    sync: &SyncConfig,
    stores: &ListingStores,
) -> Vec<Feed> {
    let client = |token: &str| AmpreClient::with_client(http.clone(), &upstream.base_url, token);

    let sources: [(ListingTier, Arc<dyn BaseListingFeed>); 3] = [
        (
            ListingTier::Idx,
            Arc::new(AmpreListingFeed::new(client(&upstream.idx_token), None)),
        ),
        (
            ListingTier::Vow,
            Arc::new(AmpreListingFeed::new(client(&upstream.vow_token), None)),
        ),
        (
            ListingTier::Sold,
            Arc::new(AmpreListingFeed::new(
                client(&upstream.vow_token),
                Some(SOLD_FEED_FILTER.to_string()),
            )),
        ),
    ];

    sources
        .into_iter()
        .map(|(tier, source)| Feed::new(tier, source, stores.get(tier), sync.page_size))
        .collect()
}

pub fn ampre_writer(http: &reqwest::Client, upstream: &UpstreamConfig) -> Arc<dyn BaseListingWriter> {
    Arc::new(AmpreListingWriter(AmpreClient::with_client(
        http.clone(),
        &upstream.write_base_url,
        &upstream.write_token,
    )))
}

/// Shared HTTP client for every upstream adapter.
pub fn upstream_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .context("Failed to build upstream HTTP client")
}

/// Pipeline over every AMPRE feed, optionally narrowed to `tiers`.
pub fn ampre_pipeline(
    config: &Config,
    stores: &ListingStores,
    tiers: &[ListingTier],
) -> Result<IngestionPipeline> {
    let http = upstream_http_client()?;
    let feeds = ampre_feeds(&http, &config.upstream, &config.sync, stores)
        .into_iter()
        .filter(|feed| tiers.is_empty() || tiers.contains(&feed.tier))
        .collect();
    Ok(IngestionPipeline::new(feeds, config.sync.media_concurrency))
}
