// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Paging, media fan-out and store writes live in the sync domain.
//
// Naming convention: Base* for trait names (e.g., BaseListingFeed)

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

// =============================================================================
// Listing Feed Trait (Infrastructure - upstream MLS reads)
// =============================================================================

#[async_trait]
pub trait BaseListingFeed: Send + Sync {
    /// Fetch one page of raw property records starting at `skip`.
    /// An empty page means the feed is exhausted.
    async fn fetch_listings(&self, skip: u64, top: u64) -> Result<Vec<Value>>;

    /// Fetch the media records attached to one listing.
    async fn fetch_media(&self, listing_key: &str) -> Result<Vec<Value>>;
}

// =============================================================================
// Listing Writer Trait (Infrastructure - upstream MLS writes)
// =============================================================================

#[async_trait]
pub trait BaseListingWriter: Send + Sync {
    /// Send a partial property update upstream.
    async fn forward_update(&self, listing_key: &str, patch: &Value) -> Result<()>;
}
