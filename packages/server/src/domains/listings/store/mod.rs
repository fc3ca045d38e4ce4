//! Listing storage.
//!
//! One `ListingStore` instance per tier. Every operation is addressed by
//! `ListingKey`; there are no cross-store joins.
//!
//! Available backends:
//! - `PgListingStore` - one Postgres table per tier (production)
//! - `MemoryListingStore` - in-process map (tests, local development)

pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use super::filter::ListingFilter;
use super::models::{Listing, ListingDetails, ListingTier};
use super::sort::SortOrder;

pub use memory::MemoryListingStore;
pub use postgres::PgListingStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid pattern for {field}: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    fn tier(&self) -> ListingTier;

    /// Insert, or overwrite `details` and replace `media` wholesale.
    async fn upsert(&self, listing_key: &str, details: &ListingDetails, media: &[Value])
        -> Result<()>;

    async fn query(
        &self,
        filter: &ListingFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Listing>>;

    async fn count(&self, filter: &ListingFilter) -> Result<u64>;

    /// The subset of `listing_keys` stored here whose listing matches `filter`.
    async fn matching_keys(
        &self,
        filter: &ListingFilter,
        listing_keys: &[String],
    ) -> Result<HashSet<String>>;

    async fn find_by_key(&self, listing_key: &str) -> Result<Option<Listing>>;

    /// Shallow-merge `patch` into `details`. `None` when the key is absent.
    async fn merge_details(
        &self,
        listing_key: &str,
        patch: &Map<String, Value>,
    ) -> Result<Option<Listing>>;

    /// Cheap reachability check for health endpoints.
    async fn ping(&self) -> Result<()>;
}

/// The three tier stores, addressable by tier and iterable in precedence order.
#[derive(Clone)]
pub struct ListingStores {
    idx: Arc<dyn ListingStore>,
    vow: Arc<dyn ListingStore>,
    sold: Arc<dyn ListingStore>,
}

impl ListingStores {
    pub fn new(
        idx: Arc<dyn ListingStore>,
        vow: Arc<dyn ListingStore>,
        sold: Arc<dyn ListingStore>,
    ) -> Self {
        Self { idx, vow, sold }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::new(
            Arc::new(PgListingStore::new(pool.clone(), ListingTier::Idx)),
            Arc::new(PgListingStore::new(pool.clone(), ListingTier::Vow)),
            Arc::new(PgListingStore::new(pool, ListingTier::Sold)),
        )
    }

    pub fn memory() -> Self {
        Self::new(
            Arc::new(MemoryListingStore::new(ListingTier::Idx)),
            Arc::new(MemoryListingStore::new(ListingTier::Vow)),
            Arc::new(MemoryListingStore::new(ListingTier::Sold)),
        )
    }

    pub fn get(&self, tier: ListingTier) -> Arc<dyn ListingStore> {
        match tier {
            ListingTier::Idx => self.idx.clone(),
            ListingTier::Vow => self.vow.clone(),
            ListingTier::Sold => self.sold.clone(),
        }
    }

    /// Stores in `ListingTier::ALL` order.
    pub fn ordered(&self) -> Vec<Arc<dyn ListingStore>> {
        ListingTier::ALL.iter().map(|t| self.get(*t)).collect()
    }
}
