//! Multi-store read path.
//!
//! Runs one filter + sort against several stores, merges the results,
//! deduplicates by `ListingKey` and re-pages the merged set.
//!
//! Deduplication happens before the merge: each store contributes only
//! listings whose key no higher-precedence store holds under the same
//! filter. Every page is then a slice of one well-defined merged sequence.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;

use super::filter::ListingFilter;
use super::models::Listing;
use super::sort::SortOrder;
use super::store::{ListingStore, Result};
use crate::common::pagination::PageRequest;

/// Deepest merged position served. Pages starting at or beyond it are empty;
/// a page straddling it is cut short.
pub const MAX_AGGREGATE_WINDOW: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPage {
    pub listings: Vec<Listing>,
    /// Sum of each store's filtered count, taken before deduplication.
    pub total: u64,
}

/// Merges stores in precedence order: on a duplicate key the store listed
/// first wins.
#[derive(Clone)]
pub struct Aggregator {
    stores: Vec<Arc<dyn ListingStore>>,
}

impl Aggregator {
    pub fn new(stores: Vec<Arc<dyn ListingStore>>) -> Self {
        Self { stores }
    }

    pub async fn query(
        &self,
        filter: &ListingFilter,
        sort: SortOrder,
        page: &PageRequest,
    ) -> Result<AggregatedPage> {
        let counts = try_join_all(self.stores.iter().map(|store| store.count(filter))).await?;
        let total: u64 = counts.iter().sum();

        if page.start_index() >= MAX_AGGREGATE_WINDOW {
            tracing::debug!(
                start_index = page.start_index(),
                "Aggregated page beyond merge window"
            );
            return Ok(AggregatedPage {
                listings: Vec::new(),
                total,
            });
        }

        // Every store must supply its whole prefix up to the end of the
        // window, otherwise later pages lose records from the merge.
        let window_end = page.end_index().min(MAX_AGGREGATE_WINDOW);

        let per_store = try_join_all(
            (0..self.stores.len())
                .map(|position| self.unshadowed_prefix(position, filter, sort, window_end)),
        )
        .await?;

        let mut merged: Vec<Listing> = per_store.into_iter().flatten().collect();
        sort.sort(&mut merged);

        let listings = merged
            .into_iter()
            .skip(page.start_index() as usize)
            .take((window_end - page.start_index()) as usize)
            .collect();

        Ok(AggregatedPage { listings, total })
    }

    /// First `window_end` listings of the store at `position`, in sort order,
    /// skipping keys that an earlier store also matches.
    async fn unshadowed_prefix(
        &self,
        position: usize,
        filter: &ListingFilter,
        sort: SortOrder,
        window_end: u64,
    ) -> Result<Vec<Listing>> {
        let store = &self.stores[position];
        let earlier = &self.stores[..position];
        let mut kept: Vec<Listing> = Vec::new();
        let mut skip = 0;

        loop {
            let batch = store.query(filter, sort, skip, window_end).await?;
            let fetched = batch.len() as u64;
            skip += fetched;

            let shadowed = shadowed_keys(earlier, filter, &batch).await?;
            kept.extend(
                batch
                    .into_iter()
                    .filter(|l| !shadowed.contains(&l.listing_key)),
            );

            if fetched < window_end || kept.len() as u64 >= window_end {
                break;
            }
        }

        kept.truncate(window_end as usize);
        tracing::debug!(
            tier = %store.tier(),
            fetched = skip,
            kept = kept.len(),
            "Aggregator store query"
        );
        Ok(kept)
    }
}

/// Keys in `batch` that any of `earlier` holds under `filter`.
async fn shadowed_keys(
    earlier: &[Arc<dyn ListingStore>],
    filter: &ListingFilter,
    batch: &[Listing],
) -> Result<HashSet<String>> {
    if earlier.is_empty() || batch.is_empty() {
        return Ok(HashSet::new());
    }

    let keys: Vec<String> = batch.iter().map(|l| l.listing_key.clone()).collect();
    let found = try_join_all(earlier.iter().map(|store| store.matching_keys(filter, &keys))).await?;
    Ok(found.into_iter().flatten().collect())
}
