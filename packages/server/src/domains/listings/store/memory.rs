//! In-memory listing store for testing and development.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{ListingStore, Result, StoreError};
use crate::domains::listings::filter::{Condition, ListingFilter};
use crate::domains::listings::models::{Listing, ListingDetails, ListingTier};
use crate::domains::listings::sort::SortOrder;

/// Keyed map of listings with the same predicate semantics as the Postgres store.
///
/// Data is lost on restart.
pub struct MemoryListingStore {
    tier: ListingTier,
    listings: RwLock<HashMap<String, Listing>>,
}

impl MemoryListingStore {
    pub fn new(tier: ListingTier) -> Self {
        Self {
            tier,
            listings: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.listings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.listings.read().await.is_empty()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    fn tier(&self) -> ListingTier {
        self.tier
    }

    async fn upsert(
        &self,
        listing_key: &str,
        details: &ListingDetails,
        media: &[Value],
    ) -> Result<()> {
        let listing = Listing::new(listing_key, details.clone(), media.to_vec());
        self.listings
            .write()
            .await
            .insert(listing_key.to_string(), listing);
        Ok(())
    }

    async fn query(
        &self,
        filter: &ListingFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Listing>> {
        let compiled = compile(filter)?;
        let mut matched: Vec<Listing> = self
            .listings
            .read()
            .await
            .values()
            .filter(|l| matches_all(&compiled, &l.details))
            .cloned()
            .collect();

        sort.sort(&mut matched);

        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, filter: &ListingFilter) -> Result<u64> {
        let compiled = compile(filter)?;
        let count = self
            .listings
            .read()
            .await
            .values()
            .filter(|l| matches_all(&compiled, &l.details))
            .count();
        Ok(count as u64)
    }

    async fn matching_keys(
        &self,
        filter: &ListingFilter,
        listing_keys: &[String],
    ) -> Result<HashSet<String>> {
        let compiled = compile(filter)?;
        let listings = self.listings.read().await;
        Ok(listing_keys
            .iter()
            .filter(|key| {
                listings
                    .get(key.as_str())
                    .is_some_and(|l| matches_all(&compiled, &l.details))
            })
            .cloned()
            .collect())
    }

    async fn find_by_key(&self, listing_key: &str) -> Result<Option<Listing>> {
        Ok(self.listings.read().await.get(listing_key).cloned())
    }

    async fn merge_details(
        &self,
        listing_key: &str,
        patch: &Map<String, Value>,
    ) -> Result<Option<Listing>> {
        let mut listings = self.listings.write().await;
        Ok(listings.get_mut(listing_key).map(|listing| {
            listing.details.merge(patch);
            listing.clone()
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Predicate evaluation
// =============================================================================

enum Compiled<'a> {
    Equals(&'a str),
    Matches(Regex),
    GreaterThan(f64),
    Between { min: Option<f64>, max: Option<f64> },
    Within { from: DateTime<Utc>, to: DateTime<Utc> },
}

fn compile(filter: &ListingFilter) -> Result<Vec<(&str, Compiled<'_>)>> {
    filter
        .iter()
        .map(|(field, condition)| {
            let compiled = match condition {
                Condition::Equals(value) => Compiled::Equals(value.as_str()),
                Condition::Matches(pattern) => {
                    let regex = pattern.to_regex().map_err(|source| StoreError::InvalidPattern {
                        field: field.to_string(),
                        source,
                    })?;
                    Compiled::Matches(regex)
                }
                Condition::GreaterThan(bound) => Compiled::GreaterThan(*bound),
                Condition::Between { min, max } => Compiled::Between {
                    min: *min,
                    max: *max,
                },
                Condition::Within { from, to } => Compiled::Within {
                    from: *from,
                    to: *to,
                },
            };
            Ok::<_, StoreError>((field, compiled))
        })
        .collect()
}

fn matches_all(conditions: &[(&str, Compiled<'_>)], details: &ListingDetails) -> bool {
    conditions
        .iter()
        .all(|(field, condition)| matches(field, condition, details))
}

fn matches(field: &str, condition: &Compiled<'_>, details: &ListingDetails) -> bool {
    match condition {
        Compiled::Equals(expected) => details.str_field(field) == Some(*expected),
        Compiled::Matches(regex) => details.str_field(field).is_some_and(|v| regex.is_match(v)),
        Compiled::GreaterThan(bound) => details.number_field(field).is_some_and(|v| v > *bound),
        Compiled::Between { min, max } => details.number_field(field).is_some_and(|v| {
            min.map_or(true, |min| v >= min) && max.map_or(true, |max| v <= max)
        }),
        Compiled::Within { from, to } => details
            .timestamp_field(field)
            .is_some_and(|ts| ts >= *from && ts <= *to),
    }
}
