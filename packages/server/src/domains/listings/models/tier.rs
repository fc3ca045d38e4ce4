use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Licensing tier a listing was syndicated under.
///
/// Each tier has its own redistribution rights and therefore its own store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingTier {
    Idx,
    Vow,
    Sold,
}

impl ListingTier {
    /// Aggregation order. Earlier tiers win on duplicate keys.
    pub const ALL: [ListingTier; 3] = [ListingTier::Idx, ListingTier::Vow, ListingTier::Sold];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingTier::Idx => "idx",
            ListingTier::Vow => "vow",
            ListingTier::Sold => "sold",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            ListingTier::Idx => "idx_listings",
            ListingTier::Vow => "vow_listings",
            ListingTier::Sold => "sold_listings",
        }
    }
}

impl fmt::Display for ListingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idx" => Ok(ListingTier::Idx),
            "vow" => Ok(ListingTier::Vow),
            "sold" => Ok(ListingTier::Sold),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown listing tier: {0}")]
pub struct UnknownTier(pub String);
