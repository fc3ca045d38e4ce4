pub mod aggregator;
pub mod filter;
pub mod models;
pub mod sort;
pub mod store;

// Re-export the read path
pub use aggregator::{AggregatedPage, Aggregator};
pub use filter::{Condition, ListingFilter, ListingQuery, Pattern};
pub use sort::{SortBy, SortDirection, SortField, SortOrder};

// Re-export models and storage
pub use models::{fields, Listing, ListingDetails, ListingTier};
pub use store::{ListingStore, ListingStores, MemoryListingStore, PgListingStore, StoreError};
