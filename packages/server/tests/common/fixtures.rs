//! Test fixtures for creating listing data.

use chrono::{Duration, Utc};
use listings_core::domains::listings::{ListingDetails, ListingStore};
use serde_json::{json, Value};

/// Upstream-shaped property record with `ListingKey` filled in.
pub fn property(listing_key: &str, fields: Value) -> ListingDetails {
    let mut record = json!({ "ListingKey": listing_key });
    if let (Some(target), Value::Object(extra)) = (record.as_object_mut(), fields) {
        target.extend(extra);
    }
    ListingDetails::from_value(record).expect("property fixture must be an object")
}

/// RFC 3339 timestamp `days` before now.
pub fn days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339()
}

/// Upsert each `(key, fields)` pair with no media.
pub async fn seed(store: &dyn ListingStore, records: Vec<(&str, Value)>) {
    for (key, fields) in records {
        store
            .upsert(key, &property(key, fields), &[])
            .await
            .expect("seed upsert");
    }
}
