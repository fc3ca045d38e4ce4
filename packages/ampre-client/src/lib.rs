//! Pure AMPRE OData syndication API client.
//!
//! A minimal client for the MLS syndication feed. Supports paging through the
//! `Property` resource, fetching the `Media` records attached to a listing and
//! forwarding partial updates back upstream.
//!
//! # Example
//!
//! ```rust,ignore
//! use ampre_client::{AmpreClient, PropertyQuery};
//!
//! let client = AmpreClient::new("https://query.ampre.ca/odata", "token")?;
//!
//! let page = client.fetch_properties(&PropertyQuery::page(0, 100)).await?;
//! for property in &page {
//!     println!("{}", property["ListingKey"]);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{AmpreError, Result};
pub use types::{odata_quote, PatchOutcome, PropertyQuery};

use std::time::Duration;

use serde_json::Value;
use types::ODataCollection;

/// Default per-request timeout. A hung upstream call fails after this long.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AmpreClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl AmpreClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url, token))
    }

    /// Build on top of an existing `reqwest::Client` (shared connection pool).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of the `Property` resource.
    ///
    /// An empty vector means the feed is exhausted for this query. A body
    /// without a `value` array is `AmpreError::Decode`.
    pub async fn fetch_properties(&self, query: &PropertyQuery) -> Result<Vec<Value>> {
        let url = format!("{}/Property", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query.to_params())
            .send()
            .await?;

        let collection: ODataCollection<Value> = Self::read_collection(resp).await?;
        tracing::debug!(
            skip = query.skip,
            top = query.top,
            count = collection.value.len(),
            "Fetched property page"
        );
        Ok(collection.value)
    }

    /// Fetch all media records whose `ResourceRecordKey` is the given listing key.
    pub async fn fetch_media(&self, listing_key: &str) -> Result<Vec<Value>> {
        let url = format!("{}/Media", self.base_url);
        let filter = format!("ResourceRecordKey eq {}", odata_quote(listing_key));
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("$filter", filter)])
            .send()
            .await?;

        let collection: ODataCollection<Value> = Self::read_collection(resp).await?;
        tracing::debug!(
            listing_key,
            count = collection.value.len(),
            "Fetched media"
        );
        Ok(collection.value)
    }

    /// PATCH a property upstream. Non-2xx responses are returned as errors.
    pub async fn patch_property(&self, listing_key: &str, body: &Value) -> Result<PatchOutcome> {
        let url = format!("{}/Property({})", self.base_url, odata_quote(listing_key));
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AmpreError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(PatchOutcome {
            status: status.as_u16(),
            body: text,
        })
    }

    async fn read_collection<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<ODataCollection<T>> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AmpreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        let body = resp.text().await?;
        ODataCollection::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = AmpreClient::with_client(
            reqwest::Client::new(),
            "https://query.ampre.ca/odata/",
            "token",
        );
        assert_eq!(client.base_url(), "https://query.ampre.ca/odata");
    }
}
