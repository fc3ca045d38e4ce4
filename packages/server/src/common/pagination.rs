//! Offset-based pagination for listing endpoints
//!
//! Request parameters arrive as raw strings and are never rejected: anything
//! that does not parse falls back to a default, everything else is clamped.
//!
//! # Usage
//!
//! ```rust,ignore
//! let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref(), SINGLE_STORE_DEFAULT_LIMIT);
//! let items = store.query(&filter, sort, page.start_index(), page.limit()).await?;
//! let total = store.count(&filter).await?;
//! let body = PageResponse::new(&page, total, items);
//! ```

use serde::Serialize;

/// Default page size for endpoints backed by one store.
pub const SINGLE_STORE_DEFAULT_LIMIT: u64 = 10;

/// Default page size for endpoints spanning several stores.
pub const MULTI_STORE_DEFAULT_LIMIT: u64 = 20;

/// Upper bound for `limit`.
pub const MAX_LIMIT: u64 = 100;

// ============================================================================
// PageRequest
// ============================================================================

/// Validated page/limit pair. `page >= 1`, `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Build from raw query values.
    ///
    /// * page: absent, non-numeric, zero or negative → 1
    /// * limit: absent, non-numeric or zero → `default_limit`; negative → 1;
    ///   larger than `MAX_LIMIT` → `MAX_LIMIT`
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> Self {
        let page = parse_int(page).filter(|p| *p > 0).unwrap_or(1) as u64;

        let limit = match parse_int(limit) {
            None | Some(0) => default_limit as i64,
            Some(l) => l,
        };
        let limit = limit.clamp(1, MAX_LIMIT as i64) as u64;

        Self { page, limit }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Offset of the first item on this page.
    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Offset one past the last item on this page.
    pub fn end_index(&self) -> u64 {
        self.start_index().saturating_add(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

// ============================================================================
// PageResponse
// ============================================================================

/// Response envelope shared by every list endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_properties: u64,
    pub properties: Vec<T>,
}

impl<T> PageResponse<T> {
    pub fn new(request: &PageRequest, total: u64, properties: Vec<T>) -> Self {
        Self {
            page: request.page(),
            limit: request.limit(),
            total_pages: request.total_pages(total),
            total_properties: total,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(page: Option<&str>, limit: Option<&str>) -> PageRequest {
        PageRequest::from_raw(page, limit, SINGLE_STORE_DEFAULT_LIMIT)
    }

    #[test]
    fn defaults_when_absent() {
        let r = req(None, None);
        assert_eq!(r.page(), 1);
        assert_eq!(r.limit(), 10);
        assert_eq!(r.start_index(), 0);
    }

    #[test]
    fn multi_store_default_limit() {
        let r = PageRequest::from_raw(None, None, MULTI_STORE_DEFAULT_LIMIT);
        assert_eq!(r.limit(), 20);
    }

    #[test]
    fn hostile_pages_fall_back_to_first() {
        for raw in ["0", "-3", "abc", ""] {
            assert_eq!(req(Some(raw), None).page(), 1, "page={raw}");
        }
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(req(None, Some("500")).limit(), 100);
        assert_eq!(req(None, Some("-5")).limit(), 1);
        assert_eq!(req(None, Some("0")).limit(), 10);
        assert_eq!(req(None, Some("ten")).limit(), 10);
        assert_eq!(req(None, Some(" 25 ")).limit(), 25);
    }

    #[test]
    fn start_index_follows_page_and_limit() {
        for (page, limit) in [(1u64, 1u64), (2, 10), (7, 100), (3, 33)] {
            let r = req(Some(&page.to_string()), Some(&limit.to_string()));
            assert_eq!(r.start_index(), (page - 1) * limit);
            assert!((1..=MAX_LIMIT).contains(&r.limit()));
        }
    }

    #[test]
    fn total_pages_rounds_up() {
        let r = req(None, Some("10"));
        assert_eq!(r.total_pages(0), 0);
        assert_eq!(r.total_pages(10), 1);
        assert_eq!(r.total_pages(11), 2);
    }

    #[test]
    fn response_serializes_camel_case() {
        let r = req(Some("2"), Some("5"));
        let body = PageResponse::new(&r, 12, vec![1, 2]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 5);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["totalProperties"], 12);
        assert_eq!(json["properties"], serde_json::json!([1, 2]));
    }
}
