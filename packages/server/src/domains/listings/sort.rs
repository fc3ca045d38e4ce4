use std::cmp::Ordering;

use super::models::{fields, Listing};

/// `sortBy` keyword accepted by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    HighToLow,
    LowToHigh,
    #[default]
    Newest,
    Oldest,
}

impl SortBy {
    /// Unknown or missing keywords resolve to `Newest`.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("HighToLow") => SortBy::HighToLow,
            Some("LowToHigh") => SortBy::LowToHigh,
            Some("Oldest") => SortBy::Oldest,
            _ => SortBy::Newest,
        }
    }

    pub fn order(self) -> SortOrder {
        match self {
            SortBy::HighToLow => SortOrder::new(SortField::ListPrice, SortDirection::Desc),
            SortBy::LowToHigh => SortOrder::new(SortField::ListPrice, SortDirection::Asc),
            SortBy::Newest => {
                SortOrder::new(SortField::ModificationTimestamp, SortDirection::Desc)
            }
            SortBy::Oldest => SortOrder::new(SortField::ModificationTimestamp, SortDirection::Asc),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Numeric `ListPrice`.
    ListPrice,
    /// `ModificationTimestamp` parsed as a timestamp.
    ModificationTimestamp,
}

impl SortField {
    pub fn field_name(&self) -> &'static str {
        match self {
            SortField::ListPrice => fields::LIST_PRICE,
            SortField::ModificationTimestamp => fields::MODIFICATION_TIMESTAMP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A single field + direction.
///
/// Listings missing the field sort last in either direction, and ties break on
/// `ListingKey` ascending so that offset pagination is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortBy::default().order()
    }
}

impl SortOrder {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        let primary = match self.field {
            SortField::ListPrice => {
                compare_present(a.details.list_price(), b.details.list_price(), self.direction)
            }
            SortField::ModificationTimestamp => compare_present(
                a.details.modification_timestamp(),
                b.details.modification_timestamp(),
                self.direction,
            ),
        };
        primary.then_with(|| a.listing_key.cmp(&b.listing_key))
    }

    pub fn sort(&self, listings: &mut [Listing]) {
        listings.sort_by(|a, b| self.compare(a, b));
    }
}

fn compare_present<T: PartialOrd>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
