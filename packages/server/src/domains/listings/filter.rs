//! Request parameters → listing predicate.
//!
//! Every parameter is optional and the resulting conditions are conjunctive.
//! A filter holds at most one condition per field; setting a field again
//! replaces the earlier condition.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use super::models::fields;

/// Default look-back window for the recent-change restriction.
pub const DEFAULT_RECENT_CHANGE_DAYS: i64 = 30;

/// Raw query parameters accepted by every list endpoint.
///
/// Values stay strings so a malformed number never fails the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "MlsStatus")]
    pub mls_status: Option<String>,
    #[serde(rename = "PropertyType")]
    pub property_type: Option<String>,
    #[serde(rename = "PropertySubType")]
    pub property_sub_type: Option<String>,
    #[serde(rename = "TransactionType")]
    pub transaction_type: Option<String>,
    #[serde(rename = "PublicRemarks")]
    pub public_remarks: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "BedroomsTotal")]
    pub bedrooms_total: Option<String>,
    #[serde(rename = "BathroomsTotalInteger")]
    pub bathrooms_total_integer: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    #[serde(rename = "ListPriceUnit")]
    pub list_price_unit: Option<String>,
    /// Day count, not a timestamp.
    #[serde(rename = "MajorChangeTimestamp")]
    pub major_change_days: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

// ============================================================================
// Pattern
// ============================================================================

/// Case-insensitive regular expression over a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(String);

impl Pattern {
    /// Substring match with `raw` interpreted as a regex.
    ///
    /// Input outside the portable subset (see `is_portable_pattern`) is
    /// matched literally.
    pub fn contains(raw: &str) -> Self {
        Self(as_regex_or_literal(raw))
    }

    /// Substring match with regex metacharacters in `raw` escaped.
    pub fn contains_literal(raw: &str) -> Self {
        Self(regex::escape(raw))
    }

    /// Prefix match anchored at the start of the field.
    pub fn starts_with(raw: &str) -> Self {
        Self(format!("^{}", as_regex_or_literal(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&self.0).case_insensitive(true).build()
    }
}

fn as_regex_or_literal(raw: &str) -> String {
    if is_portable_pattern(raw) && Regex::new(raw).is_ok() {
        raw.to_string()
    } else {
        regex::escape(raw)
    }
}

/// Whether `raw` stays inside the regex syntax that the `regex` crate and
/// Postgres `~*` read the same way: literals, `.`, anchors, groups,
/// alternation, `*` `+` `?` with an optional lazy `?`, flat bracket
/// classes, and backslash only before ASCII punctuation.
///
/// Rejected: `(?` groups and flags, counted repetition, letter or digit
/// escapes (`\d`, `\p{..}`, backrefs), nested or POSIX classes, class set
/// operators, and stacked or leading quantifiers.
pub fn is_portable_pattern(raw: &str) -> bool {
    let mut chars = raw.chars().peekable();
    let mut in_class = false;
    // `None` where a quantifier may not appear (start, after `(`, `|`, `^`).
    let mut last: Option<char> = None;
    let mut quantified = 0u8;

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                // `\<` and `\>` are word boundaries in the `regex` crate only.
                Some(next) if next.is_ascii_punctuation() && !matches!(next, '<' | '>') => {}
                _ => return false,
            }
            last = Some(c);
            quantified = 0;
            continue;
        }

        if in_class {
            match c {
                '[' => return false,
                ']' => in_class = false,
                '&' | '-' | '~' if chars.peek() == Some(&c) => return false,
                _ => {}
            }
            last = Some(c);
            continue;
        }

        match c {
            '{' | '}' => return false,
            '(' if chars.peek() == Some(&'?') => return false,
            '*' | '+' | '?' => {
                let lazy = c == '?' && quantified == 1;
                if !lazy && (quantified > 0 || matches!(last, None | Some('(' | '|' | '^'))) {
                    return false;
                }
                quantified += 1;
                last = Some(c);
                continue;
            }
            '[' => {
                in_class = true;
                if chars.peek() == Some(&'^') {
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                }
            }
            _ => {}
        }
        last = Some(c);
        quantified = 0;
    }

    !in_class
}

// ============================================================================
// Condition / ListingFilter
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Exact string equality.
    Equals(String),
    /// Case-insensitive regex match on a string value.
    Matches(Pattern),
    /// Numeric value strictly greater than the bound.
    GreaterThan(f64),
    /// Numeric value within inclusive bounds; either side may be open.
    Between { min: Option<f64>, max: Option<f64> },
    /// Timestamp within `[from, to]`.
    Within {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    conditions: BTreeMap<String, Condition>,
}

impl ListingFilter {
    /// Matches every listing.
    pub fn all() -> Self {
        Self::default()
    }

    /// Set the condition for `field`, returning the one it replaced.
    pub fn set(&mut self, field: impl Into<String>, condition: Condition) -> Option<Condition> {
        self.conditions.insert(field.into(), condition)
    }

    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.set(field, condition);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(f, c)| (f.as_str(), c))
    }

    /// Translate request parameters into a filter evaluated at `now`.
    pub fn from_query(query: &ListingQuery, now: DateTime<Utc>) -> Self {
        let mut filter = Self::all();
        let recent = recent_change_window(param(&query.major_change_days), now);

        let mls_status = param(&query.mls_status);
        if let Some(status) = mls_status {
            filter.set(fields::MLS_STATUS, Condition::Equals(status.to_string()));
        }

        if let Some(kind) = param(&query.property_type) {
            filter.set(fields::PROPERTY_TYPE, Condition::Matches(Pattern::contains(kind)));
        }

        if let Some(sub_type) = param(&query.property_sub_type) {
            filter.set(
                fields::PROPERTY_SUB_TYPE,
                Condition::Matches(Pattern::contains_literal(sub_type)),
            );
            filter.set(fields::MAJOR_CHANGE_TIMESTAMP, recent.clone());
        }

        if param(&query.transaction_type).is_some_and(|t| t.contains("Lease")) {
            filter.set(
                fields::TRANSACTION_TYPE,
                Condition::Matches(Pattern::contains_literal("Lease")),
            );
        }

        if param(&query.public_remarks).is_some_and(|r| r.contains("Luxury")) {
            filter.set(
                fields::PUBLIC_REMARKS,
                Condition::Matches(Pattern::contains_literal("Luxury")),
            );
        }

        if let Some(city) = param(&query.city) {
            filter.set(fields::CITY, Condition::Matches(Pattern::starts_with(city)));
        }

        if let Some(beds) = number_param(&query.bedrooms_total) {
            filter.set(fields::BEDROOMS_TOTAL, Condition::GreaterThan(beds));
        }

        if let Some(baths) = number_param(&query.bathrooms_total_integer) {
            filter.set(fields::BATHROOMS_TOTAL_INTEGER, Condition::GreaterThan(baths));
        }

        let min = number_param(&query.min_price);
        let max = number_param(&query.max_price);
        if min.is_some() || max.is_some() {
            filter.set(fields::LIST_PRICE, Condition::Between { min, max });
        }

        if let Some(unit) = param(&query.list_price_unit) {
            filter.set(
                fields::LIST_PRICE_UNIT,
                Condition::Matches(Pattern::contains_literal(unit)),
            );
            filter.set(fields::MAJOR_CHANGE_TIMESTAMP, recent.clone());
        }

        if mls_status == Some("Sold") {
            filter.set(fields::MAJOR_CHANGE_TIMESTAMP, recent);
        }

        filter
    }
}

/// Trimmed, non-empty parameter value.
fn param(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn number_param(raw: &Option<String>) -> Option<f64> {
    param(raw)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// `[now - days, now]`; absent, non-numeric or negative day counts use the default.
fn recent_change_window(days: Option<&str>, now: DateTime<Utc>) -> Condition {
    let days = days
        .and_then(|d| d.parse::<i64>().ok())
        .filter(|d| *d >= 0)
        .unwrap_or(DEFAULT_RECENT_CHANGE_DAYS);

    let from = Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    Condition::Within { from, to: now }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn build(query: ListingQuery) -> ListingFilter {
        ListingFilter::from_query(&query, now())
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(build(ListingQuery::default()).is_empty());
    }

    #[test]
    fn blank_values_count_as_absent() {
        let filter = build(ListingQuery {
            city: Some("   ".into()),
            mls_status: Some(String::new()),
            ..Default::default()
        });
        assert!(filter.is_empty());
    }

    #[test]
    fn status_is_exact_and_city_is_prefix() {
        let filter = build(ListingQuery {
            mls_status: Some("New".into()),
            city: Some("Tor".into()),
            ..Default::default()
        });
        assert_eq!(filter.get("MlsStatus"), Some(&Condition::Equals("New".into())));
        assert_eq!(
            filter.get("City"),
            Some(&Condition::Matches(Pattern("^Tor".into())))
        );
        assert!(filter.get("MajorChangeTimestamp").is_none());
    }

    #[test]
    fn sub_type_is_escaped_and_triggers_recent_window() {
        let filter = build(ListingQuery {
            property_sub_type: Some("Att/Row/Twnhouse (Freehold)".into()),
            ..Default::default()
        });
        let Some(Condition::Matches(p)) = filter.get("PropertySubType") else {
            panic!("expected pattern");
        };
        assert_eq!(p.as_str(), r"Att/Row/Twnhouse \(Freehold\)");
        assert_eq!(
            filter.get("MajorChangeTimestamp"),
            Some(&Condition::Within {
                from: now() - Duration::days(30),
                to: now()
            })
        );
    }

    #[test]
    fn invalid_user_regex_is_matched_literally() {
        let filter = build(ListingQuery {
            property_type: Some("Resi(".into()),
            ..Default::default()
        });
        let Some(Condition::Matches(p)) = filter.get("PropertyType") else {
            panic!("expected pattern");
        };
        assert_eq!(p.as_str(), r"Resi\(");
        assert!(p.to_regex().is_ok());
    }

    #[test]
    fn engine_specific_regex_syntax_is_matched_literally() {
        let engine_specific = [
            r"(?P<n>T)",
            r"\p{L}",
            r"(?i)tor",
            r"T{2}",
            r"[[:alpha:]]",
            r"a**",
            r"\d+",
            r"[a&&b]",
            r"\<Tor",
        ];
        for raw in engine_specific {
            let filter = build(ListingQuery {
                property_type: Some(raw.into()),
                ..Default::default()
            });
            let Some(Condition::Matches(p)) = filter.get("PropertyType") else {
                panic!("expected pattern");
            };
            assert_eq!(p.as_str(), regex::escape(raw), "raw={raw}");
        }
    }

    #[test]
    fn portable_regex_syntax_is_kept() {
        let portable = [
            "Resi.*",
            "^(Condo|Detached)$",
            "Semi-?Detached",
            r"Att\/Row",
            "[A-Z]ondo",
            "x+?",
            "[]a]",
        ];
        for raw in portable {
            assert!(is_portable_pattern(raw), "raw={raw}");
            assert_eq!(Pattern::contains(raw).as_str(), raw);
        }
        assert_eq!(Pattern::starts_with("Tor|Ott").as_str(), "^Tor|Ott");
    }

    #[test]
    fn lease_and_luxury_force_fixed_patterns() {
        let filter = build(ListingQuery {
            transaction_type: Some("For Lease".into()),
            public_remarks: Some("Luxury penthouse".into()),
            ..Default::default()
        });
        assert_eq!(
            filter.get("TransactionType"),
            Some(&Condition::Matches(Pattern("Lease".into())))
        );
        assert_eq!(
            filter.get("PublicRemarks"),
            Some(&Condition::Matches(Pattern("Luxury".into())))
        );

        let ignored = build(ListingQuery {
            transaction_type: Some("For Sale".into()),
            public_remarks: Some("Cozy".into()),
            ..Default::default()
        });
        assert!(ignored.is_empty());
    }

    #[test]
    fn numeric_params_ignore_garbage() {
        let filter = build(ListingQuery {
            bedrooms_total: Some("3".into()),
            bathrooms_total_integer: Some("two".into()),
            min_price: Some("NaN".into()),
            max_price: Some("1000000".into()),
            ..Default::default()
        });
        assert_eq!(filter.get("BedroomsTotal"), Some(&Condition::GreaterThan(3.0)));
        assert!(filter.get("BathroomsTotalInteger").is_none());
        assert_eq!(
            filter.get("ListPrice"),
            Some(&Condition::Between {
                min: None,
                max: Some(1_000_000.0)
            })
        );
    }

    #[test]
    fn sold_uses_day_count_parameter() {
        let filter = build(ListingQuery {
            mls_status: Some("Sold".into()),
            major_change_days: Some("7".into()),
            ..Default::default()
        });
        assert_eq!(
            filter.get("MajorChangeTimestamp"),
            Some(&Condition::Within {
                from: now() - Duration::days(7),
                to: now()
            })
        );
    }

    #[test]
    fn day_count_without_trigger_adds_nothing() {
        let filter = build(ListingQuery {
            major_change_days: Some("7".into()),
            ..Default::default()
        });
        assert!(filter.is_empty());
    }

    #[test]
    fn bad_day_count_falls_back_to_default() {
        for raw in ["soon", "-4"] {
            let filter = build(ListingQuery {
                list_price_unit: Some("Per Month".into()),
                major_change_days: Some(raw.into()),
                ..Default::default()
            });
            assert_eq!(
                filter.get("MajorChangeTimestamp"),
                Some(&Condition::Within {
                    from: now() - Duration::days(DEFAULT_RECENT_CHANGE_DAYS),
                    to: now()
                }),
                "days={raw}"
            );
        }
    }

    #[test]
    fn set_overwrites_previous_condition() {
        let mut filter = ListingFilter::all();
        filter.set("City", Condition::Equals("A".into()));
        let replaced = filter.set("City", Condition::Equals("B".into()));
        assert_eq!(replaced, Some(Condition::Equals("A".into())));
        assert_eq!(filter.len(), 1);
    }
}
