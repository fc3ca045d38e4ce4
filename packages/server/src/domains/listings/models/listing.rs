use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upstream field names the filter and sort code reads.
pub mod fields {
    pub const LISTING_KEY: &str = "ListingKey";
    pub const MLS_STATUS: &str = "MlsStatus";
    pub const PROPERTY_TYPE: &str = "PropertyType";
    pub const PROPERTY_SUB_TYPE: &str = "PropertySubType";
    pub const TRANSACTION_TYPE: &str = "TransactionType";
    pub const PUBLIC_REMARKS: &str = "PublicRemarks";
    pub const CITY: &str = "City";
    pub const BEDROOMS_TOTAL: &str = "BedroomsTotal";
    pub const BATHROOMS_TOTAL_INTEGER: &str = "BathroomsTotalInteger";
    pub const LIST_PRICE: &str = "ListPrice";
    pub const LIST_PRICE_UNIT: &str = "ListPriceUnit";
    pub const MAJOR_CHANGE_TIMESTAMP: &str = "MajorChangeTimestamp";
    pub const MODIFICATION_TIMESTAMP: &str = "ModificationTimestamp";
}

/// Listing - one MLS property record keyed by its upstream `ListingKey`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "ListingKey")]
    pub listing_key: String,
    #[serde(rename = "propertyDetails")]
    pub details: ListingDetails,
    #[serde(default)]
    pub media: Vec<Value>,
}

impl Listing {
    pub fn new(listing_key: impl Into<String>, details: ListingDetails, media: Vec<Value>) -> Self {
        Self {
            listing_key: listing_key.into(),
            details,
            media,
        }
    }
}

/// Schemaless upstream fields.
///
/// Upstream adds and drops fields without notice, so the map is kept as-is and
/// only the handful of fields used for filtering and sorting get accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingDetails(Map<String, Value>);

impl ListingDetails {
    /// Wrap an upstream record. Anything that is not a JSON object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// JSON numbers only; numeric-looking strings do not count.
    pub fn number_field(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn timestamp_field(&self, field: &str) -> Option<DateTime<Utc>> {
        self.str_field(field).and_then(parse_timestamp)
    }

    pub fn listing_key(&self) -> Option<&str> {
        self.str_field(fields::LISTING_KEY)
    }

    pub fn city(&self) -> Option<&str> {
        self.str_field(fields::CITY)
    }

    pub fn list_price(&self) -> Option<f64> {
        self.number_field(fields::LIST_PRICE)
    }

    pub fn bedrooms_total(&self) -> Option<f64> {
        self.number_field(fields::BEDROOMS_TOTAL)
    }

    pub fn major_change_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(fields::MAJOR_CHANGE_TIMESTAMP)
    }

    pub fn modification_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(fields::MODIFICATION_TIMESTAMP)
    }

    /// Shallow merge: top-level keys in `patch` replace existing ones.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for ListingDetails {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Timestamp shapes understood by `parse_timestamp`. The `listing_timestamp`
/// SQL helper guards its cast with the same expression.
pub const TIMESTAMP_PATTERN: &str = r"^[0-9]{4}-[0-9]{2}-[0-9]{2}([Tt ]([01][0-9]|2[0-3]):[0-5][0-9](:[0-5][0-9](\.[0-9]+)?)?([Zz]|[+-][0-9]{2}(:?[0-9]{2})?)?)?$";

lazy_static! {
    static ref TIMESTAMP_SHAPE: Regex = Regex::new(TIMESTAMP_PATTERN).unwrap();
}

/// Parse an upstream timestamp: ISO 8601 date or date-time, `T` or space
/// separated, optional `Z` / `+HH` / `+HHMM` / `+HH:MM` offset. Values
/// without an offset are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if !TIMESTAMP_SHAPE.is_match(raw) {
        return None;
    }

    let (date, time) = raw.split_at(10);
    if time.is_empty() {
        let midnight = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?;
        return in_common_era(midnight).map(|naive| naive.and_utc());
    }

    // Drop the separator; the shape check guarantees ASCII.
    let time = &time[1..];
    let (clock, zone) = match time.find(['Z', 'z', '+', '-']) {
        Some(i) => time.split_at(i),
        None => (time, ""),
    };
    // Sub-nanosecond digits carry nothing chrono can represent.
    let clock = match clock.find('.') {
        Some(dot) if clock.len() > dot + 10 => &clock[..dot + 10],
        _ => clock,
    };
    let format = if clock.len() == 5 {
        "%Y-%m-%dT%H:%M"
    } else {
        "%Y-%m-%dT%H:%M:%S%.f"
    };
    let naive = NaiveDateTime::parse_from_str(&format!("{date}T{clock}"), format).ok()?;
    let naive = in_common_era(naive)?;

    let offset = parse_offset(zone)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Postgres has no year zero.
fn in_common_era(naive: NaiveDateTime) -> Option<NaiveDateTime> {
    (naive.year() >= 1).then_some(naive)
}

/// `""`, `Z`, `+HH`, `+HHMM` or `+HH:MM`. Postgres rejects displacements past
/// 15:59.
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || zone.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = zone.split_at(1);
    let digits = digits.replace(':', "");
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..) {
        Some("") | None => 0,
        Some(m) => m.parse().ok()?,
    };
    if hours > 15 || minutes > 59 {
        return None;
    }

    let seconds = hours * 3600 + minutes * 60;
    FixedOffset::east_opt(if sign == "-" { -seconds } else { seconds })
}
