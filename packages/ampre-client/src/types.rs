use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::Result;

/// OData collection envelope: `{ "@odata.context": "...", "value": [...] }`.
///
/// `value` is required: a 2xx body without it is a decode error, not an
/// empty page.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataCollection<T> {
    pub value: Vec<T>,
}

impl<T: DeserializeOwned> ODataCollection<T> {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Offset cursor for the `Property` resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyQuery {
    pub skip: u64,
    pub top: u64,
    /// Server-side `$filter` expression, e.g. `MlsStatus eq 'Sold'`.
    pub filter: Option<String>,
}

impl PropertyQuery {
    pub fn page(skip: u64, top: u64) -> Self {
        Self {
            skip,
            top,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("$top", self.top.to_string()), ("$skip", self.skip.to_string())];
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        params
    }
}

/// Result of a forwarded PATCH.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub status: u16,
    pub body: String,
}

/// Quote a string as an OData literal (`'` doubled).
pub fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_without_filter() {
        let params = PropertyQuery::page(200, 100).to_params();
        assert_eq!(
            params,
            vec![("$top", "100".to_string()), ("$skip", "200".to_string())]
        );
    }

    #[test]
    fn params_with_filter() {
        let params = PropertyQuery::page(0, 50)
            .with_filter(Some("MlsStatus eq 'Sold'".into()))
            .to_params();
        assert_eq!(params[2], ("$filter", "MlsStatus eq 'Sold'".to_string()));
    }

    #[test]
    fn quote_doubles_single_quotes() {
        assert_eq!(odata_quote("X123"), "'X123'");
        assert_eq!(odata_quote("O'Neil"), "'O''Neil'");
    }

    use crate::error::AmpreError;
    use serde_json::Value;

    #[test]
    fn collection_without_value_is_an_error() {
        let result = ODataCollection::<Value>::parse(r#"{"@odata.context":"$metadata#Property"}"#);
        assert!(matches!(result, Err(AmpreError::Decode(_))));
    }

    #[test]
    fn error_envelope_with_ok_status_is_an_error() {
        let result = ODataCollection::<Value>::parse(
            r#"{"error":{"code":"","message":"The query specified in the URI is not valid."}}"#,
        );
        assert!(matches!(result, Err(AmpreError::Decode(_))));
    }

    #[test]
    fn empty_value_array_is_an_empty_page() {
        let parsed = ODataCollection::<Value>::parse(r#"{"value":[]}"#).unwrap();
        assert!(parsed.value.is_empty());
    }
}
