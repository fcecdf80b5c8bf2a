//! Response normalization
//!
//! The events API answers with `{"data": [{"<expression>": value, ...}]}`.
//! Records are reduced to the fields named in a facet's rename table and
//! re-keyed to short stable names. An empty `data` array is a valid answer
//! meaning "nothing happened in this window" and surfaces as `NoData`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Mapping from API field expression to short key
pub type RenameTable = &'static [(&'static str, &'static str)];

/// Body of an events query. Only `data` is part of the contract.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMetricResponse {
    pub data: Vec<Map<String, Value>>,
}

/// Normalized result of one query
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Data(T),
    NoData,
}

impl<T> Normalized<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Normalized::NoData)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Normalized::Data(d) => Some(d),
            Normalized::NoData => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Normalized::Data(d) => Some(d),
            Normalized::NoData => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        match self {
            Normalized::Data(d) => Normalized::Data(f(d)),
            Normalized::NoData => Normalized::NoData,
        }
    }
}

/// One renamed record. Values are kept as the API sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord(Map<String, Value>);

impl MetricRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric value of `key`; `None` when absent, null or non-numeric
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for MetricRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Keep only mapped fields, re-keyed to their short names
pub fn rename_fields(record: &Map<String, Value>, table: RenameTable) -> MetricRecord {
    let mut out = Map::new();
    for (field, value) in record {
        if let Some((_, short)) = table.iter().find(|(expr, _)| expr == field) {
            out.insert((*short).to_string(), value.clone());
        }
    }
    MetricRecord(out)
}

/// Normalize the first record of a single-row facet
pub fn normalize_first(raw: &RawMetricResponse, table: RenameTable) -> Normalized<MetricRecord> {
    match raw.data.first() {
        Some(record) => Normalized::Data(rename_fields(record, table)),
        None => Normalized::NoData,
    }
}

/// Normalize every record of a list facet, preserving order
pub fn normalize_all(raw: &RawMetricResponse, table: RenameTable) -> Normalized<Vec<MetricRecord>> {
    if raw.data.is_empty() {
        return Normalized::NoData;
    }
    Normalized::Data(
        raw.data
            .iter()
            .map(|record| rename_fields(record, table))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: RenameTable = &[("failure_rate()", "failure_rate"), ("apdex()", "apdex")];

    fn raw(value: Value) -> RawMetricResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_data_is_no_data() {
        let response = raw(json!({ "data": [] }));
        assert_eq!(normalize_first(&response, TABLE), Normalized::NoData);
        assert_eq!(normalize_all(&response, TABLE), Normalized::NoData);
    }

    #[test]
    fn test_renames_and_drops_unmapped() {
        let response = raw(json!({
            "data": [{ "failure_rate()": 0.01, "apdex()": 0.97, "count()": 1234 }]
        }));

        let record = normalize_first(&response, TABLE).into_data().unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.number("failure_rate"), Some(0.01));
        assert_eq!(record.number("apdex"), Some(0.97));
        assert!(record.get("count()").is_none());
        assert!(record.get("count").is_none());
    }

    #[test]
    fn test_only_first_record_used() {
        let response = raw(json!({
            "data": [{ "apdex()": 0.9 }, { "apdex()": 0.1 }]
        }));
        let record = normalize_first(&response, TABLE).into_data().unwrap();
        assert_eq!(record.number("apdex"), Some(0.9));
    }

    #[test]
    fn test_normalize_all_keeps_order() {
        let table: RenameTable = &[("span.description", "query")];
        let response = raw(json!({
            "data": [
                { "span.description": "SELECT 1" },
                { "span.description": "SELECT 2" },
                { "span.description": "SELECT 3" }
            ]
        }));

        let records = normalize_all(&response, table).into_data().unwrap();
        let queries: Vec<_> = records.iter().filter_map(|r| r.text("query")).collect();
        assert_eq!(queries, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_values_are_not_coerced() {
        let response = raw(json!({
            "data": [{ "failure_rate()": "0.5", "apdex()": null }]
        }));
        let record = normalize_first(&response, TABLE).into_data().unwrap();
        assert_eq!(record.get("failure_rate"), Some(&json!("0.5")));
        assert_eq!(record.number("failure_rate"), None);
        assert_eq!(record.get("apdex"), Some(&Value::Null));
    }

    #[test]
    fn test_record_without_mapped_fields_is_empty_data() {
        let response = raw(json!({ "data": [{ "other": 1 }] }));
        let normalized = normalize_first(&response, TABLE);
        assert!(!normalized.is_no_data());
        assert!(normalized.data().unwrap().is_empty());
    }

    #[test]
    fn test_missing_data_key_fails_to_decode() {
        let result: Result<RawMetricResponse, _> = serde_json::from_value(json!({ "detail": "x" }));
        assert!(result.is_err());
    }
}
