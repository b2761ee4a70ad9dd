//! Attendance record sources
//!
//! The engine never fetches data itself. A `RecordSource` answers a report
//! request with an unordered batch of raw records; the remote-store client of
//! a hosting application implements it, and `InMemorySource` serves records
//! already loaded from JSON.

use serde_json::Value;
use tracing::debug;

use crate::error::ReportError;
use crate::normalizer::{lookup, parse_timestamp, section_of, TIMESTAMP_FIELDS};
use crate::types::{RawRecord, ReportScope};

/// Trait for data-acquisition collaborators
pub trait RecordSource {
    /// Fetch raw records for the inclusive window and optional section filter.
    ///
    /// A failure aborts the whole request and should be reported as
    /// `ReportError::Acquisition`.
    fn fetch(&self, scope: &ReportScope) -> Result<Vec<RawRecord>, ReportError>;
}

/// Source over records already held in memory.
///
/// Applies the same window and section filtering the remote query would.
/// Records whose timestamp cannot be read are passed through so the
/// normalizer can count them as malformed.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<RawRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON array
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        parse_array(json).map(Self::new)
    }

    /// Load records from newline-delimited JSON
    pub fn from_ndjson(ndjson: &str) -> Result<Self, ReportError> {
        parse_ndjson(ndjson).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, unfiltered
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }
}

impl RecordSource for InMemorySource {
    fn fetch(&self, scope: &ReportScope) -> Result<Vec<RawRecord>, ReportError> {
        let selected: Vec<RawRecord> = self
            .records
            .iter()
            .filter(|record| in_window(record, scope) && in_section(record, scope))
            .cloned()
            .collect();

        debug!(
            available = self.records.len(),
            selected = selected.len(),
            %scope,
            "selected in-memory records"
        );
        Ok(selected)
    }
}

fn in_window(record: &RawRecord, scope: &ReportScope) -> bool {
    match lookup(record, TIMESTAMP_FIELDS).and_then(parse_timestamp) {
        Some(timestamp) => scope.contains(timestamp.date()),
        None => true,
    }
}

fn in_section(record: &RawRecord, scope: &ReportScope) -> bool {
    match &scope.section {
        None => true,
        Some(_) => section_of(record)
            .map(|section| scope.matches_section(&section))
            .unwrap_or(false),
    }
}

/// Parse a JSON string containing an array of record objects
pub fn parse_array(json: &str) -> Result<Vec<RawRecord>, ReportError> {
    let values: Vec<Value> = serde_json::from_str(json)?;
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| into_record(value, idx + 1, "element"))
        .collect()
}

/// Parse NDJSON (newline-delimited JSON) with one record object per line
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawRecord>, ReportError> {
    let mut records = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            ReportError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
        })?;
        records.push(into_record(value, line_num + 1, "line")?);
    }
    Ok(records)
}

fn into_record(value: Value, position: usize, unit: &str) -> Result<RawRecord, ReportError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ReportError::ParseError(format!(
            "Expected a record object at {unit} {position}, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scope(section: Option<&str>) -> ReportScope {
        ReportScope::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            section.map(str::to_string),
        )
    }

    fn sample_source() -> InMemorySource {
        InMemorySource::from_json(
            r#"[
                {"lrn": "S1", "section": "Rizal", "timestamp": "2024-01-03T08:00:00"},
                {"lrn": "S2", "section": "Bonifacio", "timestamp": "2024-01-31 17:00:00"},
                {"lrn": "S3", "section": "Rizal", "timestamp": "2024-02-01"},
                {"lrn": "S4", "section": "rizal", "timestamp": "2023-12-31"},
                {"lrn": "S5", "section": "Rizal", "timestamp": "not a date"}
            ]"#,
        )
        .unwrap()
    }

    fn keys(records: &[RawRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.get("lrn").and_then(Value::as_str).unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_fetch_applies_inclusive_window() {
        let records = sample_source().fetch(&scope(None)).unwrap();
        assert_eq!(keys(&records), vec!["S1", "S2", "S5"]);
    }

    #[test]
    fn test_fetch_applies_exact_section_filter() {
        let records = sample_source().fetch(&scope(Some("Rizal"))).unwrap();
        assert_eq!(keys(&records), vec!["S1", "S5"]);
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = "{\"lrn\": \"S1\"}\n\n{\"lrn\": \"S2\"}\n";
        let records = parse_ndjson(ndjson).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let err = parse_ndjson("{\"lrn\": \"S1\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array_rejects_non_objects() {
        let err = parse_array(r#"[{"lrn": "S1"}, 42]"#).unwrap_err();
        assert!(matches!(err, ReportError::ParseError(_)));
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            InMemorySource::from_json("not valid json"),
            Err(ReportError::JsonError(_))
        ));
    }
}
