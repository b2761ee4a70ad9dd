//! Record normalization
//!
//! This module turns raw, field-keyed records into typed attendance events.
//! - Field names are matched case-insensitively against known aliases
//! - Timestamps accept RFC 3339, naive date-times, plain dates and Unix seconds
//! - Records without a student key or a readable timestamp are dropped and counted

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{AttendanceEvent, MalformedReason, MalformedRecord, NormalizedBatch, RawRecord};

const STUDENT_KEY_FIELDS: &[&str] = &["lrn", "student_key", "studentkey", "student_id"];
const LAST_NAME_FIELDS: &[&str] = &["last_name", "lastname"];
const FIRST_NAME_FIELDS: &[&str] = &["first_name", "firstname"];
const YEAR_FIELDS: &[&str] = &["student_year", "studentyear", "year"];
const SECTION_FIELDS: &[&str] = &["section", "student_section", "studentsection"];
pub(crate) const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "time", "date"];
const ABSENT_FIELDS: &[&str] = &["is_absent", "isabsent", "absent"];
const ADVISER_FIELDS: &[&str] = &["adviser", "advisor"];
const GENDER_FIELDS: &[&str] = &["gender"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Normalizer for converting raw records into attendance events
pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Normalize a batch; malformed records are skipped, never fatal
    pub fn normalize(records: &[RawRecord]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();

        for (index, record) in records.iter().enumerate() {
            match Self::normalize_record(record) {
                Ok(event) => batch.events.push(event),
                Err(reason) => {
                    let student_key = read_text(record, STUDENT_KEY_FIELDS);
                    warn!(index, student_key = ?student_key, %reason, "dropping malformed record");
                    batch.malformed.push(MalformedRecord {
                        index,
                        student_key,
                        reason,
                    });
                }
            }
        }

        debug!(
            valid = batch.events.len(),
            malformed = batch.malformed.len(),
            "normalized attendance records"
        );
        batch
    }

    /// Normalize a single record
    pub fn normalize_record(record: &RawRecord) -> Result<AttendanceEvent, MalformedReason> {
        let student_key =
            read_text(record, STUDENT_KEY_FIELDS).ok_or(MalformedReason::MissingStudentKey)?;

        let timestamp = match lookup(record, TIMESTAMP_FIELDS) {
            None | Some(Value::Null) => return Err(MalformedReason::MissingTimestamp),
            Some(value) => parse_timestamp(value)
                .ok_or_else(|| MalformedReason::InvalidTimestamp(value_to_string(value)))?,
        };

        let is_absent = match lookup(record, ABSENT_FIELDS) {
            None | Some(Value::Null) => false,
            Some(value) => parse_absence_flag(value)
                .ok_or_else(|| MalformedReason::InvalidAbsenceFlag(value_to_string(value)))?,
        };

        Ok(AttendanceEvent {
            student_key,
            timestamp,
            is_absent,
            section: read_text(record, SECTION_FIELDS).unwrap_or_default(),
            year: read_text(record, YEAR_FIELDS).unwrap_or_default(),
            last_name: read_text(record, LAST_NAME_FIELDS).unwrap_or_default(),
            first_name: read_text(record, FIRST_NAME_FIELDS).unwrap_or_default(),
            adviser: read_text(record, ADVISER_FIELDS),
            gender: read_text(record, GENDER_FIELDS),
        })
    }
}

/// Find the first field whose name matches one of the aliases, ignoring case
/// and camel-case boundaries
pub(crate) fn lookup<'a>(record: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        record
            .iter()
            .find(|(name, _)| canonical_name(name) == canonical_name(alias))
            .map(|(_, value)| value)
    })
}

pub(crate) fn section_of(record: &RawRecord) -> Option<String> {
    read_text(record, SECTION_FIELDS)
}

fn canonical_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Read a field as trimmed text; numbers are accepted, empty strings are `None`
fn read_text(record: &RawRecord, aliases: &[&str]) -> Option<String> {
    let text = match lookup(record, aliases)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse a timestamp into local wall-clock time
pub(crate) fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        // Keep the calendar date as recorded in the record's own offset
        return Some(dt.naive_local());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_absence_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "absent" | "a" => Some(true),
            "false" | "no" | "0" | "present" | "p" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
