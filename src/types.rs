//! Core types for the attendance matrix pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw records, normalized events, the student roster, monthly grids,
//! the finished report document and its summary statistics.

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ReportError;

/// Raw record as delivered by the data-acquisition collaborator (field-keyed, untyped)
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Report request: inclusive date range plus optional section filter.
///
/// Every request-level error carries a copy of this so callers can log it
/// without re-parsing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScopeFields")]
pub struct ReportScope {
    /// First calendar day of the report (inclusive)
    pub start: NaiveDate,
    /// Last calendar day of the report (inclusive)
    pub end: NaiveDate,
    /// Exact-match, case-sensitive section filter; `None` means all sections
    pub section: Option<String>,
}

/// Wire form of `ReportScope`; deserialization goes through `ReportScope::new`
#[derive(Deserialize)]
struct ScopeFields {
    start: NaiveDate,
    end: NaiveDate,
    #[serde(default)]
    section: Option<String>,
}

impl From<ScopeFields> for ReportScope {
    fn from(fields: ScopeFields) -> Self {
        ReportScope::new(fields.start, fields.end, fields.section)
    }
}

impl ReportScope {
    /// Create a scope; an empty or whitespace-only section means "all sections"
    pub fn new(start: NaiveDate, end: NaiveDate, section: Option<String>) -> Self {
        Self {
            start,
            end,
            section: section.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Reject ranges whose start falls after their end
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.start > self.end {
            return Err(ReportError::InvalidRange {
                scope: self.clone(),
            });
        }
        Ok(())
    }

    /// Whether a calendar date lies inside the inclusive range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether a student section passes the filter
    pub fn matches_section(&self, section: &str) -> bool {
        match &self.section {
            Some(filter) => filter == section,
            None => true,
        }
    }
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}, ", self.start, self.end)?;
        match &self.section {
            Some(section) => write!(f, "section {section}"),
            None => write!(f, "all sections"),
        }
    }
}

/// A single typed attendance event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Stable student identifier (LRN)
    pub student_key: String,
    /// When the event was recorded (local wall-clock time)
    pub timestamp: NaiveDateTime,
    /// Absence is the only positive mark; presence is inferred
    pub is_absent: bool,
    pub section: String,
    pub year: String,
    pub last_name: String,
    pub first_name: String,
    /// Adviser from the student master list, when the record carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adviser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl AttendanceEvent {
    /// Calendar date of the event
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Whether the event falls on Monday through Friday
    pub fn is_weekday(&self) -> bool {
        crate::calendar::is_weekday(self.date())
    }
}

/// Why a raw record was dropped during normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum MalformedReason {
    MissingStudentKey,
    MissingTimestamp,
    InvalidTimestamp(String),
    InvalidAbsenceFlag(String),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingStudentKey => write!(f, "missing student key"),
            MalformedReason::MissingTimestamp => write!(f, "missing timestamp"),
            MalformedReason::InvalidTimestamp(value) => {
                write!(f, "unparsable timestamp {value:?}")
            }
            MalformedReason::InvalidAbsenceFlag(value) => {
                write!(f, "unrecognised absence flag {value:?}")
            }
        }
    }
}

/// A dropped record, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRecord {
    /// Position of the record in the input batch
    pub index: usize,
    /// Student key, when one could be read
    pub student_key: Option<String>,
    pub reason: MalformedReason,
}

/// Output of the normalizer: valid events plus everything that was dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub events: Vec<AttendanceEvent>,
    pub malformed: Vec<MalformedRecord>,
}

impl NormalizedBatch {
    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }
}

/// One row identity per unique student key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_key: String,
    pub last_name: String,
    pub first_name: String,
    pub year: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adviser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl From<&AttendanceEvent> for StudentRecord {
    fn from(event: &AttendanceEvent) -> Self {
        Self {
            student_key: event.student_key.clone(),
            last_name: event.last_name.clone(),
            first_name: event.first_name.clone(),
            year: event.year.clone(),
            section: event.section.clone(),
            adviser: event.adviser.clone(),
            gender: event.gender.clone(),
        }
    }
}

/// A calendar month, ordered chronologically by (year, month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Month containing the given date
    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Fixed "MonthName-Year" label, e.g. "January-2025"
    pub fn label(&self) -> String {
        let name = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("Unknown");
        format!("{}-{}", name, self.year)
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Explicit state of a single (student, day) cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMark {
    #[default]
    Blank,
    Absent,
}

impl CellMark {
    /// Marker rendered into the sheet
    pub fn symbol(&self) -> &'static str {
        match self {
            CellMark::Blank => "",
            CellMark::Absent => "A",
        }
    }
}

/// One student's cells for a month, aligned with the grid's weekday columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub student: StudentRecord,
    pub cells: Vec<CellMark>,
}

/// Status of a monthly grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStatus {
    Populated,
    /// The month has no weekday columns; kept as an explicit placeholder
    NoWeekdays,
}

/// Absence grid for one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyGrid {
    pub month: CalendarMonth,
    /// Weekday day-of-month columns, ascending
    pub weekdays: Vec<u32>,
    /// Rows ordered by student key
    pub rows: Vec<GridRow>,
    pub status: GridStatus,
}

impl MonthlyGrid {
    /// Look up the mark at (student, day); `None` when no such row or column exists
    pub fn cell(&self, student_key: &str, day: u32) -> Option<CellMark> {
        let column = self.weekdays.iter().position(|&d| d == day)?;
        self.rows
            .iter()
            .find(|row| row.student.student_key == student_key)
            .and_then(|row| row.cells.get(column).copied())
    }

    pub fn is_placeholder(&self) -> bool {
        self.status == GridStatus::NoWeekdays
    }
}

/// Per-student totals for one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTotals {
    pub absences: usize,
    pub presences: usize,
}

/// A month of the report: the grid plus totals aligned with its rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMonth {
    pub grid: MonthlyGrid,
    pub totals: Vec<RowTotals>,
}

impl ReportMonth {
    pub fn month(&self) -> CalendarMonth {
        self.grid.month
    }

    /// Totals for a given student
    pub fn totals_for(&self, student_key: &str) -> Option<RowTotals> {
        self.grid
            .rows
            .iter()
            .position(|row| row.student.student_key == student_key)
            .and_then(|idx| self.totals.get(idx).copied())
    }
}

/// Chronologically ordered sequence of report months
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub months: Vec<ReportMonth>,
}

impl ReportDocument {
    pub fn labels(&self) -> Vec<String> {
        self.months.iter().map(|m| m.month().label()).collect()
    }
}

/// Cross-cutting counts over the full normalized event set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_events: usize,
    pub total_absences: usize,
    pub total_presences: usize,
    /// Events dated Saturday or Sunday (counted above, absent from every grid)
    pub weekend_events: usize,
    pub absences_by_year: BTreeMap<String, usize>,
    pub absences_by_section: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_label() {
        assert_eq!(CalendarMonth::new(2025, 1).label(), "January-2025");
        assert_eq!(CalendarMonth::new(2024, 12).label(), "December-2024");
    }

    #[test]
    fn test_months_order_chronologically() {
        let mut months = vec![
            CalendarMonth::new(2025, 1),
            CalendarMonth::new(2024, 12),
            CalendarMonth::new(2024, 2),
        ];
        months.sort();
        assert_eq!(
            months,
            vec![
                CalendarMonth::new(2024, 2),
                CalendarMonth::new(2024, 12),
                CalendarMonth::new(2025, 1),
            ]
        );
    }

    #[test]
    fn test_scope_normalizes_empty_section() {
        let scope = ReportScope::new(date(2024, 1, 1), date(2024, 1, 31), Some("  ".to_string()));
        assert_eq!(scope.section, None);
        assert!(scope.matches_section("anything"));
    }

    #[test]
    fn test_deserialized_scope_normalizes_empty_section() {
        let scope: ReportScope =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-31","section":""}"#)
                .unwrap();
        assert_eq!(scope.section, None);
        assert!(scope.matches_section("Rizal"));

        let missing: ReportScope =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-31"}"#).unwrap();
        assert_eq!(missing, scope);

        let filtered: ReportScope = serde_json::from_str(
            r#"{"start":"2024-01-01","end":"2024-01-31","section":"Rizal"}"#,
        )
        .unwrap();
        assert_eq!(filtered.section.as_deref(), Some("Rizal"));
    }

    #[test]
    fn test_scope_section_is_case_sensitive() {
        let scope = ReportScope::new(
            date(2024, 1, 1),
            date(2024, 1, 31),
            Some("Rizal".to_string()),
        );
        assert!(scope.matches_section("Rizal"));
        assert!(!scope.matches_section("rizal"));
    }

    #[test]
    fn test_scope_validate_rejects_reversed_range() {
        let scope = ReportScope::new(date(2024, 2, 15), date(2024, 1, 1), None);
        assert!(matches!(
            scope.validate(),
            Err(ReportError::InvalidRange { .. })
        ));

        let single_day = ReportScope::new(date(2024, 1, 1), date(2024, 1, 1), None);
        assert!(single_day.validate().is_ok());
        assert!(single_day.contains(date(2024, 1, 1)));
        assert!(!single_day.contains(date(2024, 1, 2)));
    }

    #[test]
    fn test_cell_mark_symbols() {
        assert_eq!(CellMark::default(), CellMark::Blank);
        assert_eq!(CellMark::Blank.symbol(), "");
        assert_eq!(CellMark::Absent.symbol(), "A");
    }
}
