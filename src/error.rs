//! Error types for the attendance matrix engine

use thiserror::Error;

use crate::types::ReportScope;

/// Errors that can occur while building or emitting a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid date range: start is after end ({scope})")]
    InvalidRange { scope: ReportScope },

    #[error(
        "Aggregation invariant violated for student {student_key} in {month}: \
         {absences} absences in {cells} cells over {weekdays} weekday columns ({scope})"
    )]
    AggregationInvariantViolation {
        scope: ReportScope,
        month: String,
        student_key: String,
        absences: usize,
        /// Cells in the offending row; differs from `weekdays` on a column mismatch
        cells: usize,
        weekdays: usize,
    },

    #[error("Failed to acquire attendance records ({scope}): {message}")]
    Acquisition { scope: ReportScope, message: String },

    #[error("Failed to parse records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Failed to write sheet {sheet}: {message}")]
    WriteError { sheet: String, message: String },
}

impl ReportError {
    /// Scope of the request that failed, when the error is request-level
    pub fn scope(&self) -> Option<&ReportScope> {
        match self {
            ReportError::InvalidRange { scope }
            | ReportError::AggregationInvariantViolation { scope, .. }
            | ReportError::Acquisition { scope, .. } => Some(scope),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_messages_carry_scope() {
        let scope = ReportScope {
            start: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            section: Some("Rizal".to_string()),
        };
        let err = ReportError::InvalidRange {
            scope: scope.clone(),
        };

        let message = err.to_string();
        assert!(message.contains("2024-02-15..2024-01-01"));
        assert!(message.contains("section Rizal"));
        assert_eq!(err.scope(), Some(&scope));
    }

    #[test]
    fn test_invariant_violation_names_month_and_student() {
        let err = ReportError::AggregationInvariantViolation {
            scope: ReportScope {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                section: None,
            },
            month: "January-2024".to_string(),
            student_key: "S1".to_string(),
            absences: 24,
            cells: 24,
            weekdays: 23,
        };

        let message = err.to_string();
        assert!(message.contains("January-2024"));
        assert!(message.contains("S1"));
        assert!(message.contains("24 cells over 23 weekday columns"));
        assert!(message.contains("all sections"));
    }
}
