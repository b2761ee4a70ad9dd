//! Per-student monthly totals
//!
//! Absences are counted from the grid; presences are inferred as the weekday
//! count minus absences. A row with more absence marks than weekday columns is
//! reported as an invariant violation instead of being clamped.

use crate::error::ReportError;
use crate::types::{CellMark, MonthlyGrid, ReportMonth, ReportScope, RowTotals};

/// Aggregator for monthly grid totals
pub struct Aggregator;

impl Aggregator {
    /// Compute totals for every row of `grid`
    pub fn aggregate(grid: MonthlyGrid, scope: &ReportScope) -> Result<ReportMonth, ReportError> {
        let weekdays = grid.weekdays.len();

        let totals = grid
            .rows
            .iter()
            .map(|row| {
                let absences = row
                    .cells
                    .iter()
                    .filter(|cell| **cell == CellMark::Absent)
                    .count();

                if row.cells.len() != weekdays || absences > weekdays {
                    return Err(ReportError::AggregationInvariantViolation {
                        scope: scope.clone(),
                        month: grid.month.label(),
                        student_key: row.student.student_key.clone(),
                        absences,
                        cells: row.cells.len(),
                        weekdays,
                    });
                }

                Ok(RowTotals {
                    absences,
                    presences: weekdays - absences,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReportMonth { grid, totals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CalendarMonth, GridRow, GridStatus, StudentRecord};
    use chrono::NaiveDate;

    fn scope() -> ReportScope {
        ReportScope::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            None,
        )
    }

    fn row(key: &str, cells: Vec<CellMark>) -> GridRow {
        GridRow {
            student: StudentRecord {
                student_key: key.to_string(),
                last_name: String::new(),
                first_name: String::new(),
                year: String::new(),
                section: String::new(),
                adviser: None,
                gender: None,
            },
            cells,
        }
    }

    fn grid(weekdays: Vec<u32>, rows: Vec<GridRow>) -> MonthlyGrid {
        MonthlyGrid {
            month: CalendarMonth::new(2024, 1),
            status: if weekdays.is_empty() {
                GridStatus::NoWeekdays
            } else {
                GridStatus::Populated
            },
            weekdays,
            rows,
        }
    }

    #[test]
    fn test_totals_sum_to_weekday_count() {
        use CellMark::{Absent as A, Blank as B};
        let month = Aggregator::aggregate(
            grid(
                vec![1, 2, 3, 4, 5],
                vec![row("S1", vec![A, B, A, B, B]), row("S2", vec![B; 5])],
            ),
            &scope(),
        )
        .unwrap();

        assert_eq!(
            month.totals,
            vec![
                RowTotals {
                    absences: 2,
                    presences: 3
                },
                RowTotals {
                    absences: 0,
                    presences: 5
                },
            ]
        );
        for totals in &month.totals {
            assert_eq!(totals.absences + totals.presences, 5);
        }
    }

    #[test]
    fn test_placeholder_grid_has_zero_totals() {
        let month = Aggregator::aggregate(grid(vec![], vec![row("S1", vec![])]), &scope()).unwrap();
        assert_eq!(month.totals, vec![RowTotals::default()]);
    }

    #[test]
    fn test_too_many_marks_is_an_invariant_violation() {
        let result = Aggregator::aggregate(
            grid(vec![1, 2], vec![row("S7", vec![CellMark::Absent; 3])]),
            &scope(),
        );

        match result {
            Err(ReportError::AggregationInvariantViolation {
                month,
                student_key,
                absences,
                weekdays,
                ..
            }) => {
                assert_eq!(month, "January-2024");
                assert_eq!(student_key, "S7");
                assert_eq!(absences, 3);
                assert_eq!(weekdays, 2);
            }
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn test_column_mismatch_reports_cell_count() {
        let result = Aggregator::aggregate(
            grid(vec![1, 2, 3], vec![row("S8", vec![CellMark::Blank; 2])]),
            &scope(),
        );

        match result {
            Err(
                err @ ReportError::AggregationInvariantViolation {
                    absences: 0,
                    cells: 2,
                    weekdays: 3,
                    ..
                },
            ) => {
                assert!(err.to_string().contains("0 absences in 2 cells over 3 weekday columns"));
            }
            other => panic!("expected column mismatch, got {other:?}"),
        }
    }
}
