//! Absence matrix construction
//!
//! Builds one month's grid of student rows by weekday columns. Absence is the
//! only positive mark: every cell starts blank, absence events flip their cell
//! to absent, and presence events never touch the grid.

use std::collections::{BTreeSet, HashMap};

use chrono::Datelike;
use tracing::debug;

use crate::types::{
    AttendanceEvent, CalendarMonth, CellMark, GridRow, GridStatus, MonthlyGrid, StudentRecord,
};

/// Builder for monthly absence grids
pub struct MatrixBuilder;

impl MatrixBuilder {
    /// Build the grid for `month` over the fixed student row set
    pub fn build(
        month: CalendarMonth,
        weekdays: &[u32],
        students: &[StudentRecord],
        events: &[AttendanceEvent],
    ) -> MonthlyGrid {
        let absent_days = group_absences(month, events);

        let rows: Vec<GridRow> = students
            .iter()
            .map(|student| {
                let days = absent_days.get(student.student_key.as_str());
                let cells = weekdays
                    .iter()
                    .map(|day| match days {
                        Some(days) if days.contains(day) => CellMark::Absent,
                        _ => CellMark::Blank,
                    })
                    .collect();
                GridRow {
                    student: student.clone(),
                    cells,
                }
            })
            .collect();

        let status = if weekdays.is_empty() {
            GridStatus::NoWeekdays
        } else {
            GridStatus::Populated
        };

        debug!(
            month = %month,
            students = rows.len(),
            columns = weekdays.len(),
            "built absence grid"
        );

        MonthlyGrid {
            month,
            weekdays: weekdays.to_vec(),
            rows,
            status,
        }
    }
}

/// Absent days of `month` grouped by student key.
///
/// The day sets deduplicate repeated absence events for the same
/// (student, day), which keeps marking idempotent.
fn group_absences(
    month: CalendarMonth,
    events: &[AttendanceEvent],
) -> HashMap<&str, BTreeSet<u32>> {
    let mut grouped: HashMap<&str, BTreeSet<u32>> = HashMap::new();

    for event in events
        .iter()
        .filter(|e| e.is_absent && CalendarMonth::of(e.date()) == month)
    {
        grouped
            .entry(event.student_key.as_str())
            .or_default()
            .insert(event.date().day());
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MonthSegmenter;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn student(key: &str) -> StudentRecord {
        StudentRecord {
            student_key: key.to_string(),
            last_name: format!("Last {key}"),
            first_name: format!("First {key}"),
            year: "11".to_string(),
            section: "Rizal".to_string(),
            adviser: None,
            gender: None,
        }
    }

    fn event(key: &str, y: i32, m: u32, d: u32, is_absent: bool) -> AttendanceEvent {
        AttendanceEvent {
            student_key: key.to_string(),
            timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            is_absent,
            section: "Rizal".to_string(),
            year: "11".to_string(),
            last_name: format!("Last {key}"),
            first_name: format!("First {key}"),
            adviser: None,
            gender: None,
        }
    }

    fn january() -> (CalendarMonth, Vec<u32>) {
        let month = CalendarMonth::new(2024, 1);
        (month, MonthSegmenter::weekdays(month))
    }

    #[test]
    fn test_absences_marked_on_weekday_columns() {
        let (month, weekdays) = january();
        let students = vec![student("S1"), student("S2")];
        let events = vec![
            event("S1", 2024, 1, 3, true),
            event("S1", 2024, 1, 10, true),
            event("S2", 2024, 1, 3, false),
        ];

        let grid = MatrixBuilder::build(month, &weekdays, &students, &events);

        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.status, GridStatus::Populated);
        assert_eq!(grid.cell("S1", 3), Some(CellMark::Absent));
        assert_eq!(grid.cell("S1", 10), Some(CellMark::Absent));
        assert_eq!(grid.cell("S1", 4), Some(CellMark::Blank));
        assert!(grid.rows[1].cells.iter().all(|c| *c == CellMark::Blank));
    }

    #[test]
    fn test_duplicate_absences_are_idempotent() {
        let (month, weekdays) = january();
        let students = vec![student("S1")];
        let once = vec![event("S1", 2024, 1, 3, true)];
        let twice = vec![event("S1", 2024, 1, 3, true), event("S1", 2024, 1, 3, true)];

        assert_eq!(
            MatrixBuilder::build(month, &weekdays, &students, &once),
            MatrixBuilder::build(month, &weekdays, &students, &twice)
        );
    }

    #[test]
    fn test_presence_does_not_clear_absence() {
        let (month, weekdays) = january();
        let students = vec![student("S1")];
        let events = vec![event("S1", 2024, 1, 3, true), event("S1", 2024, 1, 3, false)];

        let grid = MatrixBuilder::build(month, &weekdays, &students, &events);
        assert_eq!(grid.cell("S1", 3), Some(CellMark::Absent));
    }

    #[test]
    fn test_weekend_and_other_month_events_are_ignored() {
        let (month, weekdays) = january();
        let students = vec![student("S1")];
        let events = vec![
            // Saturday
            event("S1", 2024, 1, 6, true),
            // February
            event("S1", 2024, 2, 5, true),
        ];

        let grid = MatrixBuilder::build(month, &weekdays, &students, &events);
        assert_eq!(grid.cell("S1", 6), None);
        assert!(grid.rows[0].cells.iter().all(|c| *c == CellMark::Blank));
    }

    #[test]
    fn test_student_without_events_gets_blank_row() {
        let (month, weekdays) = january();
        let students = vec![student("S1"), student("S9")];
        let events = vec![event("S1", 2024, 1, 3, true)];

        let grid = MatrixBuilder::build(month, &weekdays, &students, &events);
        assert_eq!(grid.rows[1].student.student_key, "S9");
        assert_eq!(grid.rows[1].cells.len(), 23);
    }

    #[test]
    fn test_empty_weekday_set_yields_placeholder() {
        let month = CalendarMonth::new(2024, 1);
        let students = vec![student("S1")];
        let events = vec![event("S1", 2024, 1, 3, true)];

        let grid = MatrixBuilder::build(month, &[], &students, &events);
        assert!(grid.is_placeholder());
        assert_eq!(grid.rows.len(), 1);
        assert!(grid.rows[0].cells.is_empty());
    }
}
