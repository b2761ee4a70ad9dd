//! Student roster
//!
//! Builds the fixed row set shared by every month of a report: one
//! `StudentRecord` per distinct student key seen anywhere in the event set.
//!
//! When events disagree on identity fields for the same key, the event with
//! the latest timestamp wins. Equal timestamps fall back to the greatest
//! identity tuple, so the outcome never depends on input order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{AttendanceEvent, StudentRecord};

/// Index of unique students, ordered by student key
pub struct StudentIndex;

impl StudentIndex {
    /// Deduplicate events into one record per student key
    pub fn build(events: &[AttendanceEvent]) -> Vec<StudentRecord> {
        let mut winners: BTreeMap<&str, &AttendanceEvent> = BTreeMap::new();

        for event in events {
            winners
                .entry(event.student_key.as_str())
                .and_modify(|current| {
                    if supersedes(event, *current) {
                        *current = event;
                    }
                })
                .or_insert(event);
        }

        let students: Vec<StudentRecord> =
            winners.into_values().map(StudentRecord::from).collect();
        debug!(students = students.len(), "indexed students");
        students
    }
}

fn supersedes(candidate: &AttendanceEvent, current: &AttendanceEvent) -> bool {
    (candidate.timestamp, identity(candidate)) > (current.timestamp, identity(current))
}

fn identity(event: &AttendanceEvent) -> (&str, &str, &str, &str, Option<&str>, Option<&str>) {
    (
        event.last_name.as_str(),
        event.first_name.as_str(),
        event.year.as_str(),
        event.section.as_str(),
        event.adviser.as_deref(),
        event.gender.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn event(key: &str, day: u32, hour: u32, section: &str, last_name: &str) -> AttendanceEvent {
        AttendanceEvent {
            student_key: key.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            is_absent: false,
            section: section.to_string(),
            year: "11".to_string(),
            last_name: last_name.to_string(),
            first_name: "Ana".to_string(),
            adviser: None,
            gender: None,
        }
    }

    #[test]
    fn test_one_record_per_key_sorted_by_key() {
        let events = vec![
            event("S2", 3, 8, "Rizal", "Reyes"),
            event("S1", 3, 8, "Rizal", "Santos"),
            event("S2", 4, 8, "Rizal", "Reyes"),
        ];

        let students = StudentIndex::build(&events);
        let keys: Vec<&str> = students.iter().map(|s| s.student_key.as_str()).collect();
        assert_eq!(keys, vec!["S1", "S2"]);
    }

    #[test]
    fn test_latest_timestamp_wins_identity_conflict() {
        let events = vec![
            event("S1", 10, 8, "Bonifacio", "Santos-Cruz"),
            event("S1", 3, 8, "Rizal", "Santos"),
        ];

        let students = StudentIndex::build(&events);
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].section, "Bonifacio");
        assert_eq!(students[0].last_name, "Santos-Cruz");
    }

    #[test]
    fn test_tie_break_is_independent_of_input_order() {
        let a = event("S1", 3, 8, "Rizal", "Santos");
        let b = event("S1", 3, 8, "Bonifacio", "Santos");

        let forward = StudentIndex::build(&[a.clone(), b.clone()]);
        let backward = StudentIndex::build(&[b, a]);

        assert_eq!(forward, backward);
        assert_eq!(forward[0].section, "Rizal");
    }

    #[test]
    fn test_empty_events_yield_empty_roster() {
        assert!(StudentIndex::build(&[]).is_empty());
    }
}
