//! Summary statistics
//!
//! Counts over the full normalized event set, independent of the month grids.
//! Weekend events and students outside the roster are still counted here.

use crate::types::{AttendanceEvent, StatisticsSummary};

/// Summarizer for event-level statistics
pub struct StatisticsSummarizer;

impl StatisticsSummarizer {
    pub fn summarize(events: &[AttendanceEvent]) -> StatisticsSummary {
        let mut summary = StatisticsSummary {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events {
            if !event.is_weekday() {
                summary.weekend_events += 1;
            }

            if event.is_absent {
                summary.total_absences += 1;
                *summary
                    .absences_by_year
                    .entry(event.year.clone())
                    .or_insert(0) += 1;
                *summary
                    .absences_by_section
                    .entry(event.section.clone())
                    .or_insert(0) += 1;
            } else {
                summary.total_presences += 1;
            }
        }

        summary
    }
}
