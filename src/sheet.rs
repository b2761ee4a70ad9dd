//! Sheet assembly
//!
//! Lays out one report month as an abstract table: two header rows followed
//! by one data row per student. Day columns are always in ascending calendar
//! order so the sheet reads chronologically left to right.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::weekday_abbreviation;
use crate::types::{ReportDocument, ReportMonth};

/// Identity column labels, in column order
pub const IDENTITY_HEADERS: [&str; 5] = ["LRN", "Last Name", "First Name", "Year", "Section"];

/// Total column labels, in column order
pub const TOTAL_HEADERS: [&str; 2] = ["Total Absences", "Total Presences"];

/// A single sheet cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetCell {
    Number(u64),
    Text(String),
}

impl SheetCell {
    pub fn empty() -> Self {
        SheetCell::Text(String::new())
    }

    pub fn text(value: impl Into<String>) -> Self {
        SheetCell::Text(value.into())
    }

    /// Render the cell as plain text
    pub fn render(&self) -> String {
        match self {
            SheetCell::Number(n) => n.to_string(),
            SheetCell::Text(s) => s.clone(),
        }
    }
}

/// One month laid out for a tabular writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet name, "MonthName-Year"
    pub label: String,
    /// Exactly two rows: weekday abbreviations, then column labels
    pub header_rows: Vec<Vec<SheetCell>>,
    pub data_rows: Vec<Vec<SheetCell>>,
}

impl Sheet {
    pub fn column_count(&self) -> usize {
        self.header_rows.get(1).map(Vec::len).unwrap_or(0)
    }

    /// All rows in writing order: headers first, data from the third row on
    pub fn rows(&self) -> impl Iterator<Item = &Vec<SheetCell>> {
        self.header_rows.iter().chain(self.data_rows.iter())
    }
}

/// Assembler for report sheets
pub struct SheetAssembler;

impl SheetAssembler {
    /// Assemble every month of a document, in document order
    pub fn assemble_document(document: &ReportDocument) -> Vec<Sheet> {
        document.months.iter().map(Self::assemble).collect()
    }

    /// Assemble a single month
    pub fn assemble(month: &ReportMonth) -> Sheet {
        let grid = &month.grid;
        let calendar_month = grid.month;

        let mut weekday_row: Vec<SheetCell> = vec![SheetCell::empty(); IDENTITY_HEADERS.len()];
        let mut label_row: Vec<SheetCell> =
            IDENTITY_HEADERS.iter().map(|h| SheetCell::text(*h)).collect();

        for &day in &grid.weekdays {
            let abbreviation = NaiveDate::from_ymd_opt(calendar_month.year, calendar_month.month, day)
                .map(|date| weekday_abbreviation(date.weekday()))
                .unwrap_or_default();
            weekday_row.push(SheetCell::text(abbreviation));
            label_row.push(SheetCell::Number(u64::from(day)));
        }

        weekday_row.extend(std::iter::repeat(SheetCell::empty()).take(TOTAL_HEADERS.len()));
        label_row.extend(TOTAL_HEADERS.iter().map(|h| SheetCell::text(*h)));

        let data_rows = grid
            .rows
            .iter()
            .zip(month.totals.iter())
            .map(|(row, totals)| {
                let student = &row.student;
                let mut cells = vec![
                    SheetCell::text(student.student_key.as_str()),
                    SheetCell::text(student.last_name.as_str()),
                    SheetCell::text(student.first_name.as_str()),
                    SheetCell::text(student.year.as_str()),
                    SheetCell::text(student.section.as_str()),
                ];
                cells.extend(row.cells.iter().map(|mark| SheetCell::text(mark.symbol())));
                cells.push(SheetCell::Number(totals.absences as u64));
                cells.push(SheetCell::Number(totals.presences as u64));
                cells
            })
            .collect();

        Sheet {
            label: calendar_month.label(),
            header_rows: vec![weekday_row, label_row],
            data_rows,
        }
    }
}
