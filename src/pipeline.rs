//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It runs the full
//! pipeline from raw records to a report document plus statistics, and hands
//! finished sheets to a writer.

use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::calendar::MonthSegmenter;
use crate::encoder::ReportEncoder;
use crate::error::ReportError;
use crate::matrix::MatrixBuilder;
use crate::normalizer::RecordNormalizer;
use crate::roster::StudentIndex;
use crate::sheet::{Sheet, SheetAssembler};
use crate::source::{InMemorySource, RecordSource};
use crate::statistics::StatisticsSummarizer;
use crate::types::{
    MalformedRecord, RawRecord, ReportDocument, ReportScope, StatisticsSummary, StudentRecord,
};
use crate::writer::SheetWriter;

/// Everything one report request produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceReport {
    pub scope: ReportScope,
    pub document: ReportDocument,
    pub statistics: StatisticsSummary,
    /// Fixed row set shared by every month
    pub students: Vec<StudentRecord>,
    /// Records dropped during normalization
    pub malformed: Vec<MalformedRecord>,
}

impl AttendanceReport {
    /// Sheets in document order
    pub fn sheets(&self) -> Vec<Sheet> {
        SheetAssembler::assemble_document(&self.document)
    }
}

/// Build a report from already-fetched raw records.
///
/// Events dated outside the scope's window are dropped after normalization,
/// so they never create rows or reach the statistics. The section filter is
/// left to the `RecordSource`; use `generate_report` when it must be applied.
///
/// Pipeline stages:
/// 1. ReportScope::validate - Reject reversed ranges before any processing
/// 2. RecordNormalizer - Parse raw records, count malformed ones, keep the window
/// 3. StudentIndex - One row per student across the whole range
/// 4. MonthSegmenter - Months overlapping the range and their weekdays
/// 5. MatrixBuilder + Aggregator - Absence grid and totals per month
/// 6. StatisticsSummarizer - Counts over the full event set
pub fn build_report(
    records: &[RawRecord],
    scope: &ReportScope,
) -> Result<AttendanceReport, ReportError> {
    // Stage 1: Validate the request
    scope.validate()?;

    // Stage 2: Normalize records
    let mut batch = RecordNormalizer::normalize(records);
    let normalized = batch.events.len();
    batch.events.retain(|event| scope.contains(event.date()));
    if batch.events.len() < normalized {
        debug!(
            dropped = normalized - batch.events.len(),
            %scope,
            "dropped events outside the report window"
        );
    }

    // Stage 3: Index students over the full range
    let students = StudentIndex::build(&batch.events);

    // Stage 4: Segment the range into months
    let months = MonthSegmenter::segment(scope)?;

    // Stage 5: Build and aggregate each month's grid
    let mut document = ReportDocument::default();
    for month in months {
        let weekdays = MonthSegmenter::weekdays(month);
        let grid = MatrixBuilder::build(month, &weekdays, &students, &batch.events);
        document.months.push(Aggregator::aggregate(grid, scope)?);
    }

    // Stage 6: Summarize the full event set
    let statistics = StatisticsSummarizer::summarize(&batch.events);

    info!(
        %scope,
        months = document.months.len(),
        students = students.len(),
        events = batch.events.len(),
        malformed = batch.malformed.len(),
        "built attendance report"
    );

    Ok(AttendanceReport {
        scope: scope.clone(),
        document,
        statistics,
        students,
        malformed: batch.malformed,
    })
}

/// Fetch records from `source` and build the report.
///
/// The range is validated before the source is queried; a fetch failure is
/// fatal to the whole request.
pub fn generate_report(
    source: &dyn RecordSource,
    scope: &ReportScope,
) -> Result<AttendanceReport, ReportError> {
    scope.validate()?;
    let records = source.fetch(scope)?;
    build_report(&records, scope)
}

/// Hand every month to `writer`, in document order. Returns the sheet count.
pub fn write_report(
    report: &AttendanceReport,
    writer: &mut dyn SheetWriter,
) -> Result<usize, ReportError> {
    let sheets = report.sheets();
    for sheet in &sheets {
        writer.write_sheet(sheet)?;
    }
    Ok(sheets.len())
}

/// Convert a JSON array of raw records into an encoded report envelope (stateless, one-shot).
///
/// Records are selected through an `InMemorySource`, so the window and the
/// section filter apply exactly as they would for a remote store.
///
/// # Example
/// ```ignore
/// let json = records_to_report_json(&records_json, &scope)?;
/// ```
pub fn records_to_report_json(
    records_json: &str,
    scope: &ReportScope,
) -> Result<String, ReportError> {
    scope.validate()?;
    let source = InMemorySource::from_json(records_json)?;
    let report = generate_report(&source, scope)?;
    ReportEncoder::new().encode_to_json(&report)
}

/// Report engine bound to a data-acquisition collaborator.
///
/// Holds no state between requests beyond the injected source and encoder.
pub struct ReportEngine<S: RecordSource> {
    source: S,
    encoder: ReportEncoder,
}

impl<S: RecordSource> ReportEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            encoder: ReportEncoder::new(),
        }
    }

    pub fn with_encoder(source: S, encoder: ReportEncoder) -> Self {
        Self { source, encoder }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and build a report
    pub fn generate(&self, scope: &ReportScope) -> Result<AttendanceReport, ReportError> {
        generate_report(&self.source, scope)
    }

    /// Fetch, build and write a report. Nothing reaches the writer unless the
    /// whole document was built.
    pub fn generate_and_write(
        &self,
        scope: &ReportScope,
        writer: &mut dyn SheetWriter,
    ) -> Result<AttendanceReport, ReportError> {
        let report = self.generate(scope)?;
        let written = write_report(&report, writer)?;
        info!(sheets = written, %scope, "wrote attendance report");
        Ok(report)
    }

    /// Fetch, build and encode a report as JSON
    pub fn generate_json(&self, scope: &ReportScope) -> Result<String, ReportError> {
        let report = self.generate(scope)?;
        self.encoder.encode_to_json(&report)
    }
}
