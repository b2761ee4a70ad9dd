//! Report encoding
//!
//! This module wraps a finished report into a self-describing JSON envelope:
//! producer metadata, request provenance, diagnostics, statistics and the
//! assembled sheets.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReportError;
use crate::pipeline::AttendanceReport;
use crate::sheet::{Sheet, SheetAssembler};
use crate::types::{GridStatus, MalformedRecord, StatisticsSummary};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current report envelope version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Request provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub start: String,
    pub end: String,
    pub section: Option<String>,
    pub computed_at_utc: String,
}

/// Diagnostics gathered while normalizing records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDiagnostics {
    pub malformed_count: usize,
    pub malformed_records: Vec<MalformedRecord>,
}

/// One encoded month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedSheet {
    pub status: GridStatus,
    #[serde(flatten)]
    pub sheet: Sheet,
}

/// Complete report envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub diagnostics: ReportDiagnostics,
    pub statistics: StatisticsSummary,
    pub sheets: Vec<EncodedSheet>,
}

/// Encoder for report envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, report: &AttendanceReport) -> ReportPayload {
        let scope = &report.scope;

        let sheets = report
            .document
            .months
            .iter()
            .map(|month| EncodedSheet {
                status: month.grid.status,
                sheet: SheetAssembler::assemble(month),
            })
            .collect();

        ReportPayload {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: ReportProvenance {
                start: scope.start.to_string(),
                end: scope.end.to_string(),
                section: scope.section.clone(),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            diagnostics: ReportDiagnostics {
                malformed_count: report.malformed.len(),
                malformed_records: report.malformed.clone(),
            },
            statistics: report.statistics.clone(),
            sheets,
        }
    }

    /// Encode to compact JSON
    pub fn encode_to_json(&self, report: &AttendanceReport) -> Result<String, ReportError> {
        serde_json::to_string(&self.encode(report))
            .map_err(|e| ReportError::EncodingError(e.to_string()))
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json_pretty(&self, report: &AttendanceReport) -> Result<String, ReportError> {
        serde_json::to_string_pretty(&self.encode(report))
            .map_err(|e| ReportError::EncodingError(e.to_string()))
    }
}
