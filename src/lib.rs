//! Attendance Matrix - Report engine for school attendance records
//!
//! The engine turns a batch of raw attendance records into a month-by-month
//! absence matrix through a deterministic pipeline: record normalization →
//! student indexing → month segmentation → grid construction → totals
//! aggregation → sheet assembly.
//!
//! ## Modules
//!
//! - **Pipeline**: Build reports from raw records or a `RecordSource`
//! - **Writers**: Hand finished sheets to a `SheetWriter` (CSV directory, memory)
//! - **Encoder**: Wrap a report in a JSON envelope with provenance
//! - **FFI**: C entry points for a hosting desktop application

pub mod aggregator;
pub mod calendar;
pub mod encoder;
pub mod error;
pub mod matrix;
pub mod normalizer;
pub mod pipeline;
pub mod roster;
pub mod sheet;
pub mod source;
pub mod statistics;
pub mod types;
pub mod writer;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use encoder::{ReportEncoder, ReportPayload, REPORT_VERSION};
pub use error::ReportError;
pub use pipeline::{
    build_report, generate_report, records_to_report_json, write_report, AttendanceReport,
    ReportEngine,
};
pub use sheet::{Sheet, SheetAssembler, SheetCell};
pub use source::{InMemorySource, RecordSource};
pub use types::{RawRecord, ReportDocument, ReportScope, StatisticsSummary};
pub use writer::{CsvSheetWriter, MemorySheetWriter, SheetWriter};

/// Engine version embedded in every report envelope
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report envelopes
pub const PRODUCER_NAME: &str = "attendance-matrix";
