//! Sheet writers
//!
//! A `SheetWriter` renders assembled sheets into a concrete tabular format,
//! one sheet per report month, in document order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ReportError;
use crate::sheet::Sheet;

/// Trait for tabular-file writer collaborators
pub trait SheetWriter {
    /// Write one sheet; headers occupy the first two rows, data starts at row three
    fn write_sheet(&mut self, sheet: &Sheet) -> Result<(), ReportError>;
}

/// Writes each sheet as `<label>.csv` inside a directory.
///
/// The directory is created on the first write, so a request that fails
/// before reaching the writer leaves nothing on disk.
pub struct CsvSheetWriter {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvSheetWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            written: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Paths of the files written so far, in writing order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl SheetWriter for CsvSheetWriter {
    fn write_sheet(&mut self, sheet: &Sheet) -> Result<(), ReportError> {
        let path = self.directory.join(format!("{}.csv", sheet.label));
        let write_error = |message: String| ReportError::WriteError {
            sheet: sheet.label.clone(),
            message,
        };

        if self.written.is_empty() {
            fs::create_dir_all(&self.directory).map_err(|e| write_error(e.to_string()))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| write_error(e.to_string()))?;

        for row in sheet.rows() {
            writer
                .write_record(row.iter().map(|cell| cell.render()))
                .map_err(|e| write_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| write_error(e.to_string()))?;

        debug!(sheet = %sheet.label, path = %path.display(), "wrote csv sheet");
        self.written.push(path);
        Ok(())
    }
}

/// Collects sheets in memory
#[derive(Debug, Default)]
pub struct MemorySheetWriter {
    pub sheets: Vec<Sheet>,
}

impl SheetWriter for MemorySheetWriter {
    fn write_sheet(&mut self, sheet: &Sheet) -> Result<(), ReportError> {
        self.sheets.push(sheet.clone());
        Ok(())
    }
}
