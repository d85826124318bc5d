//! Durable report storage

use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::report::Report;

/// Header row written once per CSV file
pub const CSV_HEADER: [&str; 4] = ["Timestamp", "Text", "SHA-256 Hash", "Rarity"];

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What an append wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkReceipt {
    pub rows: usize,
    pub header_written: bool,
}

/// Destination for finished reports
pub trait ReportSink {
    /// Human-readable location, for summaries
    fn location(&self) -> String;

    /// Append every entry of `report`, in order
    fn append(&mut self, report: &Report) -> Result<SinkReceipt, SinkError>;
}

/// Appends report rows to a CSV file, writing the header only when the
/// file is new (missing or empty)
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ReportSink for CsvReportSink {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn append(&mut self, report: &Report) -> Result<SinkReceipt, SinkError> {
        let is_new = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(self.io_error(e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);

        if is_new {
            write_row(&mut writer, &CSV_HEADER).map_err(|e| self.io_error(e))?;
            debug!(path = %self.path.display(), "Wrote CSV header");
        }

        let timestamp = report.timestamp_label();
        for hit in &report.entries {
            write_row(
                &mut writer,
                &[timestamp.as_str(), hit.text(), hit.digest().as_str(), hit.rarity().label()],
            )
            .map_err(|e| self.io_error(e))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        info!(
            rows = report.entries.len(),
            path = %self.path.display(),
            "Appended amulets"
        );
        Ok(SinkReceipt {
            rows: report.entries.len(),
            header_written: is_new,
        })
    }
}

fn write_row<W: Write>(writer: &mut W, fields: &[&str]) -> std::io::Result<()> {
    let line = fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",");
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r\n")
}

/// Quote a CSV field when it holds a delimiter, quote or line break
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
