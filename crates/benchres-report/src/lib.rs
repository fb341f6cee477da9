//! benchres-report: destinations for summary rows.
//!
//! A [`ReportSink`] appends rows to a named sheet. [`RetryingSink`] wraps any
//! sink and retries calls the destination rejected for rate limiting.
//! [`CsvReportSink`] keeps each sheet as a local CSV file.

use async_trait::async_trait;
use std::path::PathBuf;

pub mod csv_sink;
pub mod retry;

pub use csv_sink::CsvReportSink;
pub use retry::{RetryPolicy, RetryingSink};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("rate limited while writing sheet {sheet}")]
    RateLimited { sheet: String },
    #[error("sheet {sheet} already has header {existing:?}, refusing to append rows for {requested:?}")]
    HeaderMismatch {
        sheet: String,
        existing: Vec<String>,
        requested: Vec<String>,
    },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ReportError {
    /// Whether waiting and trying again can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::RateLimited { .. })
    }
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Append `rows` to `sheet`, writing `header` first if the sheet is new.
    async fn append_rows(
        &self,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), ReportError>;
}
