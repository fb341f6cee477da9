use crate::{ReportError, ReportSink};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Keeps each sheet as `<dir>/<sheet>.csv`.
///
/// The first append to a sheet through a given sink replaces whatever file a
/// previous run left behind and writes the header. Later appends through the
/// same sink must carry the same header.
pub struct CsvReportSink {
    dir: PathBuf,
    started: Mutex<HashSet<String>>,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            started: Mutex::new(HashSet::new()),
        }
    }

    fn is_started(&self, sheet: &str) -> bool {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(sheet)
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }
}

fn existing_header(path: &Path) -> Result<Option<Vec<String>>, ReportError> {
    if !path.exists() {
        return Ok(None);
    }
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    match reader.records().next() {
        Some(record) => Ok(Some(record.map_err(csv_err)?.iter().map(str::to_string).collect())),
        None => Ok(None),
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn append_rows(
        &self,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), ReportError> {
        let path = self.sheet_path(sheet);
        let started = self.is_started(sheet);
        let existing = if started { existing_header(&path)? } else { None };
        if let Some(existing) = &existing {
            if existing.as_slice() != header {
                return Err(ReportError::HeaderMismatch {
                    sheet: sheet.to_string(),
                    existing: existing.clone(),
                    requested: header.to_vec(),
                });
            }
        }

        let mut options = OpenOptions::new();
        if started {
            options.create(true).append(true);
        } else {
            options.create(true).write(true).truncate(true);
        }
        let file = options
            .open(&path)
            .map_err(|source| ReportError::Io {
                path: path.clone(),
                source,
            })?;
        let csv_err = |source| ReportError::Csv {
            path: path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_writer(file);
        if existing.is_none() {
            writer.write_record(header).map_err(csv_err)?;
        }
        for row in rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sheet.to_string());
        tracing::info!(sheet, rows = rows.len(), path = %path.display(), "appended report rows");
        Ok(())
    }
}
