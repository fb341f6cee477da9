//! Raw dump of heterogeneous flattened documents to a single CSV.
//!
//! The header is fixed up front, usually from field discovery over a sample.
//! Fields outside that header are dropped; [`RawCsvWriter::write`] reports
//! when it happens so the caller can count the affected documents.

use crate::flatten::{render_value, FlatDocument};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct RawWriteError {
    path: PathBuf,
    #[source]
    source: csv::Error,
}

pub struct RawCsvWriter {
    path: PathBuf,
    fields: Vec<String>,
    known: HashSet<String>,
    writer: csv::Writer<File>,
    rows: usize,
}

impl RawCsvWriter {
    /// Create `path` and write `fields` as the header.
    pub fn create(path: &Path, fields: Vec<String>) -> Result<Self, RawWriteError> {
        let err = |source| RawWriteError {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(err)?;
        writer.write_record(&fields).map_err(err)?;
        Ok(Self {
            path: path.to_path_buf(),
            known: fields.iter().cloned().collect(),
            fields,
            writer,
            rows: 0,
        })
    }

    /// Write one document. Returns `true` if it carried fields that are not
    /// in the header.
    pub fn write(&mut self, doc: &FlatDocument) -> Result<bool, RawWriteError> {
        let row = self.fields.iter().map(|field| {
            doc.get(field)
                .and_then(render_value)
                .unwrap_or_default()
        });
        self.writer.write_record(row).map_err(|source| RawWriteError {
            path: self.path.clone(),
            source,
        })?;
        self.rows += 1;
        Ok(doc.keys().any(|k| !self.known.contains(k)))
    }

    /// Flush and close; returns the number of data rows written.
    pub fn finish(mut self) -> Result<usize, RawWriteError> {
        self.writer.flush().map_err(|source| RawWriteError {
            path: self.path.clone(),
            source: source.into(),
        })?;
        Ok(self.rows)
    }
}
