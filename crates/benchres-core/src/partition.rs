//! Partitioned CSV writer.
//!
//! Takes records already in emission order ([`crate::sort_records`]) and
//! writes one file per [`PartitionKey`]. A file is opened when its first
//! record arrives and closed when the key changes, so the writer never holds
//! more than one handle.
//!
//! Column layout: [`PRE_COLUMNS`], one `workload_params.<name>` column per
//! parameter name in sorted order, then [`POST_COLUMNS`].

use crate::types::{PartitionKey, ResultRecord};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::path::PathBuf;

pub const PRE_COLUMNS: [&str; 10] = [
    "run_group",
    "engine",
    "engine_version",
    "environment",
    "benchmark_source",
    "snapshot_bucket",
    "snapshot_base_path",
    "workload",
    "workload_subtype",
    "test_procedure",
];

pub const POST_COLUMNS: [&str; 7] = [
    "shard_count",
    "replica_count",
    "run",
    "operation",
    "metric_name",
    "p50",
    "p90",
];

pub const PARAM_COLUMN_PREFIX: &str = "workload_params.";

/// Which records contribute parameter columns to a file's header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderScope {
    /// Every file carries the union across the whole input.
    #[default]
    Dataset,
    /// Each file carries the union across its own records.
    Partition,
}

#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("output directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("partition {0} reappeared after its file was closed; input is not in emission order")]
    Revisited(String),
    #[error("partitions {first} and {second} both map to file {file}")]
    NameCollision {
        file: String,
        first: String,
        second: String,
    },
    #[error("failed to write {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file produced by [`PartitionedCsvWriter::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub rows: usize,
}

/// Sorted union of parameter names across `records`.
pub fn param_names<'a>(records: impl IntoIterator<Item = &'a ResultRecord>) -> Vec<String> {
    records
        .into_iter()
        .flat_map(|r| r.workload_params.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Header row for a given parameter set.
pub fn header(params: &[String]) -> Vec<String> {
    PRE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(params.iter().map(|p| format!("{PARAM_COLUMN_PREFIX}{p}")))
        .chain(POST_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

pub struct PartitionedCsvWriter {
    dir: PathBuf,
    scope: HeaderScope,
}

impl PartitionedCsvWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scope: HeaderScope::default(),
        }
    }

    pub fn with_header_scope(mut self, scope: HeaderScope) -> Self {
        self.scope = scope;
        self
    }

    /// Write `records` (already in emission order) and return the files
    /// produced, in the order they were written.
    pub fn write(&self, records: &[ResultRecord]) -> Result<Vec<WrittenFile>, PartitionError> {
        if !self.dir.is_dir() {
            return Err(PartitionError::MissingDirectory(self.dir.clone()));
        }

        let dataset_params = match self.scope {
            HeaderScope::Dataset => param_names(records),
            HeaderScope::Partition => Vec::new(),
        };

        let mut written = Vec::new();
        let mut closed: HashSet<PartitionKey<'_>> = HashSet::new();
        let mut file_owners: HashMap<String, PartitionKey<'_>> = HashMap::new();
        let mut current: Option<OpenPartition<'_>> = None;

        for (i, record) in records.iter().enumerate() {
            let key = record.partition_key();
            let same = current.as_ref().is_some_and(|open| open.key == key);
            if !same {
                if let Some(done) = current.take() {
                    closed.insert(done.key);
                    written.push(done.finish()?);
                }
                if closed.contains(&key) {
                    return Err(PartitionError::Revisited(key.to_string()));
                }
                let file = key.file_name();
                if let Some(first) = file_owners.get(&file) {
                    return Err(PartitionError::NameCollision {
                        file,
                        first: first.to_string(),
                        second: key.to_string(),
                    });
                }
                file_owners.insert(file.clone(), key);
                let params = match self.scope {
                    HeaderScope::Dataset => dataset_params.clone(),
                    HeaderScope::Partition => param_names(
                        records[i..]
                            .iter()
                            .take_while(|r| r.partition_key() == key),
                    ),
                };
                current = Some(OpenPartition::create(self.dir.join(file), key, params)?);
            }
            if let Some(open) = current.as_mut() {
                open.write(record)?;
            }
        }

        if let Some(done) = current.take() {
            written.push(done.finish()?);
        }
        Ok(written)
    }
}

/// The single file currently being written.
struct OpenPartition<'a> {
    key: PartitionKey<'a>,
    path: PathBuf,
    params: Vec<String>,
    writer: csv::Writer<File>,
    rows: usize,
}

impl<'a> OpenPartition<'a> {
    fn create(
        path: PathBuf,
        key: PartitionKey<'a>,
        params: Vec<String>,
    ) -> Result<Self, PartitionError> {
        let mut writer = csv::Writer::from_path(&path).map_err(|source| PartitionError::Csv {
            path: path.clone(),
            source,
        })?;
        writer
            .write_record(header(&params))
            .map_err(|source| PartitionError::Csv {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), columns = params.len(), "opened partition file");
        Ok(Self {
            key,
            path,
            params,
            writer,
            rows: 0,
        })
    }

    fn write(&mut self, r: &ResultRecord) -> Result<(), PartitionError> {
        let run_group = r.run_group.to_string();
        let pre: [&str; 10] = [
            &run_group,
            &r.engine,
            &r.engine_version,
            &r.environment,
            &r.benchmark_source,
            r.snapshot_bucket.as_deref().unwrap_or(""),
            r.snapshot_base_path.as_deref().unwrap_or(""),
            &r.workload,
            &r.workload_subtype,
            &r.test_procedure,
        ];
        let params = self
            .params
            .iter()
            .map(|p| r.workload_params.get(p).map(String::as_str).unwrap_or(""));
        let post: [&str; 7] = [
            &r.shard_count,
            &r.replica_count,
            &r.run,
            &r.operation,
            &r.metric_name,
            &r.p50,
            &r.p90,
        ];

        self.writer
            .write_record(pre.into_iter().chain(params).chain(post))
            .map_err(|source| PartitionError::Csv {
                path: self.path.clone(),
                source,
            })?;
        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<WrittenFile, PartitionError> {
        self.writer.flush().map_err(|source| PartitionError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), rows = self.rows, "wrote partition file");
        Ok(WrittenFile {
            path: self.path,
            rows: self.rows,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
