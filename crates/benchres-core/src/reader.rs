//! Read partitioned CSV files back into [`ResultRecord`]s.
//!
//! Columns are located by header name, so files written with either
//! [`HeaderScope`](crate::HeaderScope) read back the same way. Empty
//! parameter and snapshot cells read back as absent.

use crate::partition::{PARAM_COLUMN_PREFIX, POST_COLUMNS, PRE_COLUMNS};
use crate::types::{ResultRecord, RunGroup};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no `{column}` column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{} line {line}: invalid run group {value:?}", path.display())]
    InvalidRunGroup {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// Read every `*.csv` file in `dir`, in file-name order.
pub fn read_partition_dir(dir: &Path) -> Result<Vec<ResultRecord>, ReadError> {
    let io_err = |source| ReadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        records.extend(read_partition_file(&path)?);
    }
    Ok(records)
}

/// Read one partition file.
pub fn read_partition_file(path: &Path) -> Result<Vec<ResultRecord>, ReadError> {
    let csv_err = |source| ReadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let by_name: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let column = |name: &'static str| {
        by_name
            .get(name)
            .copied()
            .ok_or_else(|| ReadError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
    };
    let pre = PRE_COLUMNS.map(column);
    let post = POST_COLUMNS.map(column);
    let [run_group, engine, engine_version, environment, benchmark_source, snapshot_bucket, snapshot_base_path, workload, workload_subtype, test_procedure] =
        collect_columns(pre)?;
    let [shard_count, replica_count, run, operation, metric_name, p50, p90] =
        collect_columns(post)?;
    let params: Vec<(String, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| {
            h.strip_prefix(PARAM_COLUMN_PREFIX)
                .map(|name| (name.to_string(), i))
        })
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let cell = |i: usize| row.get(i).unwrap_or("").to_string();
        let optional = |i: usize| Some(cell(i)).filter(|v| !v.is_empty());

        let group_text = cell(run_group);
        let group = RunGroup::parse(&group_text).map_err(|_| ReadError::InvalidRunGroup {
            path: path.to_path_buf(),
            line: row.position().map(|p| p.line()).unwrap_or(0),
            value: group_text.clone(),
        })?;

        records.push(ResultRecord {
            run_group: group,
            engine: cell(engine),
            engine_version: cell(engine_version),
            environment: cell(environment),
            benchmark_source: cell(benchmark_source),
            run: cell(run),
            snapshot_bucket: optional(snapshot_bucket),
            snapshot_base_path: optional(snapshot_base_path),
            workload: cell(workload),
            workload_subtype: cell(workload_subtype),
            test_procedure: cell(test_procedure),
            workload_params: params
                .iter()
                .filter_map(|(name, i)| optional(*i).map(|v| (name.clone(), v)))
                .collect::<BTreeMap<_, _>>(),
            shard_count: cell(shard_count),
            replica_count: cell(replica_count),
            operation: cell(operation),
            metric_name: cell(metric_name),
            p50: cell(p50),
            p90: cell(p90),
        });
    }
    Ok(records)
}

fn collect_columns<const N: usize>(
    columns: [Result<usize, ReadError>; N],
) -> Result<[usize; N], ReadError> {
    let mut out = [0; N];
    for (slot, column) in out.iter_mut().zip(columns) {
        *slot = column?;
    }
    Ok(out)
}
