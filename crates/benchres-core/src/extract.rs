//! Extractor: one flattened store document into one [`ResultRecord`].
//!
//! Required fields are validated here and nowhere else. A document missing
//! any of them is rejected outright; emitting a partial record would skew
//! every statistic computed downstream without any visible trace.

use crate::flatten::{render_value, FlatDocument};
use crate::types::{ResultRecord, RunGroup};
use std::collections::BTreeMap;

/// Dotted document paths read by the extractor.
pub mod fields {
    pub const RUN_GROUP: &str = "user-tags.run-group";
    pub const ENGINE: &str = "user-tags.engine-type";
    pub const ENGINE_VERSION: &str = "distribution-version";
    pub const ENVIRONMENT: &str = "environment";
    pub const BENCHMARK_SOURCE: &str = "user-tags.benchmark-source";
    pub const RUN: &str = "user-tags.run";
    pub const SNAPSHOT_BUCKET: &str = "user-tags.snapshot-s3-bucket";
    pub const SNAPSHOT_BASE_PATH: &str = "user-tags.snapshot-base-path";
    pub const WORKLOAD: &str = "workload";
    pub const WORKLOAD_SUBTYPE: &str = "user-tags.workload-subtype";
    pub const TEST_PROCEDURE: &str = "test-procedure";
    pub const WORKLOAD_PARAMS_PREFIX: &str = "workload-params.";
    pub const SHARD_COUNT: &str = "user-tags.shard-count";
    pub const REPLICA_COUNT: &str = "user-tags.replica-count";
    pub const OPERATION: &str = "operation";
    pub const METRIC_NAME: &str = "name";
    pub const P50: &str = "value.50_0";
    pub const P90: &str = "value.90_0";
    /// Not extracted; used by the download date-range filter.
    pub const TIMESTAMP: &str = "test-execution-timestamp";
    /// Not extracted; used by the run-type filter.
    pub const RUN_TYPE: &str = "user-tags.run-type";
}

/// Fields every document must carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    fields::RUN_GROUP,
    fields::ENGINE,
    fields::ENGINE_VERSION,
    fields::ENVIRONMENT,
    fields::RUN,
    fields::WORKLOAD,
    fields::TEST_PROCEDURE,
    fields::SHARD_COUNT,
    fields::REPLICA_COUNT,
    fields::OPERATION,
    fields::METRIC_NAME,
    fields::P50,
    fields::P90,
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExtractError {
    #[error("document is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid run group {value:?}: expected %Y_%m_%d_%H_%M_%S")]
    InvalidRunGroup { value: String },
}

/// Build a record from a flattened document.
pub fn extract(doc: &FlatDocument) -> Result<ResultRecord, ExtractError> {
    let run_group_text = required(doc, fields::RUN_GROUP)?;
    let run_group = RunGroup::parse(&run_group_text).map_err(|_| ExtractError::InvalidRunGroup {
        value: run_group_text.clone(),
    })?;

    Ok(ResultRecord {
        run_group,
        engine: required(doc, fields::ENGINE)?,
        engine_version: required(doc, fields::ENGINE_VERSION)?,
        environment: required(doc, fields::ENVIRONMENT)?,
        benchmark_source: optional(doc, fields::BENCHMARK_SOURCE).unwrap_or_default(),
        run: required(doc, fields::RUN)?,
        snapshot_bucket: optional(doc, fields::SNAPSHOT_BUCKET),
        snapshot_base_path: optional(doc, fields::SNAPSHOT_BASE_PATH),
        workload: required(doc, fields::WORKLOAD)?,
        workload_subtype: optional(doc, fields::WORKLOAD_SUBTYPE).unwrap_or_default(),
        test_procedure: required(doc, fields::TEST_PROCEDURE)?,
        workload_params: workload_params(doc),
        shard_count: required(doc, fields::SHARD_COUNT)?,
        replica_count: required(doc, fields::REPLICA_COUNT)?,
        operation: required(doc, fields::OPERATION)?,
        metric_name: required(doc, fields::METRIC_NAME)?,
        p50: required(doc, fields::P50)?,
        p90: required(doc, fields::P90)?,
    })
}

fn required(doc: &FlatDocument, field: &'static str) -> Result<String, ExtractError> {
    doc.get(field)
        .and_then(render_value)
        .ok_or(ExtractError::MissingField(field))
}

/// An empty string is as absent as a missing key: the CSV cell for both is
/// empty and reads back as absent.
fn optional(doc: &FlatDocument, field: &str) -> Option<String> {
    doc.get(field).and_then(render_value).filter(|v| !v.is_empty())
}

fn workload_params(doc: &FlatDocument) -> BTreeMap<String, String> {
    doc.range(fields::WORKLOAD_PARAMS_PREFIX.to_string()..)
        .take_while(|(k, _)| k.starts_with(fields::WORKLOAD_PARAMS_PREFIX))
        .filter_map(|(k, v)| {
            let name = &k[fields::WORKLOAD_PARAMS_PREFIX.len()..];
            render_value(v)
                .filter(|v| !v.is_empty())
                .map(|v| (name.to_string(), v))
        })
        .collect()
}
