//! Test builders: ergonomic constructors for `ResultRecord`s and the store
//! documents they are extracted from.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use benchres_core::{ResultRecord, RunGroup};
use benchres_store::Document;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// ResultRecordBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`ResultRecord`] fixtures.
///
/// # Example
///
/// ```rust
/// let record = ResultRecordBuilder::new()
///     .engine("elasticsearch", "8.15.0")
///     .workload("nyc_taxis", "", "append-no-conflicts")
///     .run("2")
///     .param("bulk_size", "5000")
///     .latency("12.5", "18.0")
///     .build();
/// let doc = ResultRecordBuilder::new().to_document();
/// ```
#[derive(Debug, Clone)]
pub struct ResultRecordBuilder {
    record: ResultRecord,
}

impl Default for ResultRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultRecordBuilder {
    pub fn new() -> Self {
        Self {
            record: ResultRecord {
                run_group: RunGroup::parse("2024_03_01_08_00_00").unwrap(),
                engine: "opensearch".into(),
                engine_version: "2.11.0".into(),
                environment: "perf-us-east".into(),
                benchmark_source: String::new(),
                run: "1".into(),
                snapshot_bucket: None,
                snapshot_base_path: None,
                workload: "big5".into(),
                workload_subtype: String::new(),
                test_procedure: "big5".into(),
                workload_params: BTreeMap::new(),
                shard_count: "1".into(),
                replica_count: "0".into(),
                operation: "term".into(),
                metric_name: "service_time".into(),
                p50: "10.0".into(),
                p90: "15.0".into(),
            },
        }
    }

    pub fn run_group(mut self, run_group: &str) -> Self {
        self.record.run_group = RunGroup::parse(run_group).unwrap();
        self
    }

    pub fn engine(mut self, engine: &str, version: &str) -> Self {
        self.record.engine = engine.into();
        self.record.engine_version = version.into();
        self
    }

    pub fn environment(mut self, environment: &str) -> Self {
        self.record.environment = environment.into();
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.record.benchmark_source = source.into();
        self
    }

    pub fn run(mut self, run: &str) -> Self {
        self.record.run = run.into();
        self
    }

    pub fn snapshot(mut self, bucket: &str, base_path: &str) -> Self {
        self.record.snapshot_bucket = Some(bucket.into());
        self.record.snapshot_base_path = Some(base_path.into());
        self
    }

    pub fn workload(mut self, workload: &str, subtype: &str, procedure: &str) -> Self {
        self.record.workload = workload.into();
        self.record.workload_subtype = subtype.into();
        self.record.test_procedure = procedure.into();
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.record.workload_params.insert(name.into(), value.into());
        self
    }

    pub fn topology(mut self, shards: &str, replicas: &str) -> Self {
        self.record.shard_count = shards.into();
        self.record.replica_count = replicas.into();
        self
    }

    pub fn operation(mut self, operation: &str, metric: &str) -> Self {
        self.record.operation = operation.into();
        self.record.metric_name = metric.into();
        self
    }

    pub fn latency(mut self, p50: &str, p90: &str) -> Self {
        self.record.p50 = p50.into();
        self.record.p90 = p90.into();
        self
    }

    pub fn build(self) -> ResultRecord {
        self.record
    }

    /// The nested store document this record is extracted from.
    pub fn to_document(&self) -> Document {
        record_document(&self.record)
    }
}

/// Nested store document for `record`. Optional fields that are empty or
/// absent are left out, the way older documents look.
pub fn record_document(record: &ResultRecord) -> Document {
    let mut tags = Map::new();
    tags.insert("run-group".into(), json!(record.run_group.to_string()));
    tags.insert("engine-type".into(), json!(record.engine));
    tags.insert("run".into(), json!(record.run));
    tags.insert("shard-count".into(), json!(record.shard_count));
    tags.insert("replica-count".into(), json!(record.replica_count));
    if !record.benchmark_source.is_empty() {
        tags.insert("benchmark-source".into(), json!(record.benchmark_source));
    }
    if !record.workload_subtype.is_empty() {
        tags.insert("workload-subtype".into(), json!(record.workload_subtype));
    }
    if let Some(bucket) = &record.snapshot_bucket {
        tags.insert("snapshot-s3-bucket".into(), json!(bucket));
    }
    if let Some(path) = &record.snapshot_base_path {
        tags.insert("snapshot-base-path".into(), json!(path));
    }

    let doc = json!({
        "test-execution-timestamp": format!("{}Z", record.run_group.timestamp().format("%Y%m%dT%H%M%S")),
        "environment": record.environment,
        "distribution-version": record.engine_version,
        "workload": record.workload,
        "test-procedure": record.test_procedure,
        "workload-params": record.workload_params,
        "operation": record.operation,
        "name": record.metric_name,
        "value": { "50_0": record.p50, "90_0": record.p90 },
        "user-tags": tags,
    });
    object(doc)
}

/// Unwrap a `json!` object literal into a [`Document`].
pub fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
