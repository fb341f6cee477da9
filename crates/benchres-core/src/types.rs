//! Core types for benchres-core.
//!
//! This module defines the [`ResultRecord`] produced by the extractor, the
//! [`RunGroup`] timestamp that identifies a batch of runs, and the
//! [`PartitionKey`] that decides which output file a record lands in.

use chrono::NaiveDateTime;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Pattern every run-group tag must follow, e.g. `2024_01_15_10_00_00`.
pub const RUN_GROUP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Run number of the warmup iteration in every run group.
pub const WARMUP_RUN: &str = "0";

// ---------------------------------------------------------------------------
// RunGroup
// ---------------------------------------------------------------------------

/// Timestamp shared by every run of one benchmark execution batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunGroup(NaiveDateTime);

impl RunGroup {
    /// Parse a run-group tag in [`RUN_GROUP_FORMAT`].
    pub fn parse(value: &str) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(value, RUN_GROUP_FORMAT).map(RunGroup)
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for RunGroup {
    fn from(ts: NaiveDateTime) -> Self {
        RunGroup(ts)
    }
}

impl std::fmt::Display for RunGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(RUN_GROUP_FORMAT))
    }
}

// ---------------------------------------------------------------------------
// ResultRecord
// ---------------------------------------------------------------------------

/// One benchmark measurement row.
///
/// Percentiles are kept as the store's text so that writing them back out
/// never reformats a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub run_group: RunGroup,
    pub engine: String,
    pub engine_version: String,
    pub environment: String,
    /// Provenance tag (scheduled, manual, …). Empty when the document
    /// predates the tag.
    pub benchmark_source: String,
    /// Ordinal within the run group. Run `"0"` is the warmup.
    pub run: String,
    pub snapshot_bucket: Option<String>,
    pub snapshot_base_path: Option<String>,
    pub workload: String,
    /// Empty when the workload has no subtype.
    pub workload_subtype: String,
    pub test_procedure: String,
    pub workload_params: BTreeMap<String, String>,
    pub shard_count: String,
    pub replica_count: String,
    pub operation: String,
    pub metric_name: String,
    pub p50: String,
    pub p90: String,
}

impl ResultRecord {
    pub fn is_warmup(&self) -> bool {
        self.run == WARMUP_RUN
    }

    pub fn partition_key(&self) -> PartitionKey<'_> {
        PartitionKey {
            run_group: self.run_group,
            engine: &self.engine,
            engine_version: &self.engine_version,
            workload: &self.workload,
            workload_subtype: &self.workload_subtype,
            test_procedure: &self.test_procedure,
        }
    }

    /// Full emission order. Records sharing a partition key sort next to
    /// each other as long as environment and snapshot are fixed per run group.
    #[allow(clippy::type_complexity)]
    pub fn sort_key(
        &self,
    ) -> (
        RunGroup,
        &str,
        &str,
        &str,
        Option<&str>,
        Option<&str>,
        &str,
        &str,
        &str,
        RunOrdinal<'_>,
        &str,
    ) {
        (
            self.run_group,
            &self.engine,
            &self.engine_version,
            &self.environment,
            self.snapshot_bucket.as_deref(),
            self.snapshot_base_path.as_deref(),
            &self.workload,
            &self.workload_subtype,
            &self.test_procedure,
            RunOrdinal(&self.run),
            &self.metric_name,
        )
    }
}

/// Sort records into emission order (see [`ResultRecord::sort_key`]).
pub fn sort_records(records: &mut [ResultRecord]) {
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Run number that orders numerically when both sides are integers, so run
/// 10 follows run 9 rather than run 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOrdinal<'a>(pub &'a str);

impl Ord for RunOrdinal<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(other.0),
        }
    }
}

impl PartialOrd for RunOrdinal<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// PartitionKey
// ---------------------------------------------------------------------------

/// Identity of one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionKey<'a> {
    pub run_group: RunGroup,
    pub engine: &'a str,
    pub engine_version: &'a str,
    pub workload: &'a str,
    pub workload_subtype: &'a str,
    pub test_procedure: &'a str,
}

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("file-name pattern must compile"));

impl PartitionKey<'_> {
    /// `{run_group}-{engine}-{engine_version}-{workload}[-{workload_subtype}]-{test_procedure}.csv`
    pub fn file_name(&self) -> String {
        let run_group = self.run_group.to_string();
        let mut segments = vec![
            run_group.as_str(),
            self.engine,
            self.engine_version,
            self.workload,
        ];
        if !self.workload_subtype.is_empty() {
            segments.push(self.workload_subtype);
        }
        segments.push(self.test_procedure);

        let joined = segments
            .iter()
            .map(|s| UNSAFE_FILE_CHARS.replace_all(s, "_"))
            .collect::<Vec<_>>()
            .join("-");
        format!("{joined}.csv")
    }
}

impl std::fmt::Display for PartitionKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.run_group,
            self.engine,
            self.engine_version,
            self.workload,
            self.workload_subtype,
            self.test_procedure
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
