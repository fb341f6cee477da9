//! Summary statistics over result records.
//!
//! Warmup runs are dropped, the remaining records are grouped per engine
//! build and scenario, and each group gets mean / sample standard deviation
//! / relative standard deviation for p50 and p90. [`compare`] then pairs a
//! baseline engine with a contender on the same scenario.

use crate::types::ResultRecord;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("run {run} of {workload}/{operation} ({engine} {engine_version}): {percentile} value {value:?} is not a number")]
pub struct SummaryError {
    pub engine: String,
    pub engine_version: String,
    pub workload: String,
    pub operation: String,
    pub run: String,
    pub percentile: &'static str,
    pub value: String,
}

/// What was measured, independent of which engine measured it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scenario {
    pub workload: String,
    pub workload_subtype: String,
    pub test_procedure: String,
    pub operation: String,
    pub metric_name: String,
    pub shard_count: String,
    pub replica_count: String,
}

/// Scenario plus the engine build that ran it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub scenario: Scenario,
    pub engine: String,
    pub engine_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single sample.
    pub stdev: f64,
    /// `stdev / mean * 100`, undefined when the mean is 0.
    pub rsd: Option<f64>,
}

impl Stats {
    /// `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Stats> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let stdev = if count > 1 {
            let sum_sq = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
            (sum_sq / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let rsd = (mean != 0.0).then(|| stdev / mean * 100.0);
        Some(Stats {
            count,
            mean,
            stdev,
            rsd,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub key: GroupKey,
    pub p50: Stats,
    pub p90: Stats,
}

impl Summary {
    pub const HEADER: [&'static str; 16] = [
        "workload",
        "workload_subtype",
        "test_procedure",
        "operation",
        "metric_name",
        "shard_count",
        "replica_count",
        "engine",
        "engine_version",
        "runs",
        "p50_mean",
        "p50_stdev",
        "p50_rsd",
        "p90_mean",
        "p90_stdev",
        "p90_rsd",
    ];

    pub fn to_row(&self) -> Vec<String> {
        let s = &self.key.scenario;
        vec![
            s.workload.clone(),
            s.workload_subtype.clone(),
            s.test_procedure.clone(),
            s.operation.clone(),
            s.metric_name.clone(),
            s.shard_count.clone(),
            s.replica_count.clone(),
            self.key.engine.clone(),
            self.key.engine_version.clone(),
            self.p50.count.to_string(),
            fmt(self.p50.mean),
            fmt(self.p50.stdev),
            fmt_opt(self.p50.rsd),
            fmt(self.p90.mean),
            fmt(self.p90.stdev),
            fmt_opt(self.p90.rsd),
        ]
    }
}

/// Group non-warmup records and compute per-group statistics, ordered by
/// [`GroupKey`]. Groups made only of warmup runs are omitted.
pub fn summarize(records: &[ResultRecord]) -> Result<Vec<Summary>, SummaryError> {
    let mut groups: BTreeMap<GroupKey, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_warmup()) {
        let p50 = parse_percentile(record, "p50", &record.p50)?;
        let p90 = parse_percentile(record, "p90", &record.p90)?;
        let (p50s, p90s) = groups.entry(group_key(record)).or_default();
        p50s.push(p50);
        p90s.push(p90);
    }

    Ok(groups
        .into_iter()
        .filter_map(|(key, (p50s, p90s))| {
            Some(Summary {
                key,
                p50: Stats::from_samples(&p50s)?,
                p90: Stats::from_samples(&p90s)?,
            })
        })
        .collect())
}

fn group_key(r: &ResultRecord) -> GroupKey {
    GroupKey {
        scenario: Scenario {
            workload: r.workload.clone(),
            workload_subtype: r.workload_subtype.clone(),
            test_procedure: r.test_procedure.clone(),
            operation: r.operation.clone(),
            metric_name: r.metric_name.clone(),
            shard_count: r.shard_count.clone(),
            replica_count: r.replica_count.clone(),
        },
        engine: r.engine.clone(),
        engine_version: r.engine_version.clone(),
    }
}

fn parse_percentile(
    r: &ResultRecord,
    percentile: &'static str,
    value: &str,
) -> Result<f64, SummaryError> {
    value.trim().parse::<f64>().map_err(|_| SummaryError {
        engine: r.engine.clone(),
        engine_version: r.engine_version.clone(),
        workload: r.workload.clone(),
        operation: r.operation.clone(),
        run: r.run.clone(),
        percentile,
        value: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// One scenario measured by both engines.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub scenario: Scenario,
    pub baseline_engine: String,
    pub baseline_version: String,
    pub contender_engine: String,
    pub contender_version: String,
    pub baseline_p50: f64,
    pub contender_p50: f64,
    /// `contender / baseline`; undefined when the baseline mean is 0.
    pub p50_ratio: Option<f64>,
    pub baseline_p90: f64,
    pub contender_p90: f64,
    pub p90_ratio: Option<f64>,
}

impl Comparison {
    pub const HEADER: [&'static str; 18] = [
        "workload",
        "workload_subtype",
        "test_procedure",
        "operation",
        "metric_name",
        "shard_count",
        "replica_count",
        "baseline_engine",
        "baseline_version",
        "contender_engine",
        "contender_version",
        "baseline_p50_mean",
        "contender_p50_mean",
        "p50_ratio",
        "baseline_p90_mean",
        "contender_p90_mean",
        "p90_ratio",
        "faster",
    ];

    pub fn to_row(&self) -> Vec<String> {
        let s = &self.scenario;
        vec![
            s.workload.clone(),
            s.workload_subtype.clone(),
            s.test_procedure.clone(),
            s.operation.clone(),
            s.metric_name.clone(),
            s.shard_count.clone(),
            s.replica_count.clone(),
            self.baseline_engine.clone(),
            self.baseline_version.clone(),
            self.contender_engine.clone(),
            self.contender_version.clone(),
            fmt(self.baseline_p50),
            fmt(self.contender_p50),
            fmt_opt(self.p50_ratio),
            fmt(self.baseline_p90),
            fmt(self.contender_p90),
            fmt_opt(self.p90_ratio),
            self.faster().unwrap_or("").to_string(),
        ]
    }

    /// Engine with the lower p90 mean, if they differ.
    pub fn faster(&self) -> Option<&str> {
        match self.p90_ratio {
            Some(r) if r < 1.0 => Some(self.contender_engine.as_str()),
            Some(r) if r > 1.0 => Some(self.baseline_engine.as_str()),
            _ => None,
        }
    }
}

/// Pair every baseline build with every contender build on shared scenarios.
pub fn compare(summaries: &[Summary], baseline: &str, contender: &str) -> Vec<Comparison> {
    let mut by_scenario: BTreeMap<&Scenario, (Vec<&Summary>, Vec<&Summary>)> = BTreeMap::new();
    for summary in summaries {
        let slot = by_scenario.entry(&summary.key.scenario).or_default();
        if summary.key.engine == baseline {
            slot.0.push(summary);
        } else if summary.key.engine == contender {
            slot.1.push(summary);
        }
    }

    let mut out = Vec::new();
    for (scenario, (bases, contenders)) in by_scenario {
        for base in &bases {
            for cont in &contenders {
                out.push(Comparison {
                    scenario: scenario.clone(),
                    baseline_engine: base.key.engine.clone(),
                    baseline_version: base.key.engine_version.clone(),
                    contender_engine: cont.key.engine.clone(),
                    contender_version: cont.key.engine_version.clone(),
                    baseline_p50: base.p50.mean,
                    contender_p50: cont.p50.mean,
                    p50_ratio: ratio(cont.p50.mean, base.p50.mean),
                    baseline_p90: base.p90.mean,
                    contender_p90: cont.p90.mean,
                    p90_ratio: ratio(cont.p90.mean, base.p90.mean),
                });
            }
        }
    }
    out
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

fn fmt(v: f64) -> String {
    format!("{v:.3}")
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt).unwrap_or_default()
}
