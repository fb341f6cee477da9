//! Query DSL and the download filter built from CLI input.
//!
//! [`Query`] is a conjunction of filter clauses serialised to the store's
//! `bool.filter` form. [`DownloadFilter`] turns a validated date range and
//! the optional tag filters into a [`Query`].

use crate::config::ConfigError;
use crate::extract::{fields, REQUIRED_FIELDS};
use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Half-open range `gte <= field < lt`; either bound may be absent.
    Range {
        field: String,
        gte: Option<String>,
        lt: Option<String>,
    },
    Term { field: String, value: String },
    /// Matches when the field equals any of `values`.
    Terms { field: String, values: Vec<String> },
    Exists { field: String },
    Prefix { field: String, value: String },
}

impl Clause {
    fn to_json(&self) -> Value {
        match self {
            Clause::Range { field, gte, lt } => {
                let mut bounds = serde_json::Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".into(), json!(gte));
                }
                if let Some(lt) = lt {
                    bounds.insert("lt".into(), json!(lt));
                }
                bounds.insert("format".into(), json!("strict_date_optional_time"));
                json!({ "range": { field: bounds } })
            }
            Clause::Term { field, value } => json!({ "term": { field: value } }),
            Clause::Terms { field, values } => json!({ "terms": { field: values } }),
            Clause::Exists { field } => json!({ "exists": { "field": field } }),
            Clause::Prefix { field, value } => json!({ "prefix": { field: value } }),
        }
    }
}

/// A conjunction of filter clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn range(self, field: &str, gte: Option<String>, lt: Option<String>) -> Self {
        self.clause(Clause::Range {
            field: field.to_string(),
            gte,
            lt,
        })
    }

    pub fn term(self, field: &str, value: impl Into<String>) -> Self {
        self.clause(Clause::Term {
            field: field.to_string(),
            value: value.into(),
        })
    }

    pub fn terms(self, field: &str, values: Vec<String>) -> Self {
        self.clause(Clause::Terms {
            field: field.to_string(),
            values,
        })
    }

    pub fn exists(self, field: &str) -> Self {
        self.clause(Clause::Exists {
            field: field.to_string(),
        })
    }

    pub fn prefix(self, field: &str, value: impl Into<String>) -> Self {
        self.clause(Clause::Prefix {
            field: field.to_string(),
            value: value.into(),
        })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The `query` object of a store request body.
    pub fn to_json(&self) -> Value {
        if self.clauses.is_empty() {
            return json!({ "match_all": {} });
        }
        let filter: Vec<Value> = self.clauses.iter().map(Clause::to_json).collect();
        json!({ "bool": { "filter": filter } })
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Validated half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Parse CLI date arguments. Each may be `YYYY-MM-DD` or RFC 3339 with a
    /// timezone. A date-only end covers that whole day.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ConfigError> {
        let start_text = start.ok_or(ConfigError::MissingDate("start"))?;
        let end_text = end.ok_or(ConfigError::MissingDate("end"))?;
        let start = parse_date(start_text, false)?;
        let end = parse_date(end_text, true)?;
        if start > end {
            return Err(ConfigError::InvertedRange {
                start: start_text.to_string(),
                end: end_text.to_string(),
            });
        }
        Ok(Self { start, end })
    }
}

fn parse_date(input: &str, end_of_day: bool) -> Result<DateTime<Utc>, ConfigError> {
    let invalid = || ConfigError::InvalidDate {
        input: input.to_string(),
    };
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let date = if end_of_day {
            date.checked_add_days(Days::new(1)).ok_or_else(invalid)?
        } else {
            date
        };
        return Ok(date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc());
    }
    DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| invalid())
}

// ---------------------------------------------------------------------------
// DownloadFilter
// ---------------------------------------------------------------------------

/// Everything the download, dump and fields commands filter on.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadFilter {
    pub range: DateRange,
    pub run_type: Option<String>,
    pub environment_prefix: Option<String>,
    pub source_tags: Vec<String>,
}

impl DownloadFilter {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            run_type: None,
            environment_prefix: None,
            source_tags: Vec::new(),
        }
    }

    /// Query for result records: the filters plus an `exists` check on
    /// every field the extractor requires.
    pub fn to_query(&self) -> Query {
        REQUIRED_FIELDS
            .iter()
            .fold(self.to_raw_query(), |query, field| query.exists(field))
    }

    /// Query for heterogeneous documents; no required-field checks.
    pub fn to_raw_query(&self) -> Query {
        let mut query = Query::new().range(
            fields::TIMESTAMP,
            Some(rfc3339(self.range.start)),
            Some(rfc3339(self.range.end)),
        );
        if let Some(run_type) = &self.run_type {
            query = query.term(fields::RUN_TYPE, run_type.clone());
        }
        if let Some(prefix) = &self.environment_prefix {
            query = query.prefix(fields::ENVIRONMENT, prefix.clone());
        }
        if !self.source_tags.is_empty() {
            query = query.terms(fields::BENCHMARK_SOURCE, self.source_tags.clone());
        }
        query
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
