//! The four commands, each a single linear pass.
//!
//! Store access goes through [`SearchStore`] and report output through
//! [`ReportSink`], so tests run the same code against in-memory or fake
//! HTTP collaborators.

use crate::cli::{DownloadPlan, DumpPlan, FieldsPlan, SummarizePlan};
use anyhow::Context;
use benchres_core::raw::RawCsvWriter;
use benchres_core::reader::read_partition_dir;
use benchres_core::summary::{self, Comparison, Summary};
use benchres_core::{extract, flatten, sort_records, PartitionedCsvWriter, WrittenFile};
use benchres_report::ReportSink;
use benchres_store::{discover_fields, FetchStats, Fetcher, SearchStore};
use std::ops::ControlFlow;

pub const SUMMARY_SHEET: &str = "summary";
pub const COMPARISON_SHEET: &str = "comparison";

#[derive(Debug)]
pub struct DownloadOutcome {
    pub fetch: FetchStats,
    pub records: usize,
    pub files: Vec<WrittenFile>,
}

/// Fetch result documents, extract and sort records, write one CSV per
/// partition.
pub async fn download<S: SearchStore + ?Sized>(
    store: &S,
    plan: &DownloadPlan,
) -> anyhow::Result<DownloadOutcome> {
    let fetcher = Fetcher::new(store, plan.page_size)?;
    let query = plan.filter.to_query();

    let mut records = Vec::new();
    let fetch = fetcher
        .for_each(&query, |doc| -> anyhow::Result<ControlFlow<()>> {
            let record = extract(&flatten(&doc))
                .with_context(|| format!("document {} is not a valid result", records.len() + 1))?;
            records.push(record);
            Ok(ControlFlow::Continue(()))
        })
        .await?;
    tracing::info!(total = fetch.total, pages = fetch.pages, "fetched result documents");

    sort_records(&mut records);
    let files = PartitionedCsvWriter::new(&plan.output_dir)
        .with_header_scope(plan.header_scope)
        .write(&records)?;
    tracing::info!(
        records = records.len(),
        files = files.len(),
        dir = %plan.output_dir.display(),
        "wrote partition files"
    );

    Ok(DownloadOutcome {
        fetch,
        records: records.len(),
        files,
    })
}

#[derive(Debug)]
pub struct DumpOutcome {
    pub fields: usize,
    pub rows: usize,
    /// Documents that carried fields outside the sampled header.
    pub unsampled: usize,
}

/// Sample the header, then write every matching document, flattened, to one
/// CSV. A failed dump removes its partial output.
pub async fn dump<S: SearchStore + ?Sized>(store: &S, plan: &DumpPlan) -> anyhow::Result<DumpOutcome> {
    let query = plan.filter.to_raw_query();
    let fields = discover_fields(store, &query, plan.sample_size, plan.page_size).await?;
    let field_count = fields.len();

    let mut writer = RawCsvWriter::create(&plan.output_file, fields)?;
    let fetcher = Fetcher::new(store, plan.page_size)?;
    let mut unsampled = 0;
    let fetched = fetcher
        .for_each(&query, |doc| -> anyhow::Result<ControlFlow<()>> {
            if writer.write(&flatten(&doc))? {
                unsampled += 1;
            }
            Ok(ControlFlow::Continue(()))
        })
        .await;

    let rows = match fetched.and_then(|_| writer.finish().map_err(Into::into)) {
        Ok(rows) => rows,
        Err(err) => {
            if let Err(remove) = std::fs::remove_file(&plan.output_file) {
                tracing::warn!(error = %remove, "failed to remove partial dump");
            }
            return Err(err);
        }
    };

    if unsampled > 0 {
        tracing::warn!(
            unsampled,
            sample_size = plan.sample_size,
            "documents carried fields outside the sampled header; those values were dropped"
        );
    }
    tracing::info!(rows, fields = field_count, path = %plan.output_file.display(), "wrote dump");

    Ok(DumpOutcome {
        fields: field_count,
        rows,
        unsampled,
    })
}

pub async fn fields<S: SearchStore + ?Sized>(store: &S, plan: &FieldsPlan) -> anyhow::Result<Vec<String>> {
    let query = plan.filter.to_raw_query();
    Ok(discover_fields(store, &query, plan.sample_size, plan.page_size).await?)
}

#[derive(Debug)]
pub struct SummarizeOutcome {
    pub summaries: Vec<Summary>,
    pub comparisons: Vec<Comparison>,
}

/// Read partition files back, compute statistics, and append them to the
/// summary and comparison sheets.
pub async fn summarize<K: ReportSink + ?Sized>(
    sink: &K,
    plan: &SummarizePlan,
) -> anyhow::Result<SummarizeOutcome> {
    let records = read_partition_dir(&plan.input_dir)?;
    let summaries = summary::summarize(&records)?;
    let comparisons = summary::compare(&summaries, &plan.baseline, &plan.contender);
    if comparisons.is_empty() {
        tracing::warn!(
            baseline = %plan.baseline,
            contender = %plan.contender,
            "no scenario was measured by both engines"
        );
    }

    sink.append_rows(
        SUMMARY_SHEET,
        &header(&Summary::HEADER),
        &summaries.iter().map(Summary::to_row).collect::<Vec<_>>(),
    )
    .await
    .context("writing summary sheet")?;
    sink.append_rows(
        COMPARISON_SHEET,
        &header(&Comparison::HEADER),
        &comparisons.iter().map(Comparison::to_row).collect::<Vec<_>>(),
    )
    .await
    .context("writing comparison sheet")?;

    tracing::info!(
        records = records.len(),
        summaries = summaries.len(),
        comparisons = comparisons.len(),
        "summarised results"
    );
    Ok(SummarizeOutcome {
        summaries,
        comparisons,
    })
}

fn header(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
