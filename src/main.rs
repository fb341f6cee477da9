use anyhow::Context;
use benchres::cli::{Cli, Plan};
use benchres::pipeline;
use benchres_core::config::Config;
use benchres_report::{CsvReportSink, RetryingSink};
use benchres_store::HttpSearchStore;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
            tracing::info!(path = %path.display(), "benchres log started");
        }
        None => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init(),
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let plan = cli.command.plan(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async {
        match plan {
            Plan::Download(settings, plan) => {
                let store = HttpSearchStore::new(settings)?;
                let outcome = pipeline::download(&store, &plan).await?;
                println!(
                    "wrote {} records to {} files in {}",
                    outcome.records,
                    outcome.files.len(),
                    plan.output_dir.display()
                );
            }
            Plan::Dump(settings, plan) => {
                let store = HttpSearchStore::new(settings)?;
                let outcome = pipeline::dump(&store, &plan).await?;
                println!(
                    "wrote {} rows with {} columns to {}",
                    outcome.rows,
                    outcome.fields,
                    plan.output_file.display()
                );
            }
            Plan::Fields(settings, plan) => {
                let store = HttpSearchStore::new(settings)?;
                for field in pipeline::fields(&store, &plan).await? {
                    println!("{field}");
                }
            }
            Plan::Summarize(plan) => {
                let sink = RetryingSink::new(CsvReportSink::new(&plan.output_dir), plan.retry);
                let outcome = pipeline::summarize(&sink, &plan).await?;
                println!(
                    "summarised {} groups, {} comparisons",
                    outcome.summaries.len(),
                    outcome.comparisons.len()
                );
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}
