//! Command-line surface.
//!
//! Parsing is clap's job; [`Command::plan`] then validates the arguments
//! against the loaded [`Config`] and produces a [`Plan`] the pipeline can run
//! without further checks. Validation happens before any network call, in a
//! fixed order: credentials, dates, then directories.

use benchres_core::config::{Config, ConfigError, PASSWORD_ENV};
use benchres_core::{DateRange, DownloadFilter, HeaderScope};
use benchres_report::RetryPolicy;
use benchres_store::StoreSettings;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "benchres",
    version,
    about = "Download, partition and summarise search-engine benchmark results"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Config file [default: ~/.config/benchres/config.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download result records into one CSV file per partition.
    Download {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Existing directory the partition files are written to.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Union workload parameter columns across the dataset or per file.
        #[arg(long, value_enum)]
        header_scope: Option<ScopeArg>,
    },
    /// Dump every matching document, flattened, into a single CSV.
    Dump {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_name = "PATH")]
        output_file: Option<PathBuf>,
        /// Documents sampled to build the header.
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Print the field names found in a sample of matching documents.
    Fields {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Summarise partition files and compare two engines.
    Summarize {
        /// Directory of partition files written by `download`.
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,
        /// Existing directory the summary sheets are written to.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        baseline: String,
        #[arg(long)]
        contender: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Dataset,
    Partition,
}

impl From<ScopeArg> for HeaderScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Dataset => HeaderScope::Dataset,
            ScopeArg::Partition => HeaderScope::Partition,
        }
    }
}

/// Where the metrics store is and how to log in.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    #[arg(long, env = "DATASTORE_HOST")]
    pub host: Option<String>,
    #[arg(long, env = "DATASTORE_PORT")]
    pub port: Option<u16>,
    #[arg(long, env = "DATASTORE_USER")]
    pub user: Option<String>,
    #[arg(long, env = "DATASTORE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Index or index pattern to search.
    #[arg(long)]
    pub index: Option<String>,
    /// Documents per page, at most 10000.
    #[arg(long)]
    pub page_size: Option<usize>,
}

impl StoreArgs {
    fn settings(&self, config: &Config) -> Result<StoreSettings, ConfigError> {
        let password = self
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingCredentials(PASSWORD_ENV))?;
        let store = &config.store;
        let host = self.host.as_deref().unwrap_or(&store.host);
        let port = self.port.unwrap_or(store.port);
        Ok(StoreSettings {
            base_url: format!("{}://{host}:{port}", store.scheme),
            index: self.index.clone().unwrap_or_else(|| store.index.clone()),
            username: self.user.clone().unwrap_or_else(|| store.username.clone()),
            password,
            scroll_keep_alive: store.scroll_keep_alive.clone(),
            timeout: Duration::from_secs(store.timeout_secs),
        })
    }

    fn page_size(&self, config: &Config) -> usize {
        self.page_size.unwrap_or(config.store.page_size)
    }
}

/// Time window and tag filters shared by the store-facing commands.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Start of the window: YYYY-MM-DD or RFC 3339 with timezone.
    #[arg(long)]
    pub start: Option<String>,
    /// End of the window; a bare date includes that whole day.
    #[arg(long)]
    pub end: Option<String>,
    /// Only results tagged with this run type.
    #[arg(long)]
    pub run_type: Option<String>,
    /// Only environments starting with this prefix.
    #[arg(long)]
    pub environment_prefix: Option<String>,
    /// Only results from this benchmark source; repeatable.
    #[arg(long = "source-tag", value_name = "TAG")]
    pub source_tags: Vec<String>,
}

impl FilterArgs {
    fn filter(&self) -> Result<DownloadFilter, ConfigError> {
        let range = DateRange::parse(self.start.as_deref(), self.end.as_deref())?;
        Ok(DownloadFilter {
            run_type: self.run_type.clone(),
            environment_prefix: self.environment_prefix.clone(),
            source_tags: self.source_tags.clone(),
            ..DownloadFilter::new(range)
        })
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub filter: DownloadFilter,
    pub page_size: usize,
    pub output_dir: PathBuf,
    pub header_scope: HeaderScope,
}

#[derive(Debug, Clone)]
pub struct DumpPlan {
    pub filter: DownloadFilter,
    pub page_size: usize,
    pub output_file: PathBuf,
    pub sample_size: usize,
}

#[derive(Debug, Clone)]
pub struct FieldsPlan {
    pub filter: DownloadFilter,
    pub page_size: usize,
    pub sample_size: usize,
}

#[derive(Debug, Clone)]
pub struct SummarizePlan {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub baseline: String,
    pub contender: String,
    pub retry: RetryPolicy,
}

/// A validated command.
#[derive(Debug, Clone)]
pub enum Plan {
    Download(StoreSettings, DownloadPlan),
    Dump(StoreSettings, DumpPlan),
    Fields(StoreSettings, FieldsPlan),
    Summarize(SummarizePlan),
}

impl Command {
    pub fn plan(&self, config: &Config) -> Result<Plan, ConfigError> {
        match self {
            Command::Download {
                store,
                filter,
                output_dir,
                header_scope,
            } => {
                let settings = store.settings(config)?;
                let filter = filter.filter()?;
                let output_dir = existing_dir(output_dir.as_deref(), "--output-dir")?;
                Ok(Plan::Download(
                    settings,
                    DownloadPlan {
                        filter,
                        page_size: store.page_size(config),
                        output_dir,
                        header_scope: header_scope
                            .map(HeaderScope::from)
                            .unwrap_or(config.download.header_scope),
                    },
                ))
            }
            Command::Dump {
                store,
                filter,
                output_file,
                sample_size,
            } => {
                let settings = store.settings(config)?;
                let filter = filter.filter()?;
                let output_file = output_file
                    .clone()
                    .ok_or(ConfigError::MissingDirectory("--output-file"))?;
                let parent = match output_file.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                existing_dir(Some(parent), "--output-file")?;
                Ok(Plan::Dump(
                    settings,
                    DumpPlan {
                        filter,
                        page_size: store.page_size(config),
                        output_file,
                        sample_size: sample_size.unwrap_or(config.download.sample_size),
                    },
                ))
            }
            Command::Fields {
                store,
                filter,
                sample_size,
            } => {
                let settings = store.settings(config)?;
                let filter = filter.filter()?;
                Ok(Plan::Fields(
                    settings,
                    FieldsPlan {
                        filter,
                        page_size: store.page_size(config),
                        sample_size: sample_size.unwrap_or(config.download.sample_size),
                    },
                ))
            }
            Command::Summarize {
                input_dir,
                output_dir,
                baseline,
                contender,
            } => {
                let input_dir = existing_dir(input_dir.as_deref(), "--input-dir")?;
                let output_dir = existing_dir(output_dir.as_deref(), "--output-dir")?;
                // sheets written into the input directory would be read back as partitions
                if same_dir(&input_dir, &output_dir) {
                    return Err(ConfigError::SameDirectory(output_dir));
                }
                Ok(Plan::Summarize(SummarizePlan {
                    input_dir,
                    output_dir,
                    baseline: baseline.clone(),
                    contender: contender.clone(),
                    retry: RetryPolicy {
                        max_attempts: config.report.max_attempts,
                        delay: Duration::from_millis(config.report.retry_delay_ms),
                    },
                }))
            }
        }
    }
}

fn existing_dir(path: Option<&Path>, flag: &'static str) -> Result<PathBuf, ConfigError> {
    let path = path.ok_or(ConfigError::MissingDirectory(flag))?;
    if !path.is_dir() {
        return Err(ConfigError::DirectoryNotFound(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
