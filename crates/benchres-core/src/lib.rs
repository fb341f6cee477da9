//! benchres-core: result records and the extraction/partitioning pipeline.
//!
//! This crate holds everything that does not talk to the network: the
//! [`ResultRecord`] model, the query DSL, the flattener and extractor that
//! turn store documents into records, the partitioned CSV writer and its
//! reader, and the summary statistics computed over read-back records.
//!
//! # Pipeline
//!
//! ```text
//! document ──► flatten ──► extract ──► sort ──► PartitionedCsvWriter
//!                 │                                   │
//!                 └──► RawCsvWriter          reader ◄─┘──► summary
//! ```

pub mod config;
pub mod extract;
pub mod flatten;
pub mod partition;
pub mod query;
pub mod raw;
pub mod reader;
pub mod summary;
pub mod types;

pub use extract::{extract, ExtractError};
pub use flatten::{flatten, FlatDocument};
pub use partition::{HeaderScope, PartitionError, PartitionedCsvWriter, WrittenFile};
pub use query::{DateRange, DownloadFilter, Query};
pub use types::{sort_records, PartitionKey, ResultRecord, RunGroup};
