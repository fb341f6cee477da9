//! benchres: download, partition and summarise search-engine benchmark
//! results.
//!
//! The binary is a thin shell over two modules: [`cli`] parses and validates
//! arguments into plans, and [`pipeline`] runs a plan against a
//! [`benchres_store::SearchStore`] or a [`benchres_report::ReportSink`].
//! Integration tests import both directly.
//!
//! # Architecture
//!
//! ```text
//! SearchStore ──► Fetcher ──► flatten/extract ──► sort ──► partition files
//!                    │                                          │
//!                    └──► discover_fields ──► raw dump    summarize ──► ReportSink
//! ```

pub mod cli;
pub mod pipeline;

pub use cli::{Cli, Command, Plan};
