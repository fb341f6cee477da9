//! benchres-store: metrics store adapters for benchres.
//!
//! [`SearchStore`] is the narrow capability the pipeline needs from the
//! store: count, search, scroll and clear-scroll. [`http::HttpSearchStore`]
//! speaks the OpenSearch/Elasticsearch REST API; tests substitute an
//! in-memory store. [`fetcher::Fetcher`] builds pagination on top, and
//! [`discover::discover_fields`] samples documents for a header.

use async_trait::async_trait;
use benchres_core::Query;

pub mod discover;
pub mod fetcher;
pub mod http;

#[cfg(test)]
mod mock;

pub use discover::discover_fields;
pub use fetcher::{FetchStats, Fetcher};
pub use http::{HttpSearchStore, StoreSettings};

/// Largest page the store hands out in a single response.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// A raw store document (`_source`).
pub type Document = serde_json::Map<String, serde_json::Value>;

/// One page of hits, plus the continuation token when a scroll is open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub scroll_id: Option<String>,
    pub hits: Vec<Document>,
}

/// Parameters of the initial search.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub query: &'a Query,
    pub size: usize,
    /// Open a scroll context for follow-up pages.
    pub scroll: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("store returned HTTP {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
    #[error("page size {0} is outside 1..={max}", max = MAX_PAGE_SIZE)]
    InvalidPageSize(usize),
    #[error("store did not return a scroll id for a scrolling search")]
    MissingScrollId,
}

/// Read-only access to the metrics store.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Number of documents matching `query`.
    async fn count(&self, query: &Query) -> Result<u64, StoreError>;

    /// First page of results, opening a scroll context when asked to.
    async fn search(&self, request: SearchRequest<'_>) -> Result<SearchPage, StoreError>;

    /// Next page of an open scroll context.
    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage, StoreError>;

    /// Release a scroll context.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), StoreError>;
}
