//! Paginated fetcher.
//!
//! Counts first; a result set smaller than one page is fetched with a single
//! plain search. Anything larger opens a scroll context and pages through it
//! until a page comes back empty or the reported total has been delivered.
//!
//! The scroll context is released exactly once on every exit path: full
//! drain, consumer break, consumer error, or transport error. A failed
//! release is logged and does not replace the fetch result.

use crate::{Document, SearchPage, SearchRequest, SearchStore, StoreError, MAX_PAGE_SIZE};
use benchres_core::Query;
use std::ops::ControlFlow;

/// What a fetch did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Matches reported by the count call.
    pub total: u64,
    /// Documents handed to the consumer.
    pub fetched: u64,
    /// Pages received, including the initial search.
    pub pages: usize,
    /// The consumer asked to stop before the result set was exhausted.
    pub stopped_early: bool,
}

pub struct Fetcher<'s, S: ?Sized> {
    store: &'s S,
    page_size: usize,
}

impl<'s, S: SearchStore + ?Sized> Fetcher<'s, S> {
    pub fn new(store: &'s S, page_size: usize) -> Result<Self, StoreError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(StoreError::InvalidPageSize(page_size));
        }
        Ok(Self { store, page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Hand every matching document to `visit`, in store order.
    ///
    /// `visit` may return `ControlFlow::Break` to stop early, or an error to
    /// abort. Store errors convert into the consumer's error type.
    pub async fn for_each<F, E>(&self, query: &Query, mut visit: F) -> Result<FetchStats, E>
    where
        F: FnMut(Document) -> Result<ControlFlow<()>, E>,
        E: From<StoreError>,
    {
        let total = self.store.count(query).await?;
        let mut stats = FetchStats {
            total,
            ..FetchStats::default()
        };
        tracing::debug!(total, page_size = self.page_size, "fetching documents");

        if total < self.page_size as u64 {
            let page = self
                .store
                .search(SearchRequest {
                    query,
                    size: self.page_size,
                    scroll: false,
                })
                .await?;
            stats.pages = 1;
            if deliver(page.hits, &mut visit, &mut stats)?.is_break() {
                tracing::debug!(fetched = stats.fetched, "consumer stopped early");
            }
            return Ok(stats);
        }

        let mut first = self
            .store
            .search(SearchRequest {
                query,
                size: self.page_size,
                scroll: true,
            })
            .await?;
        let mut scroll_id = first.scroll_id.take().ok_or(StoreError::MissingScrollId)?;

        let outcome = self.drain(first, &mut scroll_id, &mut visit, &mut stats).await;
        self.release(&scroll_id).await;
        outcome?;

        tracing::debug!(
            fetched = stats.fetched,
            pages = stats.pages,
            "finished paginated fetch"
        );
        Ok(stats)
    }

    /// Collect every matching document.
    pub async fn collect(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut docs = Vec::new();
        self.for_each(query, |doc| {
            docs.push(doc);
            Ok::<_, StoreError>(ControlFlow::Continue(()))
        })
        .await?;
        Ok(docs)
    }

    async fn drain<F, E>(
        &self,
        first: SearchPage,
        scroll_id: &mut String,
        visit: &mut F,
        stats: &mut FetchStats,
    ) -> Result<(), E>
    where
        F: FnMut(Document) -> Result<ControlFlow<()>, E>,
        E: From<StoreError>,
    {
        let mut page = first;
        loop {
            stats.pages += 1;
            // The store may hand out a new id with any page.
            if let Some(next) = page.scroll_id.take() {
                *scroll_id = next;
            }
            if page.hits.is_empty() {
                return Ok(());
            }
            if deliver(page.hits, visit, stats)?.is_break() {
                return Ok(());
            }
            if stats.fetched >= stats.total {
                return Ok(());
            }
            page = self.store.scroll(scroll_id.as_str()).await?;
        }
    }

    async fn release(&self, scroll_id: &str) {
        if let Err(err) = self.store.clear_scroll(scroll_id).await {
            tracing::warn!(error = %err, "failed to release scroll context");
        }
    }
}

fn deliver<F, E>(hits: Vec<Document>, visit: &mut F, stats: &mut FetchStats) -> Result<ControlFlow<()>, E>
where
    F: FnMut(Document) -> Result<ControlFlow<()>, E>,
{
    for doc in hits {
        stats.fetched += 1;
        if visit(doc)?.is_break() {
            stats.stopped_early = true;
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}
