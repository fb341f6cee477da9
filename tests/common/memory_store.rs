//! In-memory `SearchStore` for pipeline harnesses.
//!
//! Ignores the query, pages through a fixed document list, and counts every
//! call so harnesses can assert on pagination behaviour.

use async_trait::async_trait;
use benchres_core::Query;
use benchres_store::{Document, SearchPage, SearchRequest, SearchStore, StoreError};
use std::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryCalls {
    pub count: usize,
    pub search: usize,
    pub scroll: usize,
    pub clear: usize,
    /// Queries seen by `count`, serialised.
    pub queries: Vec<serde_json::Value>,
}

#[derive(Default)]
pub struct MemoryStore {
    docs: Vec<Document>,
    state: Mutex<(MemoryCalls, usize, usize)>,
}

impl MemoryStore {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs,
            state: Mutex::default(),
        }
    }

    pub fn calls(&self) -> MemoryCalls {
        self.state.lock().unwrap().0.clone()
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.0.count += 1;
        state.0.queries.push(query.to_json());
        Ok(self.docs.len() as u64)
    }

    async fn search(&self, request: SearchRequest<'_>) -> Result<SearchPage, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.0.search += 1;
        let end = request.size.min(self.docs.len());
        state.1 = end;
        state.2 = request.size;
        Ok(SearchPage {
            scroll_id: request.scroll.then(|| "memory".to_string()),
            hits: self.docs[..end].to_vec(),
        })
    }

    async fn scroll(&self, _scroll_id: &str) -> Result<SearchPage, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.0.scroll += 1;
        let start = state.1;
        let end = (start + state.2).min(self.docs.len());
        state.1 = end;
        Ok(SearchPage {
            scroll_id: Some("memory".to_string()),
            hits: self.docs[start..end].to_vec(),
        })
    }

    async fn clear_scroll(&self, _scroll_id: &str) -> Result<(), StoreError> {
        self.state.lock().unwrap().0.clear += 1;
        Ok(())
    }
}
