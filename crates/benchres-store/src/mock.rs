//! In-memory [`SearchStore`] that records every call.

use crate::{Document, SearchPage, SearchRequest, SearchStore, StoreError};
use async_trait::async_trait;
use benchres_core::Query;
use serde_json::json;
use std::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Calls {
    pub count: usize,
    pub search: usize,
    pub scroll: usize,
    pub clear: Vec<String>,
    /// Size and scroll flag of each search request.
    pub search_requests: Vec<(usize, bool)>,
}

#[derive(Default)]
struct ScrollState {
    offset: usize,
    page_size: usize,
    generation: usize,
}

#[derive(Default)]
pub struct MockStore {
    pub(crate) docs: Vec<Document>,
    /// Fail the n-th scroll call (1-based).
    pub fail_scroll_on: Option<usize>,
    pub fail_clear: bool,
    /// Return a fresh scroll id on every page.
    pub rotate_scroll_ids: bool,
    pub(crate) calls: Mutex<Calls>,
    pub(crate) scroll: Mutex<ScrollState>,
}

impl MockStore {
    pub fn with_docs(n: usize) -> Self {
        Self {
            docs: (0..n)
                .map(|i| match json!({ "seq": i, "nested": { "even": i % 2 == 0 } }) {
                    serde_json::Value::Object(map) => map,
                    _ => unreachable!(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_docs(docs: Vec<Document>) -> Self {
        Self {
            docs,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    fn scroll_id(&self, generation: usize) -> String {
        if self.rotate_scroll_ids {
            format!("scroll-{generation}")
        } else {
            "scroll-0".to_string()
        }
    }
}

#[async_trait]
impl SearchStore for MockStore {
    async fn count(&self, _query: &Query) -> Result<u64, StoreError> {
        self.calls.lock().unwrap().count += 1;
        Ok(self.docs.len() as u64)
    }

    async fn search(&self, request: SearchRequest<'_>) -> Result<SearchPage, StoreError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.search += 1;
            calls.search_requests.push((request.size, request.scroll));
        }
        let end = request.size.min(self.docs.len());
        let hits = self.docs[..end].to_vec();
        if !request.scroll {
            return Ok(SearchPage {
                scroll_id: None,
                hits,
            });
        }
        let mut state = self.scroll.lock().unwrap();
        *state = ScrollState {
            offset: end,
            page_size: request.size,
            generation: 0,
        };
        Ok(SearchPage {
            scroll_id: Some(self.scroll_id(0)),
            hits,
        })
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage, StoreError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.scroll += 1;
            calls.scroll
        };
        if self.fail_scroll_on == Some(n) {
            return Err(StoreError::Status {
                url: "mock://_search/scroll".into(),
                status: 503,
                body: "unavailable".into(),
            });
        }
        let mut state = self.scroll.lock().unwrap();
        assert_eq!(scroll_id, self.scroll_id(state.generation), "stale scroll id");
        let end = (state.offset + state.page_size).min(self.docs.len());
        let hits = self.docs[state.offset..end].to_vec();
        state.offset = end;
        state.generation += 1;
        Ok(SearchPage {
            scroll_id: Some(self.scroll_id(state.generation)),
            hits,
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().clear.push(scroll_id.to_string());
        if self.fail_clear {
            return Err(StoreError::Status {
                url: "mock://_search/scroll".into(),
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(())
    }
}
