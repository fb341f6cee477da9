//! Fake metrics store for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1. Serves the slice of the search REST API the store adapter
//! uses:
//! - `POST /{index}/_count`
//! - `POST /{index}/_search[?scroll=KEEP]`
//! - `POST /_search/scroll`
//! - `DELETE /_search/scroll`
//!
//! Every request must carry basic auth for `admin:secret`. Queries are
//! recorded but not evaluated; every document matches.
//!
//! # Example
//!
//! ```rust,no_run
//! let store = FakeStore::start(docs).await.unwrap();
//! let settings = store.settings();
//! // … run the pipeline against HttpSearchStore::new(settings)
//! assert_eq!(store.stats().await.cleared.len(), 1);
//! ```

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use benchres_store::{Document, StoreSettings};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
/// `base64("admin:secret")`
const EXPECTED_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

/// What the server saw, for assertions.
#[derive(Debug, Default, Clone)]
pub struct FakeStoreStats {
    pub count_calls: usize,
    pub search_calls: usize,
    pub scroll_calls: usize,
    /// Scroll ids released, in order.
    pub cleared: Vec<String>,
    /// Indices named in request paths.
    pub indices: Vec<String>,
    /// Bodies of `_search` requests.
    pub search_bodies: Vec<Value>,
    /// `scroll` query parameter of each `_search` request.
    pub scroll_params: Vec<Option<String>>,
}

#[derive(Default)]
struct StoreState {
    docs: Vec<Value>,
    /// Open scroll contexts: id → (offset, page size).
    contexts: HashMap<String, (usize, usize)>,
    next_context: usize,
    /// Respond 503 to the n-th scroll call (1-based).
    fail_scroll_on: Option<usize>,
    stats: FakeStoreStats,
}

type Shared = Arc<Mutex<StoreState>>;

/// Handle to the running fake store.
pub struct FakeStore {
    addr: SocketAddr,
    state: Shared,
}

impl FakeStore {
    /// Start the fake store on a random port. Returns once the server is
    /// listening.
    pub async fn start(docs: Vec<Document>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(StoreState {
            docs: docs.into_iter().map(Value::Object).collect(),
            ..StoreState::default()
        }));

        let app = Router::new()
            .route("/{index}/_count", post(count))
            .route("/{index}/_search", post(search))
            .route("/_search/scroll", post(scroll).delete(clear_scroll))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Base URL for the API (e.g. `http://127.0.0.1:PORT`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Settings that point an `HttpSearchStore` at this server.
    pub fn settings(&self) -> StoreSettings {
        StoreSettings {
            base_url: self.base_url(),
            index: "benchmark-results-*".into(),
            username: USERNAME.into(),
            password: PASSWORD.into(),
            scroll_keep_alive: "1m".into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Make the n-th scroll call (1-based) fail with 503.
    pub async fn fail_scroll_on(&self, n: usize) {
        self.state.lock().await.fail_scroll_on = Some(n);
    }

    pub async fn stats(&self) -> FakeStoreStats {
        self.state.lock().await.stats.clone()
    }

    /// Scroll contexts that were opened and never released.
    pub async fn open_contexts(&self) -> usize {
        self.state.lock().await.contexts.len()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(EXPECTED_AUTH)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "missing authentication credentials" })),
    )
        .into_response()
}

fn page(docs: &[Value], scroll_id: Option<&str>) -> Value {
    let hits: Vec<Value> = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| json!({ "_id": i.to_string(), "_source": doc }))
        .collect();
    let mut body = json!({ "took": 1, "hits": { "hits": hits } });
    if let Some(id) = scroll_id {
        body["_scroll_id"] = json!(id);
    }
    body
}

async fn count(
    Path(index): Path<String>,
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().await;
    state.stats.count_calls += 1;
    state.stats.indices.push(index);
    Json(json!({ "count": state.docs.len() })).into_response()
}

async fn search(
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().await;
    state.stats.search_calls += 1;
    state.stats.indices.push(index);
    state.stats.scroll_params.push(params.get("scroll").cloned());
    state.stats.search_bodies.push(body.clone());

    let size = body["size"].as_u64().unwrap_or(10) as usize;
    let end = size.min(state.docs.len());
    let scroll_id = params.contains_key("scroll").then(|| {
        state.next_context += 1;
        let id = format!("ctx-{}", state.next_context);
        state.contexts.insert(id.clone(), (end, size));
        id
    });
    Json(page(&state.docs[..end], scroll_id.as_deref())).into_response()
}

async fn scroll(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().await;
    state.stats.scroll_calls += 1;
    if state.fail_scroll_on == Some(state.stats.scroll_calls) {
        return (StatusCode::SERVICE_UNAVAILABLE, "shard failure").into_response();
    }

    let id = body["scroll_id"].as_str().unwrap_or_default().to_string();
    let Some((offset, size)) = state.contexts.get(&id).copied() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "search_context_missing_exception" })),
        )
            .into_response();
    };
    let end = (offset + size).min(state.docs.len());
    state.contexts.insert(id.clone(), (end, size));
    Json(page(&state.docs[offset..end], Some(id.as_str()))).into_response()
}

async fn clear_scroll(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().await;
    let ids: Vec<String> = body["scroll_id"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let mut freed = 0;
    for id in ids {
        if state.contexts.remove(&id).is_some() {
            freed += 1;
        }
        state.stats.cleared.push(id);
    }
    if freed == 0 {
        return (StatusCode::NOT_FOUND, Json(json!({ "succeeded": true, "num_freed": 0 })))
            .into_response();
    }
    Json(json!({ "succeeded": true, "num_freed": freed })).into_response()
}
