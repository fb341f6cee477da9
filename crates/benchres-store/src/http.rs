//! [`SearchStore`] over the OpenSearch/Elasticsearch REST API.

use crate::{Document, SearchPage, SearchRequest, SearchStore, StoreError};
use async_trait::async_trait;
use benchres_core::Query;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Connection settings, resolved from config and CLI.
#[derive(Clone)]
pub struct StoreSettings {
    /// `scheme://host:port`, no trailing slash needed.
    pub base_url: String,
    /// Index or index pattern to search.
    pub index: String,
    pub username: String,
    pub password: String,
    /// How long the store keeps a scroll context alive between pages, e.g. `5m`.
    pub scroll_keep_alive: String,
    pub timeout: Duration,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("base_url", &self.base_url)
            .field("index", &self.index)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scroll_keep_alive", &self.scroll_keep_alive)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct HttpSearchStore {
    client: reqwest::Client,
    base_url: String,
    index: String,
    username: String,
    password: String,
    scroll_keep_alive: String,
}

impl HttpSearchStore {
    pub fn new(settings: StoreSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|source| StoreError::Transport {
                url: settings.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            index: settings.index,
            username: settings.username,
            password: settings.password,
            scroll_keep_alive: settings.scroll_keep_alive,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, method: Method, url: &str, body: &Value) -> Result<(StatusCode, String), StoreError> {
        let transport = |source| StoreError::Transport {
            url: url.to_string(),
            source,
        };
        tracing::trace!(%method, url, "store request");
        let response = self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        Ok((status, text))
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, url: &str, body: &Value) -> Result<T, StoreError> {
        let (status, text) = self.send(method, url, body).await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|err| StoreError::Malformed {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Document,
}

impl From<SearchResponse> for SearchPage {
    fn from(response: SearchResponse) -> Self {
        SearchPage {
            scroll_id: response.scroll_id,
            hits: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
        }
    }
}

#[async_trait]
impl SearchStore for HttpSearchStore {
    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        let url = self.url(&format!("{}/_count", self.index));
        let body = json!({ "query": query.to_json() });
        let response: CountResponse = self.call(Method::POST, &url, &body).await?;
        Ok(response.count)
    }

    async fn search(&self, request: SearchRequest<'_>) -> Result<SearchPage, StoreError> {
        let mut url = self.url(&format!("{}/_search", self.index));
        if request.scroll {
            url.push_str("?scroll=");
            url.push_str(&self.scroll_keep_alive);
        }
        let body = json!({
            "size": request.size,
            "query": request.query.to_json(),
            "sort": ["_doc"],
        });
        let response: SearchResponse = self.call(Method::POST, &url, &body).await?;
        Ok(response.into())
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage, StoreError> {
        let url = self.url("_search/scroll");
        let body = json!({ "scroll": self.scroll_keep_alive, "scroll_id": scroll_id });
        let response: SearchResponse = self.call(Method::POST, &url, &body).await?;
        Ok(response.into())
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), StoreError> {
        let url = self.url("_search/scroll");
        let body = json!({ "scroll_id": [scroll_id] });
        let (status, text) = self.send(Method::DELETE, &url, &body).await?;
        // 404: the context already expired
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(StoreError::Status {
            url,
            status: status.as_u16(),
            body: text,
        })
    }
}
