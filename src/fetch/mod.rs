//! Search-index client: startup health probe with bounded reconnect, index
//! existence checks, and paginated document fetches against the MeiliSearch
//! HTTP API.
//!
//! The orchestrator talks to the index through the [`DocumentSource`] trait
//! so cycles can be exercised in tests without a live instance.

use crate::config::MeiliConfig;
use crate::document::Document;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Fixed page size for document fetches.
pub const PAGE_SIZE: usize = 100;

const CONNECT_ATTEMPTS: u32 = 12;
const CONNECT_WAIT: Duration = Duration::from_secs(5);

/// One page of documents plus the index's total document count.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsPage {
    pub results: Vec<Document>,
    pub total: usize,
}

/// The paginated document-fetch contract the orchestrator depends on.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Whether the named index exists.
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Fetch one page of documents. `page` counts from zero and translates
    /// to a document offset of `page * page_size`.
    async fn fetch_page(
        &self,
        index: &str,
        filter: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<DocumentsPage>;
}

/// Fetch the full document set for an index, paging until the reported
/// total is reached or a page comes back empty.
pub async fn fetch_all(
    source: &dyn DocumentSource,
    index: &str,
    filter: Option<&str>,
) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    let mut page = 0;

    loop {
        let batch = source.fetch_page(index, filter, page, PAGE_SIZE).await?;
        if batch.results.is_empty() {
            break;
        }

        docs.extend(batch.results);
        page += 1;

        if page * PAGE_SIZE >= batch.total {
            break;
        }
    }

    Ok(docs)
}

/// HTTP client for a MeiliSearch instance.
pub struct MeiliClient {
    http: reqwest::Client,
    host: String,
    api_key: Option<String>,
}

impl MeiliClient {
    /// Connect to the configured instance, probing its health endpoint with
    /// a bounded number of attempts. Gives up early when shutdown is
    /// signalled between attempts; exhausting the attempts is a startup
    /// failure.
    pub async fn connect(
        cfg: &MeiliConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        Self::connect_with(cfg, CONNECT_ATTEMPTS, CONNECT_WAIT, shutdown).await
    }

    /// [`MeiliClient::connect`] with explicit attempt count and wait.
    pub async fn connect_with(
        cfg: &MeiliConfig,
        attempts: u32,
        wait: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let client = Self {
            http: reqwest::Client::new(),
            host: cfg.host.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        };

        for attempt in 1..=attempts {
            if client.healthy().await {
                info!(host = %client.host, "connected to MeiliSearch");
                return Ok(client);
            }

            warn!(
                host = %client.host,
                attempt,
                attempts,
                "MeiliSearch not reachable, retrying"
            );

            if attempt < attempts {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => bail!("shutdown requested during connect"),
                }
            }
        }

        bail!(
            "MeiliSearch at {} not reachable after {attempts} attempts",
            client.host
        )
    }

    /// Whether the instance currently reports healthy.
    pub async fn healthy(&self) -> bool {
        let url = format!("{}/health", self.host);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl DocumentSource for MeiliClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = format!("{}/indexes/{index}", self.host);
        let resp = self
            .request(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("failed to query index {index}"))?;

        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            bail!("unexpected status {status} checking index {index}")
        }
    }

    async fn fetch_page(
        &self,
        index: &str,
        filter: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<DocumentsPage> {
        let url = format!("{}/indexes/{index}/documents/fetch", self.host);
        let body = json!({
            "offset": page * page_size,
            "limit": page_size,
            "filter": filter,
        });

        let resp = self
            .request(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to fetch documents for index {index}"))?
            .error_for_status()
            .with_context(|| format!("document fetch rejected for index {index}"))?;

        resp.json()
            .await
            .with_context(|| format!("malformed documents response for index {index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg(host: &str) -> MeiliConfig {
        MeiliConfig {
            host: host.to_string(),
            api_key: None,
        }
    }

    async fn connected(server: &MockServer) -> MeiliClient {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "available"})))
            .mount(server)
            .await;

        let (_tx, rx) = watch::channel(false);
        MeiliClient::connect_with(&cfg(&server.uri()), 1, Duration::from_millis(1), rx)
            .await
            .unwrap()
    }

    fn page_body(ids: std::ops::Range<usize>, total: usize) -> serde_json::Value {
        json!({
            "results": ids.map(|i| json!({"id": i})).collect::<Vec<_>>(),
            "offset": 0,
            "limit": PAGE_SIZE,
            "total": total,
        })
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_attempts() {
        let (_tx, rx) = watch::channel(false);
        let result = MeiliClient::connect_with(
            &cfg("http://127.0.0.1:1"),
            2,
            Duration::from_millis(5),
            rx,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connect_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let result = MeiliClient::connect_with(
            &cfg("http://127.0.0.1:1"),
            10,
            Duration::from_secs(60),
            rx,
        )
        .await;
        // Fails via the shutdown branch instead of waiting out ten minutes.
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_index_exists() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("GET"))
            .and(path("/indexes/movies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uid": "movies"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/ghosts"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client.index_exists("movies").await.unwrap());
        assert!(!client.index_exists("ghosts").await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_all_paginates() {
        let server = MockServer::start().await;
        let client = connected(&server).await;
        let total = 250;

        for (offset, range) in [(0, 0..100), (100, 100..200), (200, 200..250)] {
            Mock::given(method("POST"))
                .and(path("/indexes/movies/documents/fetch"))
                .and(body_json(json!({
                    "offset": offset,
                    "limit": PAGE_SIZE,
                    "filter": null,
                })))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(page_body(range, total)),
                )
                .mount(&server)
                .await;
        }

        let docs = fetch_all(&client, "movies", None).await.unwrap();
        assert_eq!(docs.len(), total);
        assert_eq!(docs[0]["id"], json!(0));
        assert_eq!(docs[249]["id"], json!(249));
    }

    #[tokio::test]
    async fn test_fetch_all_single_page() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/fetch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0..3, 3)))
            .mount(&server)
            .await;

        let docs = fetch_all(&client, "movies", None).await.unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_passes_filter_through() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/fetch"))
            .and(body_json(json!({
                "offset": 0,
                "limit": PAGE_SIZE,
                "filter": "genre = 'thriller'",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0..1, 1)))
            .mount(&server)
            .await;

        let docs = fetch_all(&client, "movies", Some("genre = 'thriller'"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_page_error_propagates() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/fetch"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(fetch_all(&client, "movies", None).await.is_err());
    }
}
