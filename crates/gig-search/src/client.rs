//! Search engine client over the Elasticsearch HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::readiness::SearchEngine;
use crate::{Error, Result, SearchConfig, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// Error type reported by the engine when an index is created concurrently.
const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Subset of the `GET /_cluster/health` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterHealth {
    /// Name of the cluster.
    #[serde(default)]
    pub cluster_name: String,
    /// Cluster status (`green`, `yellow` or `red`).
    pub status: String,
}

/// Outcome of an index creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreation {
    /// The index was created by this call.
    Created,
    /// Another writer created the index first.
    AlreadyExists,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorCause,
}

#[derive(Debug, Deserialize)]
struct ErrorCause {
    #[serde(rename = "type")]
    kind: String,
}

struct SearchClientInner {
    http: Client,
    base_url: Url,
    config: SearchConfig,
}

impl std::fmt::Debug for SearchClientInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClientInner")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Search engine client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone, Debug)]
pub struct SearchClient {
    inner: Arc<SearchClientInner>,
}

impl SearchClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created. No request is sent.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url()?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("gig-search/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            url = %base_url,
            index = %config.search_index,
            "Search client created"
        );

        let inner = SearchClientInner {
            http,
            base_url,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| Error::invalid_config(format!("cannot build '{path}' URL: {e}")))
    }

    /// Fetches cluster health once.
    pub async fn cluster_health(&self) -> Result<ClusterHealth> {
        let url = self.endpoint("_cluster/health")?;
        let response = self.inner.http.get(url).send().await?;
        let response = expect_success("cluster_health", response).await?;
        Ok(response.json().await?)
    }

    /// Checks connectivity, retrying with [`SearchConfig::connect_retry`].
    ///
    /// Gives up after the configured number of attempts or on the first
    /// non-retryable error.
    pub async fn check_connection(&self) -> Result<ClusterHealth> {
        let retry = self.inner.config.connect_retry();

        let health = retry
            .retry(|| self.cluster_health())
            .await
            .map_err(|err| {
                if !err.is_retryable() {
                    return err;
                }
                Error::Unreachable {
                    attempts: retry.total_attempts(),
                    reason: err.to_string(),
                }
            })?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            cluster = %health.cluster_name,
            status = %health.status,
            "Search engine health status"
        );
        Ok(health)
    }

    /// Returns whether `index` exists.
    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.endpoint(index)?;
        let response = self.inner.http.head(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Error::status("index_exists", status.as_u16(), "")),
        }
    }

    /// Creates `index` and refreshes it.
    ///
    /// A concurrent creation reported by the engine is returned as
    /// [`IndexCreation::AlreadyExists`] rather than as an error.
    pub async fn create_index(&self, index: &str) -> Result<IndexCreation> {
        let url = self.endpoint(index)?;
        let response = self.inner.http.put(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_already_exists(&body) {
                tracing::debug!(
                    target: TRACING_TARGET_CLIENT,
                    index,
                    "Index created concurrently"
                );
                return Ok(IndexCreation::AlreadyExists);
            }
            return Err(Error::status("create_index", status.as_u16(), body));
        }

        self.refresh(index).await?;
        Ok(IndexCreation::Created)
    }

    /// Refreshes `index` so it is visible to searches.
    pub async fn refresh(&self, index: &str) -> Result<()> {
        let url = self.endpoint(&format!("{index}/_refresh"))?;
        let response = self.inner.http.post(url).send().await?;
        expect_success("refresh", response).await?;
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for SearchClient {
    async fn check_connection(&self) -> Result<ClusterHealth> {
        SearchClient::check_connection(self).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        SearchClient::index_exists(self, index).await
    }

    async fn create_index(&self, index: &str) -> Result<IndexCreation> {
        SearchClient::create_index(self, index).await
    }
}

async fn expect_success(operation: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::status(operation, status.as_u16(), body))
}

fn is_already_exists(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body).is_ok_and(|body| body.error.kind == ALREADY_EXISTS)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct FakeEngine {
        exists: Arc<AtomicBool>,
        race: Arc<AtomicBool>,
        creates: Arc<AtomicU32>,
        refreshes: Arc<AtomicU32>,
    }

    async fn health() -> axum::Json<serde_json::Value> {
        axum::Json(json!({ "cluster_name": "jobber", "status": "green" }))
    }

    async fn head_index(State(engine): State<FakeEngine>) -> StatusCode {
        if engine.exists.load(Ordering::SeqCst) {
            StatusCode::OK
        } else {
            StatusCode::NOT_FOUND
        }
    }

    async fn put_index(
        State(engine): State<FakeEngine>,
        Path(index): Path<String>,
    ) -> (StatusCode, axum::Json<serde_json::Value>) {
        engine.creates.fetch_add(1, Ordering::SeqCst);
        if engine.race.load(Ordering::SeqCst) || engine.exists.swap(true, Ordering::SeqCst) {
            let reason = format!("index [{index}] already exists");
            let body = json!({
                "error": { "type": ALREADY_EXISTS, "reason": reason },
                "status": 400
            });
            return (StatusCode::BAD_REQUEST, axum::Json(body));
        }
        (StatusCode::OK, axum::Json(json!({ "acknowledged": true, "index": index })))
    }

    async fn refresh_index(State(engine): State<FakeEngine>) -> StatusCode {
        engine.refreshes.fetch_add(1, Ordering::SeqCst);
        StatusCode::OK
    }

    async fn spawn_engine(engine: FakeEngine) -> anyhow::Result<SocketAddr> {
        let router = Router::new()
            .route("/_cluster/health", get(health))
            .route("/{index}", put(put_index).head(head_index))
            .route("/{index}/_refresh", post(refresh_index))
            .with_state(engine);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(addr)
    }

    fn client_for(addr: SocketAddr) -> anyhow::Result<SearchClient> {
        Ok(SearchClient::new(SearchConfig::new(format!("http://{addr}")))?)
    }

    #[tokio::test]
    async fn reports_cluster_health() -> anyhow::Result<()> {
        let addr = spawn_engine(FakeEngine::default()).await?;
        let health = client_for(addr)?.check_connection().await?;
        assert_eq!(health.status, "green");
        assert_eq!(health.cluster_name, "jobber");
        Ok(())
    }

    #[tokio::test]
    async fn creates_missing_index_and_refreshes() -> anyhow::Result<()> {
        let engine = FakeEngine::default();
        let addr = spawn_engine(engine.clone()).await?;
        let client = client_for(addr)?;

        assert!(!client.index_exists("gigs").await?);
        assert_eq!(client.create_index("gigs").await?, IndexCreation::Created);
        assert!(client.index_exists("gigs").await?);
        assert_eq!(engine.refreshes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creation_is_not_an_error() -> anyhow::Result<()> {
        let engine = FakeEngine::default();
        engine.race.store(true, Ordering::SeqCst);
        let addr = spawn_engine(engine.clone()).await?;

        let outcome = client_for(addr)?.create_index("gigs").await?;

        assert_eq!(outcome, IndexCreation::AlreadyExists);
        assert_eq!(engine.refreshes.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_engine_fails_after_attempts() -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let config = SearchConfig::new(format!("http://{addr}")).with_connect_attempts(1);
        let result = SearchClient::new(config)?.check_connection().await;

        assert!(matches!(result, Err(Error::Unreachable { attempts: 1, .. })));
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected_without_io() {
        let result = SearchClient::new(SearchConfig::new("mailto:search"));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn recognizes_already_exists_body() {
        let body = r#"{"error":{"type":"resource_already_exists_exception"},"status":400}"#;
        assert!(is_already_exists(body));
        assert!(!is_already_exists(r#"{"error":{"type":"illegal_argument_exception"}}"#));
        assert!(!is_already_exists("not json"));
    }
}
