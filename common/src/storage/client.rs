use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::AppError,
    storage::{
        indexes::{IndexMapping, IndexStatus},
        pipeline::{InferencePipeline, UpdateByQuery, UpdateByQueryAck},
        selector::Selector,
        store::{
            BulkDocument, BulkFailure, BulkOutcome, ClusterInfo, DeleteOutcome, DocumentStore,
            Hit, SearchResults,
        },
    },
};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Partial updates may race a detached update-by-query on the same document.
const UPDATE_CONFLICT_RETRIES: u8 = 3;

/// How long and how often `connect` waits for the store to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound on the whole wait, backoff included.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts: doubling from `initial_backoff`, capped, jittered.
    fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor((initial_ms / 2).max(1))
            .max_delay(self.max_backoff)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Elasticsearch-compatible REST client.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl SearchClient {
    /// Builds a client without contacting the store.
    pub fn new(address: &str, credentials: Option<Credentials>) -> Result<Self, AppError> {
        let mut base_url = Url::parse(address)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url,
            credentials,
        })
    }

    /// Builds a client and waits until the store answers a liveness check.
    pub async fn connect(
        address: &str,
        credentials: Option<Credentials>,
        policy: &RetryPolicy,
    ) -> Result<Self, AppError> {
        let client = Self::new(address, credentials)?;
        let info = client.wait_until_ready(policy).await?;
        info!(
            address,
            cluster = %info.cluster_name,
            version = %info.version,
            "connected to search store"
        );
        Ok(client)
    }

    pub async fn wait_until_ready(&self, policy: &RetryPolicy) -> Result<ClusterInfo, AppError> {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let liveness = Retry::spawn(policy.delays(), move || async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst).saturating_add(1);
            self.ping().await.map_err(|err| {
                warn!(attempt, error = %err, "search store not ready");
                err
            })
        });

        match tokio::time::timeout(policy.timeout, liveness).await {
            Ok(Ok(info)) => Ok(info),
            Ok(Err(err)) => Err(AppError::ConnectionUnavailable {
                attempts: attempts.load(Ordering::SeqCst),
                reason: err.to_string(),
            }),
            Err(_) => Err(AppError::ConnectionUnavailable {
                attempts: attempts.load(Ordering::SeqCst),
                reason: format!("timed out after {}s", policy.timeout.as_secs()),
            }),
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AppError> {
        let url = self.base_url.join(path)?;
        let builder = self.http.request(method, url);
        Ok(match &self.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        })
    }

    /// Sends the request, turning any non-success status into `AppError::Store`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(StoreFailure::read(response).await.into_error())
    }
}

/// Error body returned by the store for a rejected request.
struct StoreFailure {
    status: StatusCode,
    kind: Option<String>,
    reason: String,
}

impl StoreFailure {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        let error = parsed.as_ref().and_then(|value| value.get("error"));

        let kind = error
            .and_then(|error| error.get("type"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let reason = error
            .and_then(|error| match error {
                Value::String(message) => Some(message.clone()),
                other => other.get("reason").and_then(Value::as_str).map(str::to_owned),
            })
            .unwrap_or(body);

        Self {
            status,
            kind,
            reason,
        }
    }

    fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    fn into_error(self) -> AppError {
        let reason = match self.kind {
            Some(kind) => format!("{kind}: {}", self.reason),
            None => self.reason,
        };
        AppError::Store {
            status: self.status.as_u16(),
            reason,
        }
    }
}

#[derive(Deserialize)]
struct InfoResponse {
    #[serde(default)]
    cluster_name: String,
    #[serde(default)]
    version: InfoVersion,
}

#[derive(Deserialize, Default)]
struct InfoVersion {
    #[serde(default)]
    number: String,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    #[serde(default)]
    total: Option<SearchTotal>,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchTotal {
    value: u64,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct ByQueryResponse {
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    deleted: Option<u64>,
    #[serde(default)]
    updated: Option<u64>,
    #[serde(default)]
    version_conflicts: u64,
    #[serde(default)]
    failures: Vec<Value>,
}

fn bulk_body(index: &str, documents: &[BulkDocument]) -> Result<String, AppError> {
    let mut body = String::new();
    for document in documents {
        let action = json!({ "index": { "_index": index, "_id": document.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&document.source)?);
        body.push('\n');
    }
    Ok(body)
}

fn bulk_outcome(response: BulkResponse) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    for item in response.items.into_iter().flat_map(HashMap::into_values) {
        if (200..300).contains(&item.status) {
            outcome.succeeded = outcome.succeeded.saturating_add(1);
            continue;
        }
        let reason = item
            .error
            .as_ref()
            .map(|error| match error.get("reason").and_then(Value::as_str) {
                Some(reason) => reason.to_string(),
                None => error.to_string(),
            })
            .unwrap_or_else(|| format!("status {}", item.status));
        outcome.failed = outcome.failed.saturating_add(1);
        outcome.failures.push(BulkFailure {
            id: item.id.unwrap_or_default(),
            reason,
        });
    }
    outcome
}

#[async_trait]
impl DocumentStore for SearchClient {
    async fn ping(&self) -> Result<ClusterInfo, AppError> {
        let response = self.send(self.request(Method::GET, "")?).await?;
        let info: InfoResponse = response.json().await?;
        Ok(ClusterInfo {
            cluster_name: info.cluster_name,
            version: info.version.number,
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
        let response = self.request(Method::HEAD, index)?.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(StoreFailure::read(response).await.into_error()),
        }
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> Result<IndexStatus, AppError> {
        let response = self
            .request(Method::PUT, index)?
            .json(&json!({ "mappings": mapping }))
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(IndexStatus::Created);
        }

        let failure = StoreFailure::read(response).await;
        if failure.is_kind(ALREADY_EXISTS) {
            debug!(index, "index created concurrently");
            return Ok(IndexStatus::AlreadyExists);
        }
        Err(failure.into_error())
    }

    async fn refresh(&self, index: &str) -> Result<(), AppError> {
        self.send(self.request(Method::POST, &format!("{index}/_refresh"))?)
            .await?;
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BulkDocument],
    ) -> Result<BulkOutcome, AppError> {
        if documents.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let request = self
            .request(Method::POST, "_bulk")?
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(index, documents)?);
        let response: BulkResponse = self.send(request).await?.json().await?;
        Ok(bulk_outcome(response))
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, AppError> {
        let response = self
            .request(Method::GET, &format!("{index}/_doc/{id}"))?
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreFailure::read(response).await.into_error());
        }

        let document: GetResponse = response.json().await?;
        Ok(match (document.found, document.source) {
            (true, Some(source)) => Some(Hit {
                id: document.id,
                source,
            }),
            _ => None,
        })
    }

    async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError> {
        let response = self
            .request(Method::POST, &format!("{index}/_update/{id}"))?
            .query(&[("retry_on_conflict", UPDATE_CONFLICT_RETRIES)])
            .json(&json!({ "doc": partial }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("document {id} in index {index}")));
        }
        if !response.status().is_success() {
            return Err(StoreFailure::read(response).await.into_error());
        }
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        selector: &Selector,
        size: usize,
    ) -> Result<SearchResults, AppError> {
        let request = self
            .request(Method::POST, &format!("{index}/_search"))?
            .json(&json!({
                "query": selector.to_query(),
                "size": size,
                "track_total_hits": true
            }));
        let response: SearchResponse = self.send(request).await?.json().await?;

        let hits: Vec<Hit> = response
            .hits
            .hits
            .into_iter()
            .map(|hit| Hit {
                id: hit.id,
                source: hit.source,
            })
            .collect();
        let total = response
            .hits
            .total
            .map_or(hits.len() as u64, |total| total.value);
        Ok(SearchResults { total, hits })
    }

    async fn count(&self, index: &str, selector: &Selector) -> Result<u64, AppError> {
        let request = self
            .request(Method::POST, &format!("{index}/_count"))?
            .json(&json!({ "query": selector.to_query() }));
        let response: CountResponse = self.send(request).await?.json().await?;
        Ok(response.count)
    }

    async fn delete_by_query(
        &self,
        index: &str,
        selector: &Selector,
    ) -> Result<DeleteOutcome, AppError> {
        let request = self
            .request(Method::POST, &format!("{index}/_delete_by_query"))?
            .query(&[
                ("wait_for_completion", "true"),
                ("refresh", "true"),
                ("conflicts", "proceed"),
            ])
            .json(&json!({ "query": selector.to_query() }));
        let response: ByQueryResponse = self.send(request).await?.json().await?;
        Ok(DeleteOutcome {
            deleted: response.deleted.unwrap_or_default(),
            version_conflicts: response.version_conflicts,
            failures: response.failures.len(),
        })
    }

    async fn put_pipeline(&self, pipeline: &InferencePipeline) -> Result<(), AppError> {
        let request = self
            .request(Method::PUT, &format!("_ingest/pipeline/{}", pipeline.id))?
            .json(&pipeline.body());
        self.send(request).await?;
        Ok(())
    }

    async fn update_by_query(
        &self,
        index: &str,
        selector: &Selector,
        request: &UpdateByQuery,
    ) -> Result<UpdateByQueryAck, AppError> {
        let mut params = vec![
            ("pipeline", request.pipeline.clone()),
            ("wait_for_completion", request.wait_for_completion.to_string()),
            ("refresh", "true".to_string()),
            ("conflicts", "proceed".to_string()),
        ];
        if let Some(max_docs) = request.max_docs {
            params.push(("max_docs", max_docs.to_string()));
        }

        let builder = self
            .request(Method::POST, &format!("{index}/_update_by_query"))?
            .query(&params)
            .json(&json!({ "query": selector.to_query() }));
        let response: ByQueryResponse = self.send(builder).await?.json().await?;
        Ok(UpdateByQueryAck {
            task: response.task,
            updated: response.updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(2),
            max_backoff: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    async fn client_for(server: &MockServer) -> SearchClient {
        SearchClient::new(&server.uri(), None).expect("client")
    }

    #[test]
    fn retry_policy_bounds_attempts() {
        let policy = fast_policy(4);
        assert_eq!(policy.delays().count(), 3);
        assert!(policy.delays().all(|delay| delay <= Duration::from_millis(5)));

        assert_eq!(fast_policy(1).delays().count(), 0);
    }

    #[tokio::test]
    async fn connect_reads_cluster_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cluster_name": "docker-cluster",
                "version": { "number": "8.13.0" }
            })))
            .mount(&server)
            .await;

        let client = SearchClient::connect(&server.uri(), None, &fast_policy(3))
            .await
            .expect("connect");
        let info = client.ping().await.expect("ping");
        assert_eq!(info.cluster_name, "docker-cluster");
        assert_eq!(info.version, "8.13.0");
    }

    #[tokio::test]
    async fn connect_gives_up_after_policy_is_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = SearchClient::connect(&server.uri(), None, &fast_policy(3))
            .await
            .err()
            .expect("store never becomes ready");

        match err {
            AppError::ConnectionUnavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bulk_counts_rejected_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-type", "application/x-ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": true,
                "items": [
                    { "index": { "_id": "0", "status": 201 } },
                    { "index": { "_id": "1", "status": 200 } },
                    { "index": {
                        "_id": "2",
                        "status": 400,
                        "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field [Antisemitic]" }
                    } }
                ]
            })))
            .mount(&server)
            .await;

        let documents: Vec<BulkDocument> = (0..3)
            .map(|i| BulkDocument {
                id: i.to_string(),
                source: json!({ "text": format!("post {i}") }),
            })
            .collect();
        let outcome = client_for(&server)
            .await
            .bulk_index("posts", &documents)
            .await
            .expect("bulk");

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].id, "2");
        assert_eq!(outcome.failures[0].reason, "failed to parse field [Antisemitic]");
    }

    #[test]
    fn bulk_body_is_newline_delimited() {
        let body = bulk_body(
            "posts",
            &[BulkDocument {
                id: "7".into(),
                source: json!({ "text": "hi" }),
            }],
        )
        .expect("body");

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let action: Value = serde_json::from_str(lines[0]).expect("action line");
        assert_eq!(action, json!({ "index": { "_index": "posts", "_id": "7" } }));
        assert!(body.ends_with('\n'));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_update/42"))
            .and(body_json(json!({ "doc": { "weapons": [] } })))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "type": "document_missing_exception", "reason": "[42]: document missing" },
                "status": 404
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .update("posts", "42", json!({ "weapons": [] }))
            .await
            .expect_err("missing document");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_retries_version_conflicts_server_side() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_update/3"))
            .and(query_param("retry_on_conflict", "3"))
            .and(body_json(json!({ "doc": { "weapons": ["gun"] } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "posts", "_id": "3", "result": "updated"
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .update("posts", "3", json!({ "weapons": ["gun"] }))
            .await
            .expect("update");
    }

    #[tokio::test]
    async fn count_sends_the_rendered_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_count"))
            .and(body_json(json!({ "query": { "exists": { "field": "weapons" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 4 })))
            .mount(&server)
            .await;

        let count = client_for(&server)
            .await
            .count("posts", &Selector::exists("weapons"))
            .await
            .expect("count");
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn concurrent_index_creation_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "type": "resource_already_exists_exception", "reason": "index [posts] already exists" },
                "status": 400
            })))
            .mount(&server)
            .await;

        let status = client_for(&server)
            .await
            .create_index("posts", &IndexMapping::new())
            .await
            .expect("create");
        assert_eq!(status, IndexStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn other_rejections_surface_as_store_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_search"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "type": "parsing_exception", "reason": "unknown query [bogus]" },
                "status": 400
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .search("posts", &Selector::all(), 10)
            .await
            .expect_err("rejected query");
        match err {
            AppError::Store { status, reason } => {
                assert_eq!(status, 400);
                assert_eq!(reason, "parsing_exception: unknown query [bogus]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn index_existence_follows_head_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.index_exists("posts").await.expect("head"));
        assert!(!client.index_exists("missing").await.expect("head"));
    }

    #[tokio::test]
    async fn search_returns_hits_and_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_search"))
            .and(body_json(json!({
                "query": { "exists": { "field": "weapons" } },
                "size": 2,
                "track_total_hits": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {
                    "total": { "value": 5, "relation": "eq" },
                    "hits": [
                        { "_id": "0", "_source": { "text": "a knife" } },
                        { "_id": "3", "_source": { "text": "a gun" } }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let results = client_for(&server)
            .await
            .search("posts", &Selector::exists("weapons"), 2)
            .await
            .expect("search");
        assert_eq!(results.total, 5);
        assert_eq!(results.ids(), vec!["0".to_string(), "3".to_string()]);
        assert_eq!(results.hits[1].str_field("text"), Some("a gun"));
    }

    #[tokio::test]
    async fn delete_by_query_waits_and_reports_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_delete_by_query"))
            .and(query_param("wait_for_completion", "true"))
            .and(query_param("refresh", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 12,
                "timed_out": false,
                "total": 4,
                "deleted": 4,
                "version_conflicts": 0,
                "failures": []
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .await
            .delete_by_query("posts", &Selector::all())
            .await
            .expect("delete");
        assert_eq!(outcome.deleted, 4);
        assert_eq!(outcome.failures, 0);
    }

    #[tokio::test]
    async fn update_by_query_passes_pipeline_and_throttle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/_update_by_query"))
            .and(query_param("pipeline", "sentiment-analysis"))
            .and(query_param("max_docs", "10"))
            .and(query_param("wait_for_completion", "false"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "task": "node-1:4711" })),
            )
            .mount(&server)
            .await;

        let ack = client_for(&server)
            .await
            .update_by_query(
                "posts",
                &Selector::all(),
                &UpdateByQuery {
                    pipeline: "sentiment-analysis".into(),
                    max_docs: Some(10),
                    wait_for_completion: false,
                },
            )
            .await
            .expect("update by query");
        assert_eq!(ack.task.as_deref(), Some("node-1:4711"));
        assert_eq!(ack.updated, None);
    }

    #[tokio::test]
    async fn get_maps_missing_documents_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/_doc/9"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "_id": "9", "found": false })),
            )
            .mount(&server)
            .await;

        let hit = client_for(&server)
            .await
            .get("posts", "9")
            .await
            .expect("get");
        assert!(hit.is_none());
    }
}
