use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::AppError,
    storage::{
        indexes::{IndexMapping, IndexStatus},
        pipeline::{InferencePipeline, UpdateByQuery, UpdateByQueryAck},
        selector::Selector,
    },
};

/// Operations the pipeline needs from the document store.
///
/// Implemented over HTTP by [`SearchClient`](crate::storage::client::SearchClient)
/// and in-process by `MemoryStore` for tests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Liveness check.
    async fn ping(&self) -> Result<ClusterInfo, AppError>;

    async fn index_exists(&self, index: &str) -> Result<bool, AppError>;

    /// Creates the index. Losing a creation race reports `AlreadyExists`.
    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> Result<IndexStatus, AppError>;

    /// Makes every prior write visible to search.
    async fn refresh(&self, index: &str) -> Result<(), AppError>;

    /// Writes (create or overwrite) every document in one request.
    /// Rejected documents are counted, never raised.
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BulkDocument],
    ) -> Result<BulkOutcome, AppError>;

    async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, AppError>;

    /// Merges `partial` into an existing document; `NotFound` when `id` is absent.
    async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError>;

    /// One page of up to `size` matching documents.
    async fn search(
        &self,
        index: &str,
        selector: &Selector,
        size: usize,
    ) -> Result<SearchResults, AppError>;

    async fn count(&self, index: &str, selector: &Selector) -> Result<u64, AppError>;

    /// Deletes every match and returns once the deletion is applied.
    async fn delete_by_query(
        &self,
        index: &str,
        selector: &Selector,
    ) -> Result<DeleteOutcome, AppError>;

    /// Registers or overwrites an ingest pipeline.
    async fn put_pipeline(&self, pipeline: &InferencePipeline) -> Result<(), AppError>;

    async fn update_by_query(
        &self,
        index: &str,
        selector: &Selector,
        request: &UpdateByQuery,
    ) -> Result<UpdateByQueryAck, AppError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkDocument {
    pub id: String,
    pub source: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn absorb(&mut self, other: BulkOutcome) {
        self.succeeded = self.succeeded.saturating_add(other.succeeded);
        self.failed = self.failed.saturating_add(other.failed);
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub source: Value,
}

impl Hit {
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.source.get(field).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Total matches in the index, which may exceed `hits.len()`.
    pub total: u64,
    pub hits: Vec<Hit>,
}

impl SearchResults {
    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
    pub version_conflicts: u64,
    pub failures: usize,
}
