//! In-process [`DocumentStore`] for tests.
//!
//! Selectors are evaluated with the store's semantics where they matter to the
//! pipeline: `exists` ignores nulls and empty lists, `term` compares numbers and
//! numeric strings by value, `match` is lowercase token overlap.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::AppError,
    storage::{
        indexes::{IndexMapping, IndexStatus},
        pipeline::{InferencePipeline, UpdateByQuery, UpdateByQueryAck},
        selector::{BoolSelector, Selector},
        store::{
            BulkDocument, BulkFailure, BulkOutcome, ClusterInfo, DeleteOutcome, DocumentStore,
            Hit, SearchResults,
        },
    },
};

/// Stand-in for a hosted model: text in, label out.
pub type ModelFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Default)]
struct IndexState {
    mapping: IndexMapping,
    documents: BTreeMap<String, Value>,
}

#[derive(Default)]
struct MemoryState {
    indexes: BTreeMap<String, IndexState>,
    pipelines: HashMap<String, InferencePipeline>,
    models: HashMap<String, ModelFn>,
    rejected_ids: HashSet<String>,
    failing_operations: HashSet<&'static str>,
    calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts `model` under `model_id` for pipelines that reference it.
    #[must_use]
    pub fn with_model<F>(self, model_id: &str, model: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.lock().models.insert(model_id.to_string(), Arc::new(model));
        self
    }

    /// Bulk writes of these ids are rejected as unparseable.
    #[must_use]
    pub fn rejecting_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .rejected_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Every call to `operation` fails as if the store were unreachable.
    pub fn fail_operation(&self, operation: &'static str) {
        self.lock().failing_operations.insert(operation);
    }

    pub fn restore_operation(&self, operation: &'static str) {
        self.lock().failing_operations.remove(operation);
    }

    pub fn index_names(&self) -> Vec<String> {
        self.lock().indexes.keys().cloned().collect()
    }

    pub fn mapping(&self, index: &str) -> Option<IndexMapping> {
        self.lock()
            .indexes
            .get(index)
            .map(|state| state.mapping.clone())
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.lock()
            .indexes
            .get(index)
            .and_then(|state| state.documents.get(id).cloned())
    }

    /// Document ids in `index`, in id order.
    pub fn ids(&self, index: &str) -> Vec<String> {
        let state = self.lock();
        let mut ids: Vec<String> = state
            .indexes
            .get(index)
            .map(|state| state.documents.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_by(|a, b| compare_ids(a, b));
        ids
    }

    /// Writes a document directly, bypassing bulk accounting.
    pub fn insert(&self, index: &str, id: &str, source: Value) {
        self.lock()
            .indexes
            .entry(index.to_string())
            .or_default()
            .documents
            .insert(id.to_string(), source);
    }

    /// Drops a document directly, returning its last source.
    pub fn remove(&self, index: &str, id: &str) -> Option<Value> {
        self.lock()
            .indexes
            .get_mut(index)
            .and_then(|state| state.documents.remove(id))
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        let mut state = self.lock();
        state.calls.push(operation);
        if state.failing_operations.contains(operation) {
            return Err(AppError::Store {
                status: 503,
                reason: format!("unavailable: {operation} failed"),
            });
        }
        Ok(state)
    }
}

fn missing_index(index: &str) -> AppError {
    AppError::Store {
        status: 404,
        reason: format!("index_not_found_exception: no such index [{index}]"),
    }
}

fn index_mut<'a>(
    state: &'a mut MemoryState,
    index: &str,
) -> Result<&'a mut IndexState, AppError> {
    state
        .indexes
        .get_mut(index)
        .ok_or_else(|| missing_index(index))
}

/// Numeric ids sort numerically, so positional ids come back in source order.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn matching_ids(state: &IndexState, selector: &Selector) -> Vec<String> {
    let mut ids: Vec<String> = state
        .documents
        .iter()
        .filter(|(_, source)| matches(selector, source))
        .map(|(id, _)| id.clone())
        .collect();
    ids.sort_by(|a, b| compare_ids(a, b));
    ids
}

fn matches(selector: &Selector, source: &Value) -> bool {
    match selector {
        Selector::MatchAll => true,
        Selector::Term { field, value } => field_values(source, field)
            .iter()
            .any(|candidate| values_equal(candidate, value)),
        Selector::Terms { field, values } => field_values(source, field)
            .iter()
            .any(|candidate| values.iter().any(|value| values_equal(candidate, value))),
        Selector::Match { field, query } => {
            let wanted = tokens(query);
            field_values(source, field)
                .iter()
                .flat_map(|value| tokens(&scalar_text(value)))
                .any(|token| wanted.contains(&token))
        }
        Selector::Exists { field } => !field_values(source, field).is_empty(),
        Selector::MinListLength { field, min } => field_values(source, field).len() >= *min,
        Selector::Bool(clauses) => matches_bool(clauses, source),
    }
}

fn matches_bool(clauses: &BoolSelector, source: &Value) -> bool {
    clauses.must.iter().all(|clause| matches(clause, source))
        && !clauses.must_not.iter().any(|clause| matches(clause, source))
        && clauses
            .should
            .iter()
            .filter(|clause| matches(clause, source))
            .count()
            >= clauses.required_should()
}

/// Non-null values held by `field`; lists are flattened.
fn field_values<'a>(source: &'a Value, field: &str) -> Vec<&'a Value> {
    match source.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|item| !item.is_null()).collect(),
        Some(value) => vec![value],
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (numeric(a), numeric(b)) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => scalar_text(a) == scalar_text(b),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn merge(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                match existing.get_mut(&key) {
                    Some(current @ Value::Object(_)) if value.is_object() => merge(current, value),
                    _ => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, partial) => *target = partial,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<ClusterInfo, AppError> {
        let _state = self.enter("ping")?;
        Ok(ClusterInfo {
            cluster_name: "memory".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
        let state = self.enter("index_exists")?;
        Ok(state.indexes.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> Result<IndexStatus, AppError> {
        let mut state = self.enter("create_index")?;
        if state.indexes.contains_key(index) {
            return Ok(IndexStatus::AlreadyExists);
        }
        state.indexes.insert(
            index.to_string(),
            IndexState {
                mapping: mapping.clone(),
                documents: BTreeMap::new(),
            },
        );
        Ok(IndexStatus::Created)
    }

    async fn refresh(&self, index: &str) -> Result<(), AppError> {
        let mut state = self.enter("refresh")?;
        index_mut(&mut state, index).map(|_| ())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BulkDocument],
    ) -> Result<BulkOutcome, AppError> {
        let mut state = self.enter("bulk_index")?;
        let rejected = state.rejected_ids.clone();
        // Like the real store, bulk writes create the index on demand.
        let target = state.indexes.entry(index.to_string()).or_default();

        let mut outcome = BulkOutcome::default();
        for document in documents {
            if rejected.contains(&document.id) {
                outcome.failed = outcome.failed.saturating_add(1);
                outcome.failures.push(BulkFailure {
                    id: document.id.clone(),
                    reason: "mapper_parsing_exception".to_string(),
                });
                continue;
            }
            target
                .documents
                .insert(document.id.clone(), document.source.clone());
            outcome.succeeded = outcome.succeeded.saturating_add(1);
        }
        Ok(outcome)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, AppError> {
        let mut state = self.enter("get")?;
        let target = index_mut(&mut state, index)?;
        Ok(target.documents.get(id).map(|source| Hit {
            id: id.to_string(),
            source: source.clone(),
        }))
    }

    async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError> {
        let mut state = self.enter("update")?;
        let not_found = || AppError::NotFound(format!("document {id} in index {index}"));
        let target = state.indexes.get_mut(index).ok_or_else(not_found)?;
        let document = target.documents.get_mut(id).ok_or_else(not_found)?;
        merge(document, partial);
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        selector: &Selector,
        size: usize,
    ) -> Result<SearchResults, AppError> {
        let mut state = self.enter("search")?;
        let target = index_mut(&mut state, index)?;
        let ids = matching_ids(target, selector);
        let hits = ids
            .iter()
            .take(size)
            .filter_map(|id| {
                target.documents.get(id).map(|source| Hit {
                    id: id.clone(),
                    source: source.clone(),
                })
            })
            .collect();
        Ok(SearchResults {
            total: ids.len() as u64,
            hits,
        })
    }

    async fn count(&self, index: &str, selector: &Selector) -> Result<u64, AppError> {
        let mut state = self.enter("count")?;
        let target = index_mut(&mut state, index)?;
        Ok(matching_ids(target, selector).len() as u64)
    }

    async fn delete_by_query(
        &self,
        index: &str,
        selector: &Selector,
    ) -> Result<DeleteOutcome, AppError> {
        let mut state = self.enter("delete_by_query")?;
        let target = index_mut(&mut state, index)?;
        let ids = matching_ids(target, selector);
        for id in &ids {
            target.documents.remove(id);
        }
        Ok(DeleteOutcome {
            deleted: ids.len() as u64,
            ..DeleteOutcome::default()
        })
    }

    async fn put_pipeline(&self, pipeline: &InferencePipeline) -> Result<(), AppError> {
        let mut state = self.enter("put_pipeline")?;
        state
            .pipelines
            .insert(pipeline.id.clone(), pipeline.clone());
        Ok(())
    }

    async fn update_by_query(
        &self,
        index: &str,
        selector: &Selector,
        request: &UpdateByQuery,
    ) -> Result<UpdateByQueryAck, AppError> {
        let mut state = self.enter("update_by_query")?;
        let pipeline = state
            .pipelines
            .get(&request.pipeline)
            .cloned()
            .ok_or_else(|| AppError::Store {
                status: 400,
                reason: format!("pipeline with id [{}] does not exist", request.pipeline),
            })?;
        let model = state
            .models
            .get(&pipeline.model_id)
            .cloned()
            .ok_or_else(|| AppError::Store {
                status: 404,
                reason: format!("resource_not_found_exception: model [{}]", pipeline.model_id),
            })?;

        let target = index_mut(&mut state, index)?;
        let limit = request
            .max_docs
            .map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(usize::MAX));
        let ids: Vec<String> = matching_ids(target, selector).into_iter().take(limit).collect();

        for id in &ids {
            if let Some(Value::Object(fields)) = target.documents.get_mut(id) {
                let text = fields
                    .get(&pipeline.source_field)
                    .map(scalar_text)
                    .unwrap_or_default();
                let label = model(&text).to_lowercase();
                fields.insert(pipeline.target_field.clone(), Value::String(label));
            }
        }

        let updated = ids.len() as u64;
        Ok(if request.wait_for_completion {
            UpdateByQueryAck {
                task: None,
                updated: Some(updated),
            }
        } else {
            UpdateByQueryAck {
                task: Some(format!("memory:{updated}")),
                updated: None,
            }
        })
    }
}
