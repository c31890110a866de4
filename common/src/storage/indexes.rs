use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::AppError,
    storage::{store::DocumentStore, types::post::fields},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Binary,
    Text,
    Keyword,
    Byte,
    Integer,
    Long,
    Date,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Field name to type mapping applied when an index is created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexMapping {
    pub properties: BTreeMap<String, FieldMapping>,
}

impl IndexMapping {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties
            .insert(name.into(), FieldMapping { field_type });
        self
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.properties.get(name).map(|mapping| mapping.field_type)
    }
}

/// Schema for the post index.
///
/// `sentiment` and `weapons` are declared up-front as keywords so label equality
/// and list-size queries see exact values instead of analyzed text.
pub fn post_mapping() -> IndexMapping {
    IndexMapping::new()
        .field(fields::EXTERNAL_KEY, FieldType::Binary)
        .field(fields::CREATED_AT, FieldType::Text)
        .field(fields::LABEL_FLAG, FieldType::Byte)
        .field(fields::TEXT, FieldType::Text)
        .field(fields::SENTIMENT, FieldType::Keyword)
        .field(fields::WEAPONS, FieldType::Keyword)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

/// Creates `name` with `mapping` unless it already exists.
/// Idempotent: an existing index is left untouched, whatever its schema.
pub async fn ensure_index(
    store: &dyn DocumentStore,
    name: &str,
    mapping: &IndexMapping,
) -> Result<IndexStatus, AppError> {
    if store.index_exists(name).await? {
        debug!(index = name, "index already present; schema left as-is");
        return Ok(IndexStatus::AlreadyExists);
    }

    let status = store.create_index(name, mapping).await?;
    info!(
        index = name,
        fields = mapping.properties.len(),
        ?status,
        "ensured index"
    );
    Ok(status)
}
