use std::{fs::File, io::Read, path::Path};

use anyhow::Context;
use common::{error::AppError, storage::types::post::Post};
use serde::Deserialize;
use tracing::{debug, warn};

/// One input row, tagged with its 0-based position among the data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub position: usize,
    pub external_key: String,
    pub created_at: String,
    pub label_flag: i8,
    pub text: String,
}

impl SourceRecord {
    /// Positional document id; re-ingesting the same file overwrites the same ids.
    pub fn document_id(&self) -> String {
        self.position.to_string()
    }

    pub fn to_post(&self) -> Post {
        Post::new(
            self.external_key.clone(),
            self.created_at.clone(),
            self.label_flag,
            self.text.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    pub records: Vec<SourceRecord>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Deserialize)]
struct SourceRow {
    #[serde(rename = "TweetID", alias = "externalKey")]
    external_key: String,
    #[serde(rename = "CreateDate", alias = "createdAt")]
    created_at: String,
    #[serde(rename = "Antisemitic", alias = "labelFlag")]
    label_flag: i8,
    #[serde(default)]
    text: String,
}

pub fn load_records(path: &Path) -> Result<SourceBatch, AppError> {
    let file = File::open(path)
        .with_context(|| format!("opening source file {}", path.display()))?;
    let batch = read_records(file)?;
    debug!(
        path = %path.display(),
        records = batch.records.len(),
        rejected = batch.rejected.len(),
        "source file loaded"
    );
    Ok(batch)
}

/// Reads every data row in file order. Rows that do not parse are set aside with
/// their position, so the ids of later rows do not shift.
pub fn read_records<R: Read>(reader: R) -> Result<SourceBatch, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut batch = SourceBatch::default();
    for (position, row) in reader.records().enumerate() {
        let parsed = row.and_then(|record| record.deserialize::<SourceRow>(Some(&headers)));
        match parsed {
            Ok(row) => batch.records.push(SourceRecord {
                position,
                external_key: row.external_key,
                created_at: row.created_at,
                label_flag: row.label_flag,
                text: row.text,
            }),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                warn!(position, error = %err, "skipping unparseable source row");
                batch.rejected.push(RejectedRow {
                    position,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(batch)
}
