mod ingest;
mod keywords;
mod prepare_index;
mod query;
mod retention;
mod sentiment;

use common::error::AppError;
use state_machines::core::GuardError;

pub use ingest::{ingest, ingest_records};
pub use keywords::{tag_documents, tag_keywords, KeywordSummary};
pub use prepare_index::prepare_index;
pub use query::{run_audits, run_query};
pub use retention::{delete_matching, enforce_retention};
pub use sentiment::{apply_sentiment, classify_documents, register_sentiment_pipeline};

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid enrichment pipeline transition during {event}: {guard:?}"
    ))
}
