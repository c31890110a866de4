use std::time::Instant;

use common::{
    error::AppError,
    storage::store::{BulkDocument, BulkOutcome, DocumentStore},
};
use tracing::{debug, info, instrument, warn};

use super::map_guard_error;
use crate::{
    pipeline::{
        context::PipelineContext,
        report::{Stage, StageOutcome},
        state::{EnrichmentMachine, IndexReady, Ingested},
    },
    utils::source::{load_records, SourceRecord},
};

/// Bulk-writes `records` under their positional ids, `chunk_size` per request, then
/// refreshes so the documents are searchable. Rejected documents are counted in the
/// outcome; only a failed request is an error.
pub async fn ingest_records(
    store: &dyn DocumentStore,
    index: &str,
    records: &[SourceRecord],
    chunk_size: usize,
) -> Result<BulkOutcome, AppError> {
    let mut outcome = BulkOutcome::default();

    for chunk in records.chunks(chunk_size.max(1)) {
        let documents = chunk
            .iter()
            .map(|record| {
                Ok(BulkDocument {
                    id: record.document_id(),
                    source: serde_json::to_value(record.to_post())?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let written = store.bulk_index(index, &documents).await?;
        for failure in &written.failures {
            warn!(index, id = %failure.id, reason = %failure.reason, "document rejected");
        }
        debug!(
            index,
            succeeded = written.succeeded,
            failed = written.failed,
            "bulk chunk written"
        );
        outcome.absorb(written);
    }

    store.refresh(index).await?;
    Ok(outcome)
}

#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, index = ctx.index))]
pub async fn ingest(
    machine: EnrichmentMachine<(), IndexReady>,
    ctx: &mut PipelineContext<'_>,
) -> Result<EnrichmentMachine<(), Ingested>, AppError> {
    let started = Instant::now();
    let result = load_and_ingest(ctx).await;
    ctx.finish(Stage::Ingest, started, result);

    machine
        .ingest()
        .map_err(|(_, guard)| map_guard_error("ingest", &guard))
}

async fn load_and_ingest(ctx: &PipelineContext<'_>) -> Result<StageOutcome, AppError> {
    let batch = load_records(&ctx.inputs.source_path)?;
    info!(
        run_id = %ctx.run_id,
        source = %ctx.inputs.source_path.display(),
        records = batch.records.len(),
        rejected_rows = batch.rejected.len(),
        "source records loaded"
    );

    let outcome = ingest_records(
        ctx.store,
        ctx.index,
        &batch.records,
        ctx.config.tuning.bulk_chunk_size,
    )
    .await?;

    Ok(StageOutcome::Ingested {
        written: outcome.succeeded,
        failed: outcome.failed,
        rejected_rows: batch.rejected.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::memory::MemoryStore;

    fn record(position: usize, text: &str) -> SourceRecord {
        SourceRecord {
            position,
            external_key: format!("key-{position}"),
            created_at: "2021-05-14".into(),
            label_flag: 0,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn writes_in_chunks_with_positional_ids() {
        let store = MemoryStore::new();
        let records: Vec<_> = (0..5).map(|i| record(i, "hello")).collect();

        let outcome = ingest_records(&store, "posts", &records, 2)
            .await
            .expect("ingest");

        assert_eq!(outcome.succeeded, 5);
        assert_eq!(outcome.failed, 0);
        assert_eq!(store.call_count("bulk_index"), 3);
        assert_eq!(store.call_count("refresh"), 1);
        assert_eq!(store.ids("posts"), vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn rejected_documents_are_counted_not_raised() {
        let store = MemoryStore::new().rejecting_ids(["1"]);
        let records = vec![record(0, "a"), record(1, "b"), record(2, "c")];

        let outcome = ingest_records(&store, "posts", &records, 500)
            .await
            .expect("ingest");

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].id, "1");
        assert_eq!(store.ids("posts"), vec!["0", "2"]);
    }

    #[tokio::test]
    async fn transport_failure_aborts_ingestion() {
        let store = MemoryStore::new();
        store.fail_operation("bulk_index");

        let err = ingest_records(&store, "posts", &[record(0, "a")], 10)
            .await
            .expect_err("bulk failure");
        assert!(err.is_transport());
    }
}
