use std::time::Instant;

use common::{
    error::AppError,
    storage::{
        selector::Selector,
        store::{DeleteOutcome, DocumentStore},
    },
};
use tracing::{info, instrument, warn};

use super::map_guard_error;
use crate::pipeline::{
    context::PipelineContext,
    report::{Stage, StageOutcome},
    state::{EnrichmentMachine, KeywordsApplied, Retained},
};

/// Deletes every document matching `selector` and waits for the deletion to land.
/// Not retried on failure.
pub async fn delete_matching(
    store: &dyn DocumentStore,
    index: &str,
    selector: &Selector,
) -> Result<DeleteOutcome, AppError> {
    let matched = store.count(index, selector).await?;
    if matched == 0 {
        info!(index, "nothing matches the retention policy");
    }

    let outcome = store.delete_by_query(index, selector).await?;
    if outcome.deleted < matched || outcome.version_conflicts > 0 || outcome.failures > 0 {
        warn!(
            index,
            matched,
            deleted = outcome.deleted,
            version_conflicts = outcome.version_conflicts,
            failures = outcome.failures,
            "some matching documents were not deleted"
        );
    }
    info!(index, matched, deleted = outcome.deleted, "retention applied");
    Ok(outcome)
}

#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, index = ctx.index))]
pub async fn enforce_retention(
    machine: EnrichmentMachine<(), KeywordsApplied>,
    ctx: &mut PipelineContext<'_>,
) -> Result<EnrichmentMachine<(), Retained>, AppError> {
    let started = Instant::now();
    let selector = ctx.config.retention.selector();
    let result = delete_matching(ctx.store, ctx.index, &selector)
        .await
        .map(|outcome| StageOutcome::Retained {
            deleted: outcome.deleted,
        });
    ctx.finish(Stage::Retention, started, result);

    machine
        .enforce_retention()
        .map_err(|(_, guard)| map_guard_error("enforce_retention", &guard))
}
