use std::time::Instant;

use common::{
    error::AppError,
    storage::indexes::{ensure_index, post_mapping},
};
use tracing::instrument;

use super::map_guard_error;
use crate::pipeline::{
    context::PipelineContext,
    report::{Stage, StageOutcome},
    state::{EnrichmentMachine, IndexReady, Ready},
};

#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, index = ctx.index))]
pub async fn prepare_index(
    machine: EnrichmentMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<EnrichmentMachine<(), IndexReady>, AppError> {
    let started = Instant::now();
    let result = ensure_index(ctx.store, ctx.index, &post_mapping())
        .await
        .map(StageOutcome::IndexEnsured);
    ctx.finish(Stage::PrepareIndex, started, result);

    machine
        .prepare_index()
        .map_err(|(_, guard)| map_guard_error("prepare_index", &guard))
}
