use std::time::Instant;

use common::{
    error::AppError,
    storage::{
        selector::Selector,
        store::{DocumentStore, SearchResults},
    },
};
use tracing::{debug, instrument};

use super::map_guard_error;
use crate::pipeline::{
    context::PipelineContext,
    report::{AuditResult, Stage, StageOutcome},
    state::{Audited, EnrichmentMachine, Retained},
};

/// One read-only page of up to `size` hits.
pub async fn run_query(
    store: &dyn DocumentStore,
    index: &str,
    selector: &Selector,
    size: usize,
) -> Result<SearchResults, AppError> {
    let results = store.search(index, selector, size).await?;
    debug!(
        index,
        total = results.total,
        returned = results.hits.len(),
        "query executed"
    );
    Ok(results)
}

#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, index = ctx.index))]
pub async fn run_audits(
    machine: EnrichmentMachine<(), Retained>,
    ctx: &mut PipelineContext<'_>,
) -> Result<EnrichmentMachine<(), Audited>, AppError> {
    let started = Instant::now();
    let result = audit_all(ctx).await;
    ctx.finish(Stage::Audit, started, result);

    machine
        .audit()
        .map_err(|(_, guard)| map_guard_error("audit", &guard))
}

async fn audit_all(ctx: &mut PipelineContext<'_>) -> Result<StageOutcome, AppError> {
    let inputs = ctx.inputs;
    for audit in &inputs.audits {
        let results = run_query(
            ctx.store,
            ctx.index,
            &audit.selector,
            ctx.config.tuning.audit_page_size,
        )
        .await?;
        ctx.report.audits.push(AuditResult {
            name: audit.name.clone(),
            total: results.total,
            ids: results.ids(),
        });
    }

    Ok(StageOutcome::Audited {
        queries: inputs.audits.len(),
    })
}
