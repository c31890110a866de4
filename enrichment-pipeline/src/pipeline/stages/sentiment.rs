use std::time::Instant;

use common::{
    error::AppError,
    storage::{
        pipeline::{InferencePipeline, UpdateByQuery, UpdateByQueryAck},
        store::DocumentStore,
    },
};
use tracing::{info, instrument};

use super::map_guard_error;
use crate::pipeline::{
    config::SentimentSettings,
    context::PipelineContext,
    report::{Stage, StageOutcome},
    state::{EnrichmentMachine, Ingested, SentimentApplied},
};

/// Registers (or overwrites) the text to sentiment pipeline.
pub async fn register_sentiment_pipeline(
    store: &dyn DocumentStore,
    settings: &SentimentSettings,
) -> Result<InferencePipeline, AppError> {
    let pipeline = InferencePipeline::sentiment(
        settings.pipeline_id.as_str(),
        settings.model_id.as_str(),
        settings.model_input_field.as_str(),
    );
    store.put_pipeline(&pipeline).await?;
    info!(
        pipeline_id = %pipeline.id,
        model_id = %pipeline.model_id,
        "sentiment pipeline registered"
    );
    Ok(pipeline)
}

/// Re-processes up to `max_docs` documents matching the configured selector
/// through the registered pipeline.
pub async fn classify_documents(
    store: &dyn DocumentStore,
    index: &str,
    settings: &SentimentSettings,
) -> Result<UpdateByQueryAck, AppError> {
    let request = UpdateByQuery {
        pipeline: settings.pipeline_id.clone(),
        max_docs: settings.max_docs,
        wait_for_completion: settings.wait_for_completion,
    };
    store
        .update_by_query(index, &settings.selector, &request)
        .await
}

#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, index = ctx.index))]
pub async fn apply_sentiment(
    machine: EnrichmentMachine<(), Ingested>,
    ctx: &mut PipelineContext<'_>,
) -> Result<EnrichmentMachine<(), SentimentApplied>, AppError> {
    let started = Instant::now();
    let result = register_and_classify(ctx).await;
    ctx.finish(Stage::Sentiment, started, result);

    machine
        .apply_sentiment()
        .map_err(|(_, guard)| map_guard_error("apply_sentiment", &guard))
}

async fn register_and_classify(ctx: &PipelineContext<'_>) -> Result<StageOutcome, AppError> {
    let settings = &ctx.config.sentiment;
    register_sentiment_pipeline(ctx.store, settings).await?;
    let ack = classify_documents(ctx.store, ctx.index, settings).await?;

    Ok(StageOutcome::SentimentApplied {
        task: ack.task,
        updated: ack.updated,
    })
}
