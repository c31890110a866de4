mod config;
mod context;
mod report;
mod stages;
mod state;

pub use config::{AuditQuery, PipelineConfig, PipelineTuning, RetentionPolicy, SentimentSettings};
pub use context::PipelineInputs;
pub use report::{AuditResult, PipelineReport, Stage, StageOutcome, StageReport};
pub use stages::{
    classify_documents, delete_matching, ingest_records, register_sentiment_pipeline, run_query,
    tag_documents, KeywordSummary,
};

use std::{sync::Arc, time::Instant};

use common::{error::AppError, storage::store::DocumentStore, utils::config::AppConfig};
use tracing::{info, warn};
use uuid::Uuid;

use self::{
    context::PipelineContext,
    stages::{apply_sentiment, enforce_retention, ingest, prepare_index, run_audits, tag_keywords},
    state::ready,
};

#[allow(clippy::module_name_repetitions)]
pub struct EnrichmentPipeline {
    store: Arc<dyn DocumentStore>,
    index: String,
    pipeline_config: PipelineConfig,
}

impl EnrichmentPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: impl Into<String>,
        pipeline_config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            index: index.into(),
            pipeline_config,
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self::new(
            store,
            config.index_name.clone(),
            PipelineConfig::from_app_config(config),
        )
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Runs every stage once, in order. Stage failures end up in the report; only
    /// an invalid stage transition is returned as an error.
    #[tracing::instrument(skip_all, fields(index = %self.index))]
    pub async fn run(&self, inputs: &PipelineInputs) -> Result<PipelineReport, AppError> {
        let run_id = Uuid::new_v4().to_string();
        let mut ctx = PipelineContext::new(
            run_id,
            self.store.as_ref(),
            &self.index,
            &self.pipeline_config,
            inputs,
        );

        info!(
            run_id = %ctx.run_id,
            index = %self.index,
            source = %inputs.source_path.display(),
            keywords = %inputs.keywords_path.display(),
            "enrichment run started"
        );
        let run_started = Instant::now();

        let machine = ready();
        let machine = prepare_index(machine, &mut ctx).await?;
        let machine = ingest(machine, &mut ctx).await?;
        let machine = apply_sentiment(machine, &mut ctx).await?;
        let machine = tag_keywords(machine, &mut ctx).await?;
        let machine = enforce_retention(machine, &mut ctx).await?;
        let _machine = run_audits(machine, &mut ctx).await?;

        let report = ctx.into_report();
        let total_ms = u64::try_from(run_started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if report.is_success() {
            info!(run_id = %report.run_id, total_ms, "enrichment run finished");
        } else {
            warn!(
                run_id = %report.run_id,
                total_ms,
                failed_stages = report.failures().count(),
                "enrichment run finished with failed stages"
            );
        }

        Ok(report)
    }
}
