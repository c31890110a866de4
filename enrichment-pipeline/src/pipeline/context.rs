use std::{path::PathBuf, time::Instant};

use common::{error::AppError, storage::store::DocumentStore};
use tracing::{error, info};

use super::{
    config::{AuditQuery, PipelineConfig},
    report::{PipelineReport, Stage, StageOutcome},
};

/// Files and queries for one run.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub source_path: PathBuf,
    pub keywords_path: PathBuf,
    pub audits: Vec<AuditQuery>,
}

impl PipelineInputs {
    pub fn new(source_path: impl Into<PathBuf>, keywords_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            keywords_path: keywords_path.into(),
            audits: AuditQuery::defaults(),
        }
    }

    #[must_use]
    pub fn with_audits(mut self, audits: Vec<AuditQuery>) -> Self {
        self.audits = audits;
        self
    }
}

pub struct PipelineContext<'a> {
    pub run_id: String,
    pub store: &'a dyn DocumentStore,
    pub index: &'a str,
    pub config: &'a PipelineConfig,
    pub inputs: &'a PipelineInputs,
    pub report: PipelineReport,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        run_id: String,
        store: &'a dyn DocumentStore,
        index: &'a str,
        config: &'a PipelineConfig,
        inputs: &'a PipelineInputs,
    ) -> Self {
        let report = PipelineReport::new(run_id.clone(), index);
        Self {
            run_id,
            store,
            index,
            config,
            inputs,
            report,
        }
    }

    /// Records how a stage ended. A failed stage is logged and reported; the run
    /// carries on with the next stage.
    pub fn finish(
        &mut self,
        stage: Stage,
        started: Instant,
        result: Result<StageOutcome, AppError>,
    ) {
        let duration = started.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let outcome = match result {
            Ok(outcome) => {
                info!(
                    run_id = %self.run_id,
                    index = self.index,
                    %stage,
                    duration_ms,
                    %outcome,
                    "stage finished"
                );
                outcome
            }
            Err(err) => {
                error!(
                    run_id = %self.run_id,
                    index = self.index,
                    %stage,
                    duration_ms,
                    error = %err,
                    "stage failed; continuing with the next stage"
                );
                StageOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        self.report.record(stage, outcome, duration);
    }

    pub fn into_report(self) -> PipelineReport {
        self.report
    }
}
