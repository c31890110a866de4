use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use common::storage::indexes::IndexStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrepareIndex,
    Ingest,
    Sentiment,
    Keywords,
    Retention,
    Audit,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PrepareIndex => "prepare_index",
            Stage::Ingest => "ingest",
            Stage::Sentiment => "sentiment",
            Stage::Keywords => "keywords",
            Stage::Retention => "retention",
            Stage::Audit => "audit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    IndexEnsured(IndexStatus),
    Ingested {
        written: usize,
        failed: usize,
        rejected_rows: usize,
    },
    SentimentApplied {
        task: Option<String>,
        updated: Option<u64>,
    },
    KeywordsApplied {
        scanned: usize,
        tagged: usize,
        missing: usize,
    },
    Retained {
        deleted: u64,
    },
    Audited {
        queries: usize,
    },
    Failed {
        reason: String,
    },
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::IndexEnsured(IndexStatus::Created) => write!(f, "index created"),
            StageOutcome::IndexEnsured(IndexStatus::AlreadyExists) => {
                write!(f, "index already present")
            }
            StageOutcome::Ingested {
                written,
                failed,
                rejected_rows,
            } => write!(
                f,
                "{written} written, {failed} failed, {rejected_rows} unparseable rows"
            ),
            StageOutcome::SentimentApplied { task, updated } => match (updated, task) {
                (Some(updated), _) => write!(f, "{updated} documents classified"),
                (None, Some(task)) => write!(f, "classification running as task {task}"),
                (None, None) => write!(f, "classification acknowledged"),
            },
            StageOutcome::KeywordsApplied {
                scanned,
                tagged,
                missing,
            } => write!(
                f,
                "{scanned} scanned, {tagged} with weapon mentions, {missing} vanished before update"
            ),
            StageOutcome::Retained { deleted } => write!(f, "{deleted} documents deleted"),
            StageOutcome::Audited { queries } => write!(f, "{queries} audit queries run"),
            StageOutcome::Failed { reason } => write!(f, "FAILED: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditResult {
    pub name: String,
    pub total: u64,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub run_id: String,
    pub index: String,
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    pub audits: Vec<AuditResult>,
}

impl PipelineReport {
    pub fn new(run_id: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            index: index.into(),
            started_at: Utc::now(),
            stages: Vec::new(),
            audits: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome, duration: Duration) {
        self.stages.push(StageReport {
            stage,
            outcome,
            duration,
        });
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|report| report.stage == stage)
            .map(|report| &report.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageReport> {
        self.stages
            .iter()
            .filter(|report| report.outcome.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {} on index {} (started {})",
            self.run_id,
            self.index,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        for report in &self.stages {
            writeln!(
                f,
                "  {:<14} {} ({} ms)",
                report.stage.as_str(),
                report.outcome,
                report.duration.as_millis()
            )?;
        }
        for audit in &self.audits {
            writeln!(f, "  audit: {} -> {} hits", audit.name, audit.total)?;
            if !audit.ids.is_empty() {
                writeln!(f, "    ids: {}", audit.ids.join(", "))?;
            }
        }
        Ok(())
    }
}
