use common::{
    storage::{
        selector::{BoolSelector, Selector},
        types::post::{fields, ANTISEMITIC_FLAG},
    },
    utils::config::AppConfig,
};

#[derive(Debug, Clone)]
pub struct PipelineTuning {
    pub bulk_chunk_size: usize,
    pub keyword_scan_limit: usize,
    pub audit_page_size: usize,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            bulk_chunk_size: 500,
            keyword_scan_limit: 10_000,
            audit_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentimentSettings {
    pub pipeline_id: String,
    pub model_id: String,
    pub model_input_field: String,
    /// Upper bound on documents classified per run; `None` classifies every match.
    pub max_docs: Option<u64>,
    pub wait_for_completion: bool,
    pub selector: Selector,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            pipeline_id: "sentiment-analysis".to_string(),
            model_id: "sentiment-analysis".to_string(),
            model_input_field: "text_field".to_string(),
            max_docs: Some(10),
            wait_for_completion: true,
            selector: Selector::all(),
        }
    }
}

/// Which documents are purged.
///
/// A document is deleted when its sentiment is one of `purge_sentiments`, it carries
/// no weapon mentions and its label flag differs from `protected_flag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub purge_sentiments: Vec<String>,
    pub protected_flag: i8,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            purge_sentiments: vec!["positive".to_string(), "neutral".to_string()],
            protected_flag: ANTISEMITIC_FLAG,
        }
    }
}

impl RetentionPolicy {
    pub fn selector(&self) -> Selector {
        BoolSelector::default()
            .must(Selector::terms(
                fields::SENTIMENT,
                self.purge_sentiments.iter().map(String::as_str),
            ))
            .must_not(Selector::exists(fields::WEAPONS))
            .must_not(Selector::term(fields::LABEL_FLAG, self.protected_flag))
            .into()
    }
}

/// A named read-only query whose hits are reported after retention.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditQuery {
    pub name: String,
    pub selector: Selector,
}

impl AuditQuery {
    pub fn new(name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }

    /// Flagged posts that still mention weapons, and posts naming two or more weapons.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "antisemitic posts mentioning weapons",
                BoolSelector::default()
                    .must(Selector::term(fields::LABEL_FLAG, ANTISEMITIC_FLAG))
                    .must(Selector::exists(fields::WEAPONS)),
            ),
            Self::new(
                "posts mentioning at least two weapons",
                Selector::min_list_length(fields::WEAPONS, 2),
            ),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub tuning: PipelineTuning,
    pub sentiment: SentimentSettings,
    pub retention: RetentionPolicy,
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: PipelineTuning {
                bulk_chunk_size: config.bulk_chunk_size,
                keyword_scan_limit: config.keyword_scan_limit,
                audit_page_size: config.audit_page_size,
            },
            sentiment: SentimentSettings {
                pipeline_id: config.sentiment_pipeline_id.clone(),
                model_id: config.sentiment_model_id.clone(),
                model_input_field: config.sentiment_model_input_field.clone(),
                max_docs: config.sentiment_max_docs,
                wait_for_completion: config.sentiment_wait_for_completion,
                selector: Selector::all(),
            },
            retention: RetentionPolicy::default(),
        }
    }
}
