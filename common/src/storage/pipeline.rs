use serde_json::{json, Value};

use crate::storage::types::post::fields;

/// Scratch field the inference processor writes its raw prediction into.
pub const INFERENCE_SCRATCH_FIELD: &str = "ml_sentiment";

/// A server-side ingest pipeline deriving a label field from a text field
/// through a model the store hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferencePipeline {
    pub id: String,
    pub description: String,
    pub model_id: String,
    pub source_field: String,
    pub model_input_field: String,
    pub target_field: String,
}

impl InferencePipeline {
    /// Sentiment classification of `text` into `sentiment`.
    pub fn sentiment(
        id: impl Into<String>,
        model_id: impl Into<String>,
        model_input_field: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: "Analyze sentiment of text".to_string(),
            model_id: model_id.into(),
            source_field: fields::TEXT.to_string(),
            model_input_field: model_input_field.into(),
            target_field: fields::SENTIMENT.to_string(),
        }
    }

    /// Registration body. The prediction lands in a scratch object first and is
    /// then copied out as a plain lowercase label, so `target_field` holds a string.
    pub fn body(&self) -> Value {
        let prediction = format!("{INFERENCE_SCRATCH_FIELD}.predicted_value");
        json!({
            "description": self.description,
            "processors": [
                {
                    "inference": {
                        "model_id": self.model_id,
                        "field_map": { self.source_field.as_str(): self.model_input_field },
                        "target_field": INFERENCE_SCRATCH_FIELD
                    }
                },
                {
                    "set": {
                        "field": self.target_field,
                        "copy_from": prediction,
                        "ignore_empty_value": true
                    }
                },
                {
                    "lowercase": {
                        "field": self.target_field,
                        "ignore_missing": true
                    }
                },
                {
                    "remove": {
                        "field": INFERENCE_SCRATCH_FIELD,
                        "ignore_missing": true
                    }
                }
            ]
        })
    }
}

/// Re-processes matching documents in place through a registered pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateByQuery {
    pub pipeline: String,
    pub max_docs: Option<u64>,
    pub wait_for_completion: bool,
}

/// Acknowledgement of an update-by-query. A detached request only carries the
/// task id; a blocking one reports how many documents were rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateByQueryAck {
    pub task: Option<String>,
    pub updated: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_pipeline_maps_text_to_label() {
        let pipeline = InferencePipeline::sentiment("sentiment-analysis", "distilbert", "text_field");
        let body = pipeline.body();

        let inference = &body["processors"][0]["inference"];
        assert_eq!(inference["model_id"], "distilbert");
        assert_eq!(inference["field_map"]["text"], "text_field");
        assert_eq!(inference["target_field"], INFERENCE_SCRATCH_FIELD);

        assert_eq!(body["processors"][1]["set"]["field"], "sentiment");
        assert_eq!(
            body["processors"][1]["set"]["copy_from"],
            "ml_sentiment.predicted_value"
        );
        assert_eq!(body["processors"][2]["lowercase"]["field"], "sentiment");
        assert_eq!(body["processors"][3]["remove"]["field"], INFERENCE_SCRATCH_FIELD);
    }
}
