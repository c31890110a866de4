use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::storage::client::{Credentials, RetryPolicy};

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_search_address")]
    pub search_address: String,
    #[serde(default)]
    pub search_username: Option<String>,
    #[serde(default)]
    pub search_password: Option<String>,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_source_path")]
    pub source_path: String,
    #[serde(default = "default_keywords_path")]
    pub keywords_path: String,
    #[serde(default = "default_sentiment_pipeline_id")]
    pub sentiment_pipeline_id: String,
    #[serde(default = "default_sentiment_model_id")]
    pub sentiment_model_id: String,
    #[serde(default = "default_sentiment_model_input_field")]
    pub sentiment_model_input_field: String,
    #[serde(default = "default_sentiment_max_docs")]
    pub sentiment_max_docs: Option<u64>,
    #[serde(default = "default_true")]
    pub sentiment_wait_for_completion: bool,
    #[serde(default = "default_keyword_scan_limit")]
    pub keyword_scan_limit: usize,
    #[serde(default = "default_bulk_chunk_size")]
    pub bulk_chunk_size: usize,
    #[serde(default = "default_audit_page_size")]
    pub audit_page_size: usize,
    #[serde(default = "default_connect_max_attempts")]
    pub connect_max_attempts: usize,
    #[serde(default = "default_connect_initial_backoff_ms")]
    pub connect_initial_backoff_ms: u64,
    #[serde(default = "default_connect_max_backoff_ms")]
    pub connect_max_backoff_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_search_address() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_name() -> String {
    "tweets_injected".to_string()
}

fn default_source_path() -> String {
    "tweets_injected 3.csv".to_string()
}

fn default_keywords_path() -> String {
    "data/weapons_list.txt".to_string()
}

fn default_sentiment_pipeline_id() -> String {
    "sentiment-analysis".to_string()
}

fn default_sentiment_model_id() -> String {
    "sentiment-analysis".to_string()
}

fn default_sentiment_model_input_field() -> String {
    "text_field".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_sentiment_max_docs() -> Option<u64> {
    Some(10)
}

fn default_true() -> bool {
    true
}

fn default_keyword_scan_limit() -> usize {
    10_000
}

fn default_bulk_chunk_size() -> usize {
    500
}

fn default_audit_page_size() -> usize {
    100
}

fn default_connect_max_attempts() -> usize {
    20
}

fn default_connect_initial_backoff_ms() -> u64 {
    500
}

fn default_connect_max_backoff_ms() -> u64 {
    5_000
}

fn default_connect_timeout_secs() -> u64 {
    120
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_address: default_search_address(),
            search_username: None,
            search_password: None,
            index_name: default_index_name(),
            source_path: default_source_path(),
            keywords_path: default_keywords_path(),
            sentiment_pipeline_id: default_sentiment_pipeline_id(),
            sentiment_model_id: default_sentiment_model_id(),
            sentiment_model_input_field: default_sentiment_model_input_field(),
            sentiment_max_docs: default_sentiment_max_docs(),
            sentiment_wait_for_completion: true,
            keyword_scan_limit: default_keyword_scan_limit(),
            bulk_chunk_size: default_bulk_chunk_size(),
            audit_page_size: default_audit_page_size(),
            connect_max_attempts: default_connect_max_attempts(),
            connect_initial_backoff_ms: default_connect_initial_backoff_ms(),
            connect_max_backoff_ms: default_connect_max_backoff_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.connect_max_attempts,
            initial_backoff: Duration::from_millis(self.connect_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.connect_max_backoff_ms),
            timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Basic-auth credentials, only when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.search_username, &self.search_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_fall_back_to_defaults() {
        let config: AppConfig = Config::builder()
            .build()
            .and_then(Config::try_deserialize)
            .expect("defaults deserialize");

        assert_eq!(config.search_address, "http://localhost:9200");
        assert_eq!(config.index_name, "tweets_injected");
        assert_eq!(config.sentiment_max_docs, Some(10));
        assert!(config.sentiment_wait_for_completion);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config: AppConfig = Config::builder()
            .set_override("index_name", "posts_test")
            .and_then(|b| b.set_override("connect_max_attempts", 3))
            .and_then(|b| b.set_override("search_username", "elastic"))
            .and_then(|b| b.set_override("search_password", "changeme"))
            .and_then(|b| b.build())
            .and_then(Config::try_deserialize)
            .expect("overrides deserialize");

        assert_eq!(config.index_name, "posts_test");
        assert_eq!(config.retry_policy().max_attempts, 3);
        let credentials = config.credentials().expect("credentials configured");
        assert_eq!(credentials.username, "elastic");
    }

    #[test]
    fn retry_policy_uses_configured_durations() {
        let config = AppConfig {
            connect_initial_backoff_ms: 250,
            connect_max_backoff_ms: 1_000,
            connect_timeout_secs: 9,
            ..AppConfig::default()
        };

        let policy = config.retry_policy();
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.max_backoff, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(9));
    }
}
