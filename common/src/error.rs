use thiserror::Error;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Search store unavailable after {attempts} attempt(s): {reason}")]
    ConnectionUnavailable { attempts: usize, reason: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Search store error ({status}): {reason}")]
    Store { status: u16, reason: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid store address: {0}")]
    Url(#[from] url::ParseError),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Errors raised while talking to the store, as opposed to local input or setup problems.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_) | AppError::Store { .. } | AppError::ConnectionUnavailable { .. }
        )
    }
}
