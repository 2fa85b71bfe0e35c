//! Error types for the runme console

use thiserror::Error;

use crate::models::TaskRef;

/// Main error type for the runme console
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Request failed: {status} - {body}")]
    RequestError { status: u16, body: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Batch partially failed: {failed} of {total} items")]
    PartialBatchFailure { failed: usize, total: usize },

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Status polling for {task} gave up after {attempts} attempts")]
    PollingTimeout { task: TaskRef, attempts: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ConsoleError {
    fn from(err: anyhow::Error) -> Self {
        ConsoleError::Internal(err.to_string())
    }
}

impl ConsoleError {
    /// Whether this error was raised before anything reached the network
    pub fn is_validation(&self) -> bool {
        matches!(self, ConsoleError::ValidationError(_))
    }

    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::RequestError { body, status } => {
                match serde_json::from_str::<openapi_client::models::ErrorResponse>(body) {
                    Ok(resp) => resp.error,
                    Err(_) if body.is_empty() => format!("request failed with status {}", status),
                    Err(_) => body.clone(),
                }
            }
            other => other.to_string(),
        }
    }
}
