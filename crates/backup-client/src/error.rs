//! Error types for backup export operations

use thiserror::Error;

/// Result type alias for backup export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that can occur while driving a backup export
///
/// Every variant is terminal for the step that produced it. Nothing in this
/// crate retries on its own; a failed step is re-run by the operator.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Unsupported application name or unusable instance
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login endpoint did not answer with 200
    #[error("Authentication failed ({status}): {body}")]
    Auth { status: u16, body: String },

    /// Job-start request rejected or answered with an error payload
    #[error("Trigger failed with message: {0}")]
    Trigger(String),

    /// The dialect needs a task id and none could be obtained
    #[error("Missing task id: no task id supplied and the last task id lookup failed")]
    MissingTaskId,

    /// Progress response could not be decoded
    #[error("No JSON object could be decoded (status {status}): {detail}")]
    Parse { status: u16, detail: String },

    /// Wall-clock budget ran out before an artifact was resolved
    #[error("Timed out after {minutes} minute(s) waiting for the backup to complete")]
    Timeout { minutes: u64 },

    /// No artifact filename in the progress response
    #[error("File name to download not found: {0}")]
    Resolution(String),

    /// Download endpoint answered with something other than 200
    #[error("Download file not found on remote server ({status}): {url}")]
    Transport { status: u16, url: String },

    /// HTTP request failed below the application layer
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Create a parse error from a status code and detail message
    pub fn parse(status: u16, detail: impl Into<String>) -> Self {
        Self::Parse {
            status,
            detail: detail.into(),
        }
    }

    /// Short label of the failure class, used by the audit sink
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Auth { .. } => "auth",
            Self::Trigger(_) => "trigger",
            Self::MissingTaskId => "missing_task_id",
            Self::Parse { .. } => "parse",
            Self::Timeout { .. } => "timeout",
            Self::Resolution(_) => "resolution",
            Self::Transport { .. } => "transport",
            Self::Http(_) => "http",
            Self::InvalidUrl(_) => "url",
            Self::Io(_) => "io",
        }
    }
}
