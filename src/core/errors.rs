//! Custom error types for translation job tracking

use thiserror::Error;

/// Errors surfaced while submitting, polling or downloading a job
#[derive(Error, Debug)]
pub enum JobError {
    /// Input file rejected before any network call
    #[error("Invalid input file: {message}")]
    ValidationError {
        message: String,
    },

    /// Submission network or HTTP failure
    #[error("Submission failed: {message}")]
    TransportError {
        message: String,
    },

    /// Success response missing required fields
    #[error("Malformed server response: {message}")]
    ProtocolError {
        message: String,
    },

    /// Network failure while polling job status
    #[error("Connection error during polling: {message}")]
    ConnectionError {
        message: String,
    },

    /// Download failed even though the job reported success
    #[error("Download failed after success: {message}")]
    ArtifactError {
        message: String,
    },

    /// Backend reported the translation itself failed
    #[error("Translation failed")]
    JobFailed,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::ConfigError {
            message: err.to_string(),
        }
    }
}

/// Result type for job client operations
pub type Result<T> = std::result::Result<T, JobError>;
