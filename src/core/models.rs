//! Core data models for job tracking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::errors::{JobError, Result};

/// Required extension for uploaded books
pub const EPUB_EXTENSION: &str = ".epub";

/// Expected media type for uploaded books
pub const EPUB_MEDIA_TYPE: &str = "application/epub+zip";

/// Wire value for a successfully finished job
pub const WIRE_STATE_SUCCESS: &str = "SUCCESS";

/// Wire value for a failed job
pub const WIRE_STATE_FAILURE: &str = "FAILURE";

/// Translation request: the book bytes plus target language
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub file_name: String,
    pub media_type: String,
    pub content: Vec<u8>,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(
        file_name: impl Into<String>,
        content: Vec<u8>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: EPUB_MEDIA_TYPE.to_string(),
            content,
            target_language: target_language.into(),
        }
    }

    /// Read the book from disk
    pub async fn from_path(
        path: impl AsRef<Path>,
        target_language: impl Into<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let media_type = if file_name.to_lowercase().ends_with(EPUB_EXTENSION) {
            EPUB_MEDIA_TYPE
        } else {
            "application/octet-stream"
        };

        Ok(Self {
            file_name,
            media_type: media_type.to_string(),
            content,
            target_language: target_language.into(),
        })
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Check the file before any network call
    pub fn validate(&self) -> Result<()> {
        if !self.file_name.to_lowercase().ends_with(EPUB_EXTENSION) {
            return Err(JobError::ValidationError {
                message: format!("only {} files are supported", EPUB_EXTENSION),
            });
        }

        if self.media_type != EPUB_MEDIA_TYPE {
            return Err(JobError::ValidationError {
                message: format!("invalid EPUB media type: {}", self.media_type),
            });
        }

        Ok(())
    }

    /// Output name for the translated book: `{stem}_{language}.epub`
    pub fn suggested_output_name(&self) -> String {
        let stem = if self.file_name.to_lowercase().ends_with(EPUB_EXTENSION) {
            &self.file_name[..self.file_name.len() - EPUB_EXTENSION.len()]
        } else {
            self.file_name.as_str()
        };

        format!("{}_{}{}", stem, self.target_language, EPUB_EXTENSION)
    }
}

/// Handle to one submitted job
///
/// Carries the backend-assigned task identifier plus the cooperative
/// cancellation flag checked by the poll loop. A new submission on the same
/// client cancels the previous handle.
#[derive(Debug, Clone)]
pub struct JobHandle {
    task_id: String,
    suggested_name: String,
    cancelled: Arc<AtomicBool>,
}

impl JobHandle {
    pub(crate) fn new(task_id: String, suggested_name: String) -> Self {
        Self {
            task_id,
            suggested_name,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Detached handle for status/download queries on a known task
    pub fn from_task_id(task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        let suggested_name = format!("{}{}", task_id, EPUB_EXTENSION);
        Self::new(task_id, suggested_name)
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    /// Stop any poll loop watching this handle at its next tick
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Backend-reported job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Parse the wire state string; anything not terminal is in progress
    pub fn from_wire(state: Option<&str>) -> Self {
        match state {
            Some(WIRE_STATE_SUCCESS) => JobState::Succeeded,
            Some(WIRE_STATE_FAILURE) => JobState::Failed,
            _ => JobState::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "running"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// One observed poll result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: u8,
}

/// Client-side lifecycle of the active job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    Idle,
    Submitted,
    Running,
    Fetching,
    Done,
    DoneWithArtifactError,
    Failed,
    Errored,
}

impl JobPhase {
    /// No further transition happens without a new submission
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Done | JobPhase::DoneWithArtifactError | JobPhase::Failed | JobPhase::Errored
        )
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Idle => write!(f, "idle"),
            JobPhase::Submitted => write!(f, "submitted"),
            JobPhase::Running => write!(f, "running"),
            JobPhase::Fetching => write!(f, "fetching"),
            JobPhase::Done => write!(f, "done"),
            JobPhase::DoneWithArtifactError => write!(f, "done (download failed)"),
            JobPhase::Failed => write!(f, "failed"),
            JobPhase::Errored => write!(f, "errored"),
        }
    }
}

/// Translated book bytes plus the name to save them under
#[derive(Debug, Clone)]
pub struct Artifact {
    pub content: Vec<u8>,
    pub file_name: String,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Write the artifact to disk
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.content).await?;
        Ok(())
    }

    /// Release the handle, keeping only the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.content
    }
}

/// Success body of `POST /translate-book/`
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub task_id: Option<String>,
}

/// Failure body of `POST /translate-book/`
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

/// Body of `GET /task-status/{task_id}`
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub progress: Option<i64>,
    pub state: Option<String>,
}

impl StatusResponse {
    /// Fold the wire response into a status, keeping the last seen progress
    /// when the backend omits one
    pub fn into_status(self, last_progress: u8) -> JobStatus {
        let progress = self
            .progress
            .map(|p| p.clamp(0, 100) as u8)
            .unwrap_or(last_progress);

        JobStatus {
            state: JobState::from_wire(self.state.as_deref()),
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> TranslationRequest {
        TranslationRequest::new(name, vec![1, 2, 3], "Polish")
    }

    #[test]
    fn test_validate_accepts_epub() {
        assert!(request("book.epub").validate().is_ok());
        assert!(request("Book.EPUB").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_extension() {
        let err = request("notes.txt").validate().unwrap_err();
        assert!(matches!(err, JobError::ValidationError { .. }));
    }

    #[test]
    fn test_validate_rejects_wrong_media_type() {
        let req = request("book.epub").with_media_type("text/plain");
        let err = req.validate().unwrap_err();
        assert!(matches!(err, JobError::ValidationError { .. }));
    }

    #[test]
    fn test_suggested_output_name() {
        assert_eq!(request("book.epub").suggested_output_name(), "book_Polish.epub");
        assert_eq!(request("Book.EPUB").suggested_output_name(), "Book_Polish.epub");
    }

    #[test]
    fn test_job_state_from_wire() {
        assert_eq!(JobState::from_wire(Some("SUCCESS")), JobState::Succeeded);
        assert_eq!(JobState::from_wire(Some("FAILURE")), JobState::Failed);
        assert_eq!(JobState::from_wire(Some("PENDING")), JobState::Running);
        assert_eq!(JobState::from_wire(None), JobState::Running);
    }

    #[test]
    fn test_status_response_progress() {
        let status = StatusResponse {
            progress: Some(250),
            state: Some("PENDING".to_string()),
        }
        .into_status(0);
        assert_eq!(status.progress, 100);

        let status = StatusResponse {
            progress: None,
            state: None,
        }
        .into_status(55);
        assert_eq!(status.progress, 55);
        assert_eq!(status.state, JobState::Running);
    }

    #[test]
    fn test_handle_cancellation() {
        let handle = JobHandle::from_task_id("abc123");
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(JobPhase::Done.is_terminal());
        assert!(JobPhase::DoneWithArtifactError.is_terminal());
        assert!(JobPhase::Failed.is_terminal());
        assert!(JobPhase::Errored.is_terminal());
        assert!(!JobPhase::Running.is_terminal());
        assert!(!JobPhase::Idle.is_terminal());
    }
}
