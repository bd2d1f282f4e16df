//! Async job client: submit a book, poll the task, download the result

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::ClientConfig;
use crate::core::errors::{JobError, Result};
use crate::core::models::{
    Artifact, ErrorBody, JobHandle, JobPhase, JobState, JobStatus, StatusResponse, SubmitResponse,
    TranslationRequest,
};

/// Client-side view of the active job, shared with the poll loop
#[derive(Debug, Clone, Copy)]
struct TrackedJob {
    phase: JobPhase,
    progress: u8,
}

/// Async client for the book translation backend
///
/// One job is active per client at a time. A new `submit` cancels the poll
/// loop of the previous job before the new request goes out.
#[derive(Debug, Clone)]
pub struct JobClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    tracked: Arc<Mutex<TrackedJob>>,
    active: Arc<Mutex<Option<JobHandle>>>,
}

impl JobClient {
    /// Create a new job client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| JobError::ConfigError {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            config: Arc::new(config),
            tracked: Arc::new(Mutex::new(TrackedJob {
                phase: JobPhase::Idle,
                progress: 0,
            })),
            active: Arc::new(Mutex::new(None)),
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::new(config)
    }

    /// Current lifecycle phase of the active job
    pub async fn phase(&self) -> JobPhase {
        self.tracked.lock().await.phase
    }

    /// Last observed progress of the active job
    pub async fn progress(&self) -> u8 {
        self.tracked.lock().await.progress
    }

    /// Submit a translation request
    ///
    /// Validates the file before any network call, supersedes the previous
    /// job, and returns a handle for the backend-assigned task.
    pub async fn submit(&self, request: &TranslationRequest) -> Result<JobHandle> {
        request.validate()?;

        // Supersede the previous job: its poll loop stops at the next tick
        {
            let mut active = self.active.lock().await;
            if let Some(prev) = active.take() {
                debug!("Cancelling poll loop for superseded task {}", prev.task_id());
                prev.cancel();
            }
        }

        {
            let mut tracked = self.tracked.lock().await;
            tracked.phase = JobPhase::Submitted;
            tracked.progress = 0;
        }

        let part = reqwest::multipart::Part::bytes(request.content.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.media_type)
            .map_err(|e| JobError::ValidationError {
                message: e.to_string(),
            })?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", request.target_language.clone())
            .text("apiKey", self.config.api_key.clone())
            .text("maxInputTokens", self.config.max_input_tokens.to_string())
            .text("maxOutputTokens", self.config.max_output_tokens.to_string())
            .text(
                "maxRequestsPerMinute",
                self.config.max_requests_per_minute.to_string(),
            )
            .text(
                "maxTokensPerMinute",
                self.config.max_tokens_per_minute.to_string(),
            );

        let response = match self
            .http
            .post(self.config.submit_url())
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.set_phase(JobPhase::Errored).await;
                return Err(JobError::TransportError {
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();

        if !status.is_success() {
            let status_text = status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string();
            let body: ErrorBody = response
                .json()
                .await
                .unwrap_or(ErrorBody { error: None });
            let message = body.error.unwrap_or(status_text);

            warn!("Submission rejected: {}", message);
            self.set_phase(JobPhase::Errored).await;
            return Err(JobError::TransportError { message });
        }

        let body: SubmitResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                self.set_phase(JobPhase::Errored).await;
                return Err(JobError::ProtocolError {
                    message: e.to_string(),
                });
            }
        };

        let task_id = match body.task_id.filter(|id| !id.is_empty()) {
            Some(task_id) => task_id,
            None => {
                self.set_phase(JobPhase::Errored).await;
                return Err(JobError::ProtocolError {
                    message: "no task ID returned".to_string(),
                });
            }
        };

        info!("Submitted {} as task {}", request.file_name, task_id);

        let handle = JobHandle::new(task_id, request.suggested_output_name());
        *self.active.lock().await = Some(handle.clone());

        Ok(handle)
    }

    /// Start watching a job on the configured cadence
    ///
    /// The returned poller is a finite sequence: it ends after yielding a
    /// terminal status, after a single connection failure, or silently once
    /// the handle is cancelled.
    pub fn poll_status(&self, handle: &JobHandle) -> StatusPoller {
        StatusPoller {
            http: self.http.clone(),
            url: self.config.status_url(handle.task_id()),
            interval: Duration::from_millis(self.config.poll_interval_ms),
            handle: handle.clone(),
            tracked: self.tracked.clone(),
            last_progress: 0,
            finished: false,
        }
    }

    /// One-shot status check, outside any poll loop
    pub async fn check_status(&self, handle: &JobHandle) -> Result<JobStatus> {
        let url = self.config.status_url(handle.task_id());
        let response = self.http.get(&url).send().await.map_err(|e| {
            JobError::ConnectionError {
                message: e.to_string(),
            }
        })?;

        let wire: StatusResponse =
            response
                .json()
                .await
                .map_err(|e| JobError::ConnectionError {
                    message: e.to_string(),
                })?;

        Ok(wire.into_status(0))
    }

    /// Download the translated book after the job succeeded
    ///
    /// Failure here is reported as an artifact error, distinct from a failed
    /// translation: the job finished server-side but the result could not be
    /// transferred.
    pub async fn fetch_artifact(&self, handle: &JobHandle) -> Result<Artifact> {
        self.set_phase(JobPhase::Fetching).await;

        let url = self.config.download_url(handle.task_id());
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                self.set_phase(JobPhase::DoneWithArtifactError).await;
                return Err(JobError::ArtifactError {
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.set_phase(JobPhase::DoneWithArtifactError).await;
            return Err(JobError::ArtifactError {
                message: status
                    .canonical_reason()
                    .unwrap_or("download failed")
                    .to_string(),
            });
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.set_phase(JobPhase::DoneWithArtifactError).await;
                return Err(JobError::ArtifactError {
                    message: e.to_string(),
                });
            }
        };

        info!(
            "Downloaded {} bytes for task {}",
            bytes.len(),
            handle.task_id()
        );
        self.set_phase(JobPhase::Done).await;

        Ok(Artifact {
            content: bytes.to_vec(),
            file_name: handle.suggested_name().to_string(),
        })
    }

    /// Drive a request through the whole lifecycle
    ///
    /// Submits, polls until a terminal status, then downloads the artifact.
    /// A backend-reported translation failure surfaces as `JobFailed`.
    pub async fn run(&self, request: &TranslationRequest) -> Result<Artifact> {
        let handle = self.submit(request).await?;
        let mut poller = self.poll_status(&handle);

        let mut last_state = None;
        while let Some(status) = poller.next().await {
            let status = status?;
            debug!(
                "Task {}: {} ({}%)",
                handle.task_id(),
                status.state,
                status.progress
            );
            last_state = Some(status.state);
        }

        match last_state {
            Some(JobState::Succeeded) => self.fetch_artifact(&handle).await,
            Some(JobState::Failed) => Err(JobError::JobFailed),
            _ => Err(JobError::ConnectionError {
                message: "polling stopped before completion".to_string(),
            }),
        }
    }

    async fn set_phase(&self, phase: JobPhase) {
        self.tracked.lock().await.phase = phase;
    }
}

/// Lazy, finite sequence of job statuses
///
/// Each call to `next` sleeps one poll interval, re-checks the cancellation
/// flag, then performs a single status request. One transport failure is
/// fatal to the sequence; there is no retry.
#[derive(Debug)]
pub struct StatusPoller {
    http: reqwest::Client,
    url: String,
    interval: Duration,
    handle: JobHandle,
    tracked: Arc<Mutex<TrackedJob>>,
    last_progress: u8,
    finished: bool,
}

impl StatusPoller {
    /// Next observed status, or `None` once the sequence is over
    pub async fn next(&mut self) -> Option<Result<JobStatus>> {
        if self.finished {
            return None;
        }

        if self.handle.is_cancelled() {
            self.finished = true;
            return None;
        }

        sleep(self.interval).await;

        // Re-check after the sleep so a superseded job never acts on its tick
        if self.handle.is_cancelled() {
            self.finished = true;
            return None;
        }

        let response = match self.http.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => return Some(self.fail(e.to_string()).await),
        };

        let wire: StatusResponse = match response.json().await {
            Ok(wire) => wire,
            Err(e) => return Some(self.fail(e.to_string()).await),
        };

        let status = wire.into_status(self.last_progress);
        self.last_progress = status.progress;

        // A response that raced a newer submission must not touch shared state
        if self.handle.is_cancelled() {
            self.finished = true;
            return None;
        }

        {
            let mut tracked = self.tracked.lock().await;
            tracked.progress = status.progress;
            tracked.phase = match status.state {
                JobState::Running => JobPhase::Running,
                JobState::Succeeded => JobPhase::Fetching,
                JobState::Failed => JobPhase::Failed,
            };
        }

        if status.state.is_terminal() {
            self.finished = true;
        }

        Some(Ok(status))
    }

    async fn fail(&mut self, message: String) -> Result<JobStatus> {
        warn!("Polling error for task {}: {}", self.handle.task_id(), message);
        self.finished = true;

        if !self.handle.is_cancelled() {
            self.tracked.lock().await.phase = JobPhase::Errored;
        }

        Err(JobError::ConnectionError { message })
    }
}
