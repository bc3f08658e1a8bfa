//! Job handles and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::JobEvent;

/// Opaque identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a backend-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Job lifecycle: `Queued → Running* → {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Accepted, waiting for a worker.
    Queued,
    /// A worker is processing it.
    Running,
    /// Finished and published.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl JobState {
    /// Map a backend status string, case-insensitively.
    ///
    /// Besides the four canonical names this accepts the task-queue states
    /// the backend reports verbatim (`PENDING`, `STARTED`, `PROCESSING`,
    /// `PROGRESS`, `RETRY`, `SUCCESS`, `FAILURE`, `REVOKED`).
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "QUEUED" | "PENDING" | "RECEIVED" => Some(JobState::Queued),
            "RUNNING" | "STARTED" | "PROCESSING" | "PROGRESS" | "RETRY" => Some(JobState::Running),
            "SUCCEEDED" | "SUCCESS" => Some(JobState::Succeeded),
            "FAILED" | "FAILURE" | "REVOKED" => Some(JobState::Failed),
            _ => None,
        }
    }

    /// True once no further events are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Uppercase canonical name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side view of one ingestion job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: JobId,
    state: JobState,
    progress: Option<u8>,
    message: Option<String>,
}

impl Job {
    /// A job in the given initial state.
    pub fn new(id: impl Into<JobId>, state: JobState, message: Option<String>) -> Self {
        Self {
            id: id.into(),
            state,
            progress: None,
            message,
        }
    }

    /// Backend id.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Last reported progress, as received.
    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    /// Last reported message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// True once the job reached `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Fold an event into the job.
    ///
    /// Returns `false` and leaves the job untouched when it is already
    /// terminal.
    pub fn apply(&mut self, event: &JobEvent) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = event.state();
        if let Some(progress) = event.progress() {
            self.progress = Some(progress);
        }
        if let Some(message) = event.message() {
            self.message = Some(message.to_string());
        }
        true
    }
}
