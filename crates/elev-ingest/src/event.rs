//! Status frame codec.
//!
//! The backend pushes one JSON text frame per status update:
//!
//! ```json
//! {"status": "RUNNING", "progress": 40, "message": "Reprojecting", "error": null}
//! ```
//!
//! Frames are decoded once, here, into the closed [`JobEvent`] set. Nothing
//! downstream ever sees raw status strings.

use serde::Deserialize;
use serde_json::Value;

use crate::{DecodeError, JobState};

/// One decoded status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Still waiting for a worker.
    Queued {
        /// Optional status text.
        message: Option<String>,
    },
    /// Processing.
    Running {
        /// Percentage as received, if any.
        progress: Option<u8>,
        /// Optional status text.
        message: Option<String>,
    },
    /// Terminal success.
    Succeeded {
        /// Percentage as received, if any.
        progress: Option<u8>,
        /// Optional status text.
        message: Option<String>,
    },
    /// Terminal failure.
    Failed {
        /// Failure description.
        message: String,
    },
}

impl JobEvent {
    /// Lifecycle state this event moves the job into.
    pub fn state(&self) -> JobState {
        match self {
            JobEvent::Queued { .. } => JobState::Queued,
            JobEvent::Running { .. } => JobState::Running,
            JobEvent::Succeeded { .. } => JobState::Succeeded,
            JobEvent::Failed { .. } => JobState::Failed,
        }
    }

    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Reported progress, if any.
    pub fn progress(&self) -> Option<u8> {
        match self {
            JobEvent::Running { progress, .. } | JobEvent::Succeeded { progress, .. } => *progress,
            _ => None,
        }
    }

    /// Reported message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            JobEvent::Queued { message }
            | JobEvent::Running { message, .. }
            | JobEvent::Succeeded { message, .. } => message.as_deref(),
            JobEvent::Failed { message } => Some(message),
        }
    }

    /// Lowercase kind, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::Queued { .. } => "queued",
            JobEvent::Running { .. } => "running",
            JobEvent::Succeeded { .. } => "succeeded",
            JobEvent::Failed { .. } => "failed",
        }
    }

    /// Terminal failure describing a lost connection.
    pub fn connection_lost(reason: impl std::fmt::Display) -> Self {
        JobEvent::Failed {
            message: format!("connection error: {reason}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusFrame {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// Decode one status frame.
pub fn decode_frame(frame: &[u8]) -> Result<JobEvent, DecodeError> {
    let frame: StatusFrame =
        serde_json::from_slice(frame).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let message = frame.message.filter(|m| !m.is_empty());

    if let Some(error) = frame.error.as_ref().and_then(error_text) {
        return Ok(JobEvent::Failed { message: error });
    }

    let status = frame.status.ok_or(DecodeError::MissingStatus)?;
    let state = JobState::parse(&status).ok_or(DecodeError::UnknownStatus(status))?;
    let progress = frame.progress.as_ref().map(parse_progress).transpose()?;

    Ok(match state {
        JobState::Queued => JobEvent::Queued { message },
        JobState::Running => JobEvent::Running { progress, message },
        JobState::Succeeded => JobEvent::Succeeded { progress, message },
        JobState::Failed => JobEvent::Failed {
            message: message.unwrap_or_else(|| "job failed".to_string()),
        },
    })
}

/// Non-empty error text, or `None` for `null`/blank values.
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_progress(value: &Value) -> Result<u8, DecodeError> {
    let invalid = || DecodeError::InvalidProgress(value.to_string());
    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    if number.fract() != 0.0 || !(0.0..=100.0).contains(&number) {
        return Err(invalid());
    }
    Ok(number as u8)
}
