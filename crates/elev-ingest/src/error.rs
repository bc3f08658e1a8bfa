//! Error types for job submission and status tracking.

use elev_common::{BboxError, HttpError};
use thiserror::Error;

/// A request refused before any network call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Offending request field (`bbox`, `source_urls`, `local_file`, ...).
    pub field: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl From<BboxError> for ValidationError {
    fn from(err: BboxError) -> Self {
        Self::new("bbox", err.to_string())
    }
}

/// Errors returned by [`JobSubmissionClient`](crate::JobSubmissionClient).
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request failed client-side validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend answered with a non-success status.
    #[error("rejected by server (HTTP {status}): {detail}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server `detail` verbatim, or a generic message.
        detail: String,
    },

    /// The request could not be exchanged with the backend.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The backend answered 2xx with a body we could not read.
    #[error("invalid response from {url}: {reason}")]
    InvalidResponse {
        /// Endpoint that produced the body.
        url: String,
        /// Parse failure.
        reason: String,
    },
}

/// A status frame that could not be decoded. Logged and dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Frame is not valid UTF-8 JSON of the expected shape.
    #[error("malformed status frame: {0}")]
    Malformed(String),

    /// `status` is missing and no `error` was given.
    #[error("status frame has no status")]
    MissingStatus,

    /// `status` is not a known job state.
    #[error("unknown job status {0:?}")]
    UnknownStatus(String),

    /// `progress` is not an integer in `0..=100`.
    #[error("progress {0} is not an integer percentage")]
    InvalidProgress(String),
}

/// Failures of the streaming transport.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The stream could not be established.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Stream URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// The established stream failed.
    #[error("stream error: {0}")]
    Stream(String),

    /// No frame arrived within the idle timeout.
    #[error("no status update received for {0} seconds")]
    IdleTimeout(u64),
}

/// Result type for submission operations.
pub type Result<T> = std::result::Result<T, IngestError>;
