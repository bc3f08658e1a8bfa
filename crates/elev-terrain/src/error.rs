//! Error types for the terrain crate.

use elev_common::HttpError;
use thiserror::Error;

/// The layer directory could not be read.
///
/// Never reaches the selection engine: the directory falls back to its last
/// good list and reports the failure through
/// [`RefreshOutcome`](crate::RefreshOutcome).
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The request could not be exchanged.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The backend answered with a non-success status.
    #[error("layer directory unavailable (HTTP {0})")]
    Status(u16),

    /// The body is not a JSON array of layers.
    #[error("invalid layer directory response: {0}")]
    InvalidBody(String),
}

/// Errors reading or writing the persisted selection mode.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// I/O error on the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON.
    #[error("invalid preference file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The viewer refused a provider change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    /// The provider at `url` could not be installed.
    #[error("failed to install terrain provider {url}: {reason}")]
    Install {
        /// Provider URL, or `"<default>"` for the viewer's own provider.
        url: String,
        /// Viewer-supplied reason.
        reason: String,
    },
}
