//! CLI error handling.

use elev_common::HttpError;
use elev_ingest::IngestError;
use elev_terrain::{DirectoryError, PreferenceError};
use std::path::PathBuf;
use std::process;
use thiserror::Error;

/// Everything that can end a CLI invocation early.
#[derive(Debug, Error)]
pub enum CliError {
    /// The tracing subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Bad configuration file or values.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The HTTP client could not be built.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Submission or status query failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The terrain mode preference could not be read or written.
    #[error("preference store error: {0}")]
    Preference(#[from] PreferenceError),

    /// The layer directory could not be fetched.
    #[error("layer directory unavailable: {0}")]
    Directory(#[from] DirectoryError),

    /// A tracked job finished unsuccessfully.
    #[error("job {job_id} failed: {message}")]
    JobFailed {
        /// Job id.
        job_id: String,
        /// Failure message.
        message: String,
    },

    /// A camera path line could not be parsed.
    #[error("camera path line {line}: {reason}")]
    CameraPath {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

impl CliError {
    /// Print the error with any extra hints and exit non-zero.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Ingest(IngestError::Validation(err)) => {
                eprintln!();
                eprintln!("Nothing was sent. Fix the '{}' field and try again.", err.field);
            }
            CliError::Ingest(IngestError::Http(_)) | CliError::Directory(DirectoryError::Http(_)) => {
                eprintln!();
                eprintln!("Check that the API URL is reachable (--api-url or ELEV_API_URL).");
            }
            _ => {}
        }

        process::exit(1)
    }
}
