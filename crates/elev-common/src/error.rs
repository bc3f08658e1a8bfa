//! Error types shared across the elevation crates.

use thiserror::Error;

/// Reasons a bounding box is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BboxError {
    /// Not exactly four values.
    #[error("bbox must have exactly 4 values, got {0}")]
    WrongLength(usize),

    /// A value is NaN or infinite.
    #[error("bbox value at position {index} is not a finite number")]
    NonFinite {
        /// Position in `(min_x, min_y, max_x, max_y)` order.
        index: usize,
    },

    /// Minimum is not strictly below the maximum on one axis.
    #[error("bbox min{axis} ({min}) must be less than max{axis} ({max})")]
    Inverted {
        /// `"x"` or `"y"`.
        axis: &'static str,
        /// The offending minimum.
        min: f64,
        /// The offending maximum.
        max: f64,
    },
}

/// Failures of the HTTP collaborator itself (not HTTP error statuses).
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be sent or the response not read.
    #[error("HTTP request to {url} failed: {reason}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// The client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}
