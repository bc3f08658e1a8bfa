//! Ingestion requests and their client-side validation.
//!
//! An [`IngestionRequest`] is what the operator asked for, exactly as
//! given. [`IngestionRequest::validate`] turns it into a
//! [`ValidatedRequest`] or explains which field is wrong; the submission
//! client never touches the network with anything that did not pass.

use bytes::Bytes;
use elev_common::Bbox;
use std::path::Path;

use crate::ValidationError;

/// Which of the two ingestion endpoints a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionMode {
    /// The backend fetches the listed source URLs itself.
    Remote,
    /// The operator uploads one elevation file.
    Upload,
}

impl IngestionMode {
    /// Lowercase name used in logs and metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            IngestionMode::Remote => "remote",
            IngestionMode::Upload => "upload",
        }
    }
}

/// A file picked by the operator for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    /// Name sent in the multipart content disposition.
    pub file_name: String,
    /// File contents.
    pub payload: Bytes,
}

impl LocalFile {
    /// Wrap an in-memory payload.
    pub fn new(file_name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: payload.into(),
        }
    }

    /// Read a file from disk, keeping only its final path component as name.
    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let payload = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.tif".to_string());
        Ok(Self::new(file_name, payload))
    }
}

/// An ingestion request as supplied by the caller.
///
/// Fields are kept raw so that [`validate`](Self::validate) can report
/// exactly what was wrong with them.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionRequest {
    /// Target endpoint.
    pub mode: IngestionMode,
    /// Region or country code, e.g. `"uk"`.
    pub region_code: String,
    /// `(min_x, min_y, max_x, max_y)` in degrees. Optional for uploads.
    pub bbox: Option<Vec<f64>>,
    /// Remote sources; remote mode only.
    pub source_urls: Vec<String>,
    /// Uploaded file; upload mode only.
    pub local_file: Option<LocalFile>,
}

impl IngestionRequest {
    /// Remote-URL request.
    pub fn remote(
        region_code: impl Into<String>,
        bbox: impl Into<Vec<f64>>,
        source_urls: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            mode: IngestionMode::Remote,
            region_code: region_code.into(),
            bbox: Some(bbox.into()),
            source_urls: source_urls.into_iter().map(Into::into).collect(),
            local_file: None,
        }
    }

    /// File-upload request.
    pub fn upload(region_code: impl Into<String>, local_file: Option<LocalFile>) -> Self {
        Self {
            mode: IngestionMode::Upload,
            region_code: region_code.into(),
            bbox: None,
            source_urls: Vec::new(),
            local_file,
        }
    }

    /// Attach a bounding box.
    pub fn with_bbox(mut self, bbox: impl Into<Vec<f64>>) -> Self {
        self.bbox = Some(bbox.into());
        self
    }

    /// Check every field and produce the request that will be sent.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let region_code = self.region_code.trim();
        if region_code.is_empty() {
            return Err(ValidationError::new("region_code", "must not be empty"));
        }

        let bbox = match &self.bbox {
            Some(values) => Some(Bbox::from_slice(values)?),
            None => None,
        };

        let source = match self.mode {
            IngestionMode::Remote => {
                if self.local_file.is_some() {
                    return Err(ValidationError::new(
                        "local_file",
                        "remote ingestion cannot carry an uploaded file",
                    ));
                }
                if bbox.is_none() {
                    return Err(ValidationError::new(
                        "bbox",
                        "required for remote ingestion",
                    ));
                }
                let source_urls: Vec<String> = self
                    .source_urls
                    .iter()
                    .map(|url| url.trim())
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .collect();
                if source_urls.is_empty() {
                    return Err(ValidationError::new(
                        "source_urls",
                        "at least one non-empty source URL is required",
                    ));
                }
                IngestionSource::Remote { source_urls }
            }
            IngestionMode::Upload => {
                if !self.source_urls.is_empty() {
                    return Err(ValidationError::new(
                        "source_urls",
                        "file upload cannot carry remote source URLs",
                    ));
                }
                match &self.local_file {
                    Some(file) if !file.payload.is_empty() => IngestionSource::Upload(file.clone()),
                    Some(_) => {
                        return Err(ValidationError::new("local_file", "file is empty"));
                    }
                    None => {
                        return Err(ValidationError::new("local_file", "no file selected"));
                    }
                }
            }
        };

        Ok(ValidatedRequest {
            region_code: region_code.to_string(),
            bbox,
            source,
        })
    }
}

/// Payload of a validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionSource {
    /// Trimmed, non-empty source URLs.
    Remote {
        /// URLs for the backend to fetch.
        source_urls: Vec<String>,
    },
    /// Non-empty uploaded file.
    Upload(LocalFile),
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    region_code: String,
    bbox: Option<Bbox>,
    source: IngestionSource,
}

impl ValidatedRequest {
    /// Trimmed region code.
    pub fn region_code(&self) -> &str {
        &self.region_code
    }

    /// Bounding box; always present in remote mode.
    pub fn bbox(&self) -> Option<Bbox> {
        self.bbox
    }

    /// Remote URLs or uploaded file.
    pub fn source(&self) -> &IngestionSource {
        &self.source
    }

    /// Endpoint this request targets.
    pub fn mode(&self) -> IngestionMode {
        match self.source {
            IngestionSource::Remote { .. } => IngestionMode::Remote,
            IngestionSource::Upload(_) => IngestionMode::Upload,
        }
    }
}
