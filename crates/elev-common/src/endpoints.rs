//! Backend endpoint layout.

use serde::{Deserialize, Serialize};

/// Default API base URL for local development.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default path of the per-job status stream; `{job_id}` is substituted.
pub const DEFAULT_STREAM_PATH_TEMPLATE: &str = "/api/elevation/ws/{job_id}";

/// URLs of the elevation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    /// Base URL of the REST API, e.g. `https://api.example.org`.
    pub api_base_url: String,
    /// Base URL of the streaming endpoint. Derived from `api_base_url`
    /// (`http` → `ws`, `https` → `wss`) when absent.
    pub stream_base_url: Option<String>,
    /// Path template of the status stream.
    pub stream_path_template: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl ApiEndpoints {
    /// Endpoints rooted at the given API base URL.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            stream_base_url: None,
            stream_path_template: DEFAULT_STREAM_PATH_TEMPLATE.to_string(),
        }
    }

    /// Override the streaming base URL.
    pub fn with_stream_base_url(mut self, url: impl Into<String>) -> Self {
        self.stream_base_url = Some(url.into());
        self
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// `POST` target for remote-URL ingestion.
    pub fn ingest_url(&self) -> String {
        self.api("/api/elevation/ingest")
    }

    /// `POST` target for file uploads.
    pub fn upload_url(&self) -> String {
        self.api("/api/elevation/upload")
    }

    /// Layer directory listing.
    pub fn layers_url(&self) -> String {
        self.api("/api/elevation/layers")
    }

    /// Status polling for one job.
    pub fn status_url(&self, job_id: &str) -> String {
        self.api(&format!("/api/elevation/status/{}", encode_segment(job_id)))
    }

    /// Service health check.
    pub fn health_url(&self) -> String {
        self.api("/health")
    }

    /// Status stream for one job.
    pub fn stream_url(&self, job_id: &str) -> String {
        let base = match &self.stream_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => derive_stream_base(self.api_base_url.trim_end_matches('/')),
        };
        let path = self
            .stream_path_template
            .replace("{job_id}", &encode_segment(job_id));
        format!("{base}{path}")
    }
}

fn derive_stream_base(api_base: &str) -> String {
    if let Some(rest) = api_base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_base.to_string()
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
