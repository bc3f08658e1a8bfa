//! CLI configuration.
//!
//! Values come from an optional YAML file, then from `ELEV_*` environment
//! variables and command-line flags (clap resolves those two, flags first).

use elev_common::{ApiEndpoints, Credentials, DEFAULT_API_BASE_URL, DEFAULT_STREAM_PATH_TEMPLATE};
use elev_ingest::ChannelConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::CliError;

/// Default location of the terrain mode preference file.
pub const DEFAULT_PREFERENCES_PATH: &str = "elev-preferences.json";

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST API base URL.
    pub api_base_url: String,
    /// Status stream base URL; derived from `api_base_url` when unset.
    pub stream_base_url: Option<String>,
    /// Status stream path, `{job_id}` is substituted.
    pub stream_path_template: String,
    /// Bearer token forwarded to the backend.
    pub bearer_token: Option<String>,
    /// Tenant forwarded to the backend.
    pub tenant_id: Option<String>,
    /// HTTP request timeout.
    pub request_timeout_secs: u64,
    /// Give up watching a job after this many silent seconds.
    pub stream_idle_timeout_secs: Option<u64>,
    /// JSON file holding the terrain mode preference.
    pub preferences_path: PathBuf,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            stream_base_url: None,
            stream_path_template: DEFAULT_STREAM_PATH_TEMPLATE.to_string(),
            bearer_token: None,
            tenant_id: None,
            request_timeout_secs: 30,
            stream_idle_timeout_secs: None,
            preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
            log_level: "info".to_string(),
        }
    }
}

/// Values that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--api-url` / `ELEV_API_URL`.
    pub api_base_url: Option<String>,
    /// `--token` / `ELEV_TOKEN`.
    pub bearer_token: Option<String>,
    /// `--tenant` / `ELEV_TENANT`.
    pub tenant_id: Option<String>,
    /// `--log-level`.
    pub log_level: Option<String>,
    /// `--preferences`.
    pub preferences_path: Option<PathBuf>,
}

impl Config {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, CliError> {
        serde_yaml::from_str(yaml).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Load the file at `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|source| CliError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml(&yaml)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides; only values that are present replace the file's.
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.api_base_url {
            self.api_base_url = url;
        }
        if let Some(token) = overrides.bearer_token {
            self.bearer_token = Some(token);
        }
        if let Some(tenant) = overrides.tenant_id {
            self.tenant_id = Some(tenant);
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(path) = overrides.preferences_path {
            self.preferences_path = path;
        }
        self
    }

    /// Reject values no command could work with.
    pub fn validate(&self) -> Result<(), CliError> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CliError::Config(format!(
                "api_base_url must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }
        if !self.stream_path_template.contains("{job_id}") {
            return Err(CliError::Config(
                "stream_path_template must contain {job_id}".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend endpoints.
    pub fn endpoints(&self) -> ApiEndpoints {
        let mut endpoints = ApiEndpoints::new(self.api_base_url.trim());
        endpoints.stream_base_url = self.stream_base_url.clone();
        endpoints.stream_path_template = self.stream_path_template.clone();
        endpoints
    }

    /// Credentials to forward.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_parts(self.bearer_token.clone(), self.tenant_id.clone())
    }

    /// HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Status channel settings.
    pub fn channel(&self) -> ChannelConfig {
        match self.stream_idle_timeout_secs {
            Some(secs) if secs > 0 => {
                ChannelConfig::default().with_idle_timeout(Duration::from_secs(secs))
            }
            _ => ChannelConfig::default(),
        }
    }
}
