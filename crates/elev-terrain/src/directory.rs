//! Cached directory of terrain layers.

use elev_common::{ApiEndpoints, Credentials, HttpClient, HttpRequest};
use elev_metrics::{metric_defs, metrics};
use serde_json::Value;
use tracing::{info, warn};

use crate::{DirectoryError, TerrainLayer};

/// What a [`LayerDirectory::refresh`] did.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A fresh list replaced the cache.
    Fetched {
        /// Number of layers now cached.
        count: usize,
        /// True for the first successful fetch of this directory.
        first: bool,
    },
    /// The fetch failed; the previous list (possibly empty) is kept.
    Retained {
        /// Why the fetch failed.
        error: DirectoryError,
    },
}

impl RefreshOutcome {
    /// True when this refresh was the directory's first successful fetch.
    pub fn is_first_fetch(&self) -> bool {
        matches!(self, RefreshOutcome::Fetched { first: true, .. })
    }
}

/// Read-mostly cache of the backend's terrain layers.
///
/// Nothing is fetched until [`refresh`](Self::refresh) is called, and a
/// failed refresh never discards what was already known.
#[derive(Debug)]
pub struct LayerDirectory<H> {
    http: H,
    endpoints: ApiEndpoints,
    credentials: Credentials,
    layers: Vec<TerrainLayer>,
    fetched: bool,
}

impl<H: HttpClient> LayerDirectory<H> {
    /// Create an empty directory.
    pub fn new(http: H, endpoints: ApiEndpoints, credentials: Credentials) -> Self {
        Self {
            http,
            endpoints,
            credentials,
            layers: Vec::new(),
            fetched: false,
        }
    }

    /// Layers from the last successful fetch, in directory order.
    pub fn list(&self) -> &[TerrainLayer] {
        &self.layers
    }

    /// True once any fetch has succeeded.
    pub fn has_fetched(&self) -> bool {
        self.fetched
    }

    /// Look a layer up by id.
    pub fn get(&self, id: &str) -> Option<&TerrainLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Fetch the list once. Failures are logged and the cache is kept.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        match self.fetch().await {
            Ok(layers) => {
                let first = !self.fetched;
                self.fetched = true;
                self.layers = layers;
                let count = self.layers.len();
                info!(count, first, "terrain layer directory refreshed");
                metrics::counter!(metric_defs::DIRECTORY_REFRESHES.name, "outcome" => "fetched")
                    .increment(1);
                metrics::gauge!(metric_defs::DIRECTORY_LAYERS.name).set(count as f64);
                RefreshOutcome::Fetched { count, first }
            }
            Err(error) => {
                warn!(
                    error = %error,
                    retained = self.layers.len(),
                    "terrain layer directory unavailable, keeping last known layers"
                );
                metrics::counter!(metric_defs::DIRECTORY_REFRESHES.name, "outcome" => "retained")
                    .increment(1);
                RefreshOutcome::Retained { error }
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<TerrainLayer>, DirectoryError> {
        let request =
            HttpRequest::get(self.endpoints.layers_url()).with_credentials(&self.credentials);
        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(DirectoryError::Status(response.status));
        }
        let records: Vec<Value> = response
            .json()
            .map_err(|e| DirectoryError::InvalidBody(e.to_string()))?;
        Ok(records
            .into_iter()
            .filter_map(TerrainLayer::from_record)
            .collect())
    }
}
