//! Viewer used by `elev select`: it shows nothing and logs every change.

use elev_terrain::{TerrainViewer, ViewerError};
use tracing::info;

/// Headless stand-in for a 3D viewer.
#[derive(Debug, Default)]
pub struct LoggingViewer {
    current: Option<String>,
    switches: usize,
}

impl LoggingViewer {
    /// A viewer showing its built-in terrain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider currently shown; `None` is the built-in terrain.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Number of provider changes so far.
    pub fn switches(&self) -> usize {
        self.switches
    }
}

impl TerrainViewer for LoggingViewer {
    type Snapshot = Option<String>;

    fn snapshot(&self) -> Self::Snapshot {
        self.current.clone()
    }

    fn install(&mut self, url: &str) -> Result<(), ViewerError> {
        info!(%url, "viewer: terrain provider installed");
        self.current = Some(url.to_string());
        self.switches += 1;
        Ok(())
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) -> Result<(), ViewerError> {
        info!(url = snapshot.as_deref().unwrap_or("<built-in>"), "viewer: terrain provider restored");
        self.current = snapshot.clone();
        self.switches += 1;
        Ok(())
    }
}
