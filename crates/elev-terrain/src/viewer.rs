//! The viewer collaborator.

use crate::ViewerError;

/// A 3D map viewer whose terrain provider can be swapped.
///
/// Installs are single atomic operations: the viewer never shows two
/// providers at once.
pub trait TerrainViewer {
    /// Whatever the viewer needs to put its current provider back.
    type Snapshot;

    /// Capture the provider currently installed.
    fn snapshot(&self) -> Self::Snapshot;

    /// Install the provider served at `url`.
    fn install(&mut self, url: &str) -> Result<(), ViewerError>;

    /// Reinstall a previously captured provider.
    fn restore(&mut self, snapshot: &Self::Snapshot) -> Result<(), ViewerError>;
}

/// In-memory viewer that records every provider change.
#[derive(Debug, Clone, Default)]
pub struct MemoryViewer {
    current: Option<String>,
    history: Vec<Option<String>>,
    failing: Option<String>,
}

impl MemoryViewer {
    /// A viewer showing `initial` (`None` for the built-in terrain).
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            current: initial.map(str::to_string),
            history: Vec::new(),
            failing: None,
        }
    }

    /// Make installs of `url` fail.
    pub fn fail_installs_of(mut self, url: impl Into<String>) -> Self {
        self.failing = Some(url.into());
        self
    }

    /// Provider currently shown.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Every provider installed so far, in order.
    pub fn history(&self) -> &[Option<String>] {
        &self.history
    }

    /// Number of successful provider changes.
    pub fn mutations(&self) -> usize {
        self.history.len()
    }
}

impl TerrainViewer for MemoryViewer {
    type Snapshot = Option<String>;

    fn snapshot(&self) -> Self::Snapshot {
        self.current.clone()
    }

    fn install(&mut self, url: &str) -> Result<(), ViewerError> {
        if self.failing.as_deref() == Some(url) {
            return Err(ViewerError::Install {
                url: url.to_string(),
                reason: "provider rejected".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.history.push(self.current.clone());
        Ok(())
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) -> Result<(), ViewerError> {
        self.current = snapshot.clone();
        self.history.push(self.current.clone());
        Ok(())
    }
}
