//! Mode change notifications between engines.
//!
//! When one engine's mode changes, every other engine attached to the same
//! [`ModeBroadcast`] hears about it as a single `{mode, layer?}` event.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::SelectionMode;

const CAPACITY: usize = 64;

/// Wire form of a mode change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeEvent {
    /// `"auto"`, `"off"` or `"layer"`.
    pub mode: String,
    /// Pinned layer id in `"layer"` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

impl From<&SelectionMode> for ModeEvent {
    fn from(mode: &SelectionMode) -> Self {
        match mode {
            SelectionMode::Auto => ModeEvent {
                mode: "auto".to_string(),
                layer: None,
            },
            SelectionMode::Off => ModeEvent {
                mode: "off".to_string(),
                layer: None,
            },
            SelectionMode::Layer(id) => ModeEvent {
                mode: "layer".to_string(),
                layer: Some(id.clone()),
            },
        }
    }
}

impl ModeEvent {
    /// Selection mode this event describes.
    ///
    /// `"layer"` without an id and unknown modes fall back to automatic.
    pub fn selection_mode(&self) -> SelectionMode {
        match (self.mode.as_str(), &self.layer) {
            ("off", _) => SelectionMode::Off,
            ("layer", Some(id)) if !id.is_empty() => SelectionMode::Layer(id.clone()),
            _ => SelectionMode::Auto,
        }
    }
}

/// A mode change as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    /// Engine that made the change.
    pub origin: u64,
    /// Wire payload.
    pub event: ModeEvent,
}

/// Shared bus for mode changes.
#[derive(Debug, Clone)]
pub struct ModeBroadcast {
    tx: broadcast::Sender<ModeChange>,
    next_id: Arc<AtomicU64>,
}

impl Default for ModeBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeBroadcast {
    /// Create a bus.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate an origin id for a new participant.
    pub(crate) fn register(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Receive every change published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ModeChange> {
        self.tx.subscribe()
    }

    /// Publish a change; returns how many subscribers received it.
    pub fn publish(&self, origin: u64, mode: &SelectionMode) -> usize {
        self.tx
            .send(ModeChange {
                origin,
                event: ModeEvent::from(mode),
            })
            .unwrap_or(0)
    }
}
