//! # elev-terrain
//!
//! Terrain dataset directory and automatic terrain provider selection for a
//! 3D map viewer.
//!
//! - [`LayerDirectory`] caches the backend's list of [`TerrainLayer`]s and
//!   keeps the last good list when the backend is unreachable.
//! - [`evaluate`] decides which layer a camera position should show under a
//!   [`SelectionMode`].
//! - [`AutoSelectionEngine`] owns a [`TerrainViewer`], re-evaluates on mode,
//!   camera and directory changes, and only touches the viewer when the
//!   selected provider actually changes.
//!
//! ## Example
//!
//! ```
//! use elev_common::{Bbox, GeoPoint};
//! use elev_terrain::{AutoSelectionEngine, MemoryPreferences, MemoryViewer, TerrainLayer};
//!
//! let layers = vec![TerrainLayer::new(
//!     "navarra",
//!     "Navarra 5m",
//!     "https://cdn.example.org/terrain/navarra",
//!     Some(Bbox::new(-2.5, 42.0, -1.0, 43.5)?),
//! )];
//!
//! let mut engine =
//!     AutoSelectionEngine::attach(MemoryViewer::new(None), MemoryPreferences::new(), None);
//! engine.on_directory_fetched(&layers);
//! engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
//! assert_eq!(engine.active_provider(), Some("https://cdn.example.org/terrain/navarra"));
//!
//! engine.teardown();
//! assert_eq!(engine.viewer().current(), None);
//! # Ok::<(), elev_common::BboxError>(())
//! ```

mod broadcast;
mod directory;
mod engine;
mod error;
mod layer;
mod preference;
mod selection;
mod viewer;

pub use broadcast::{ModeBroadcast, ModeChange, ModeEvent};
pub use directory::{LayerDirectory, RefreshOutcome};
pub use engine::AutoSelectionEngine;
pub use error::{DirectoryError, PreferenceError, ViewerError};
pub use layer::TerrainLayer;
pub use preference::{
    FilePreferences, MemoryPreferences, PreferenceStore, MODE_PREFERENCE_KEY,
};
pub use selection::{evaluate, SelectionMode};
pub use viewer::{MemoryViewer, TerrainViewer};
