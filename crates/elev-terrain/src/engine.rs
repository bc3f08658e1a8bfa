//! Camera-driven terrain provider selection.
//!
//! An [`AutoSelectionEngine`] owns one viewer for its whole life:
//!
//! 1. [`attach`](AutoSelectionEngine::attach) reads the persisted mode and
//!    captures the provider the viewer was showing.
//! 2. Mode changes, settled camera positions and the first directory listing
//!    each trigger one synchronous evaluation. The result is pushed to the
//!    viewer only if it differs from what the engine last installed.
//! 3. [`teardown`](AutoSelectionEngine::teardown) (or drop) puts the captured
//!    provider back if the engine ever changed it.

use elev_common::GeoPoint;
use elev_metrics::{metric_defs, metrics};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::selection::evaluate;
use crate::{
    ModeBroadcast, ModeChange, PreferenceError, PreferenceStore, SelectionMode, TerrainLayer,
    TerrainViewer, MODE_PREFERENCE_KEY,
};

struct Bus {
    broadcast: ModeBroadcast,
    rx: broadcast::Receiver<ModeChange>,
}

/// Keeps one viewer's terrain provider in line with the selection mode and
/// the camera position.
pub struct AutoSelectionEngine<V: TerrainViewer, P: PreferenceStore> {
    id: u64,
    viewer: V,
    preferences: P,
    bus: Option<Bus>,
    mode: SelectionMode,
    layers: Vec<TerrainLayer>,
    position: Option<GeoPoint>,
    active_url: Option<String>,
    previous: V::Snapshot,
    mutated: bool,
    directory_seen: bool,
    torn_down: bool,
}

impl<V: TerrainViewer, P: PreferenceStore> AutoSelectionEngine<V, P> {
    /// Take ownership of `viewer` and start with the persisted mode.
    ///
    /// A missing or unreadable preference starts in automatic mode.
    pub fn attach(viewer: V, preferences: P, broadcast: Option<&ModeBroadcast>) -> Self {
        let mode = match preferences.get(MODE_PREFERENCE_KEY) {
            Ok(Some(value)) => SelectionMode::parse(&value),
            Ok(None) => SelectionMode::Auto,
            Err(e) => {
                warn!(error = %e, "could not read terrain mode preference, using auto");
                SelectionMode::Auto
            }
        };
        let previous = viewer.snapshot();
        let (id, bus) = match broadcast {
            Some(broadcast) => (
                broadcast.register(),
                Some(Bus {
                    broadcast: broadcast.clone(),
                    rx: broadcast.subscribe(),
                }),
            ),
            None => (0, None),
        };
        info!(engine = id, %mode, "terrain selection attached");

        Self {
            id,
            viewer,
            preferences,
            bus,
            mode,
            layers: Vec::new(),
            position: None,
            active_url: None,
            previous,
            mutated: false,
            directory_seen: false,
            torn_down: false,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> &SelectionMode {
        &self.mode
    }

    /// URL the engine last installed; `None` while the original provider is
    /// showing.
    pub fn active_provider(&self) -> Option<&str> {
        self.active_url.as_deref()
    }

    /// Last settled camera position.
    pub fn position(&self) -> Option<GeoPoint> {
        self.position
    }

    /// The owned viewer.
    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// True after [`teardown`](Self::teardown).
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Change the mode, persist it, tell other engines and re-evaluate.
    ///
    /// The mode takes effect even when it cannot be persisted; the storage
    /// error is returned afterwards.
    pub fn set_mode(&mut self, mode: SelectionMode) -> Result<(), PreferenceError> {
        if self.torn_down {
            return Ok(());
        }
        info!(engine = self.id, %mode, "terrain mode changed");
        let persisted = self
            .preferences
            .set(MODE_PREFERENCE_KEY, mode.as_preference());
        if let Err(e) = &persisted {
            warn!(error = %e, "could not persist terrain mode");
        }
        if let Some(bus) = &self.bus {
            bus.broadcast.publish(self.id, &mode);
        }
        self.mode = mode;
        self.reevaluate("mode");
        persisted
    }

    /// The camera came to rest at `position`.
    pub fn on_camera_settled(&mut self, position: GeoPoint) {
        if self.torn_down {
            return;
        }
        self.position = Some(position);
        self.reevaluate("camera");
    }

    /// A directory listing is available.
    ///
    /// The list always replaces the engine's copy, but only the first one
    /// triggers an evaluation; later refreshes wait for the next camera or
    /// mode change.
    pub fn on_directory_fetched(&mut self, layers: &[TerrainLayer]) {
        if self.torn_down {
            return;
        }
        self.layers = layers.to_vec();
        if !self.directory_seen {
            self.directory_seen = true;
            self.reevaluate("directory");
        }
    }

    /// Adopt mode changes published by other engines.
    ///
    /// Returns how many were applied. Adopted modes are neither persisted
    /// nor re-published.
    pub fn poll_mode_changes(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        let mut changes = Vec::new();
        if let Some(bus) = &mut self.bus {
            loop {
                match bus.rx.try_recv() {
                    Ok(change) if change.origin == self.id => continue,
                    Ok(change) => changes.push(change),
                    Err(TryRecvError::Lagged(skipped)) => {
                        debug!(engine = self.id, skipped, "missed terrain mode changes");
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        for change in &changes {
            self.mode = change.event.selection_mode();
            debug!(
                engine = self.id,
                origin = change.origin,
                mode = %self.mode,
                "adopting terrain mode"
            );
            self.reevaluate("broadcast");
        }
        changes.len()
    }

    /// Provider URL the current inputs select.
    pub fn desired_provider(&self) -> Option<&str> {
        evaluate(self.position, &self.layers, &self.mode)
    }

    /// Push `desired` to the viewer unless it is already active.
    ///
    /// `None` reinstalls the provider captured at attach. Returns `true`
    /// when the viewer was changed. A viewer failure is logged and the
    /// previously active provider is still considered active.
    pub fn apply_if_changed(&mut self, desired: Option<&str>) -> bool {
        if self.torn_down || desired == self.active_url.as_deref() {
            return false;
        }
        let result = match desired {
            Some(url) => self.viewer.install(url),
            None => self.viewer.restore(&self.previous),
        };
        match result {
            Ok(()) => {
                info!(
                    engine = self.id,
                    from = ?self.active_url,
                    to = ?desired,
                    "terrain provider switched"
                );
                self.active_url = desired.map(str::to_string);
                self.mutated = true;
                metrics::counter!(metric_defs::SELECTION_PROVIDER_SWITCHES.name).increment(1);
                true
            }
            Err(e) => {
                warn!(engine = self.id, error = %e, "viewer rejected terrain provider");
                false
            }
        }
    }

    /// Stop reacting and give the viewer back its original provider.
    ///
    /// Idempotent. The original provider is only reinstalled if the engine
    /// left something else installed.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if self.mutated && self.active_url.is_some() {
            match self.viewer.restore(&self.previous) {
                Ok(()) => self.active_url = None,
                Err(e) => {
                    warn!(engine = self.id, error = %e, "could not restore terrain provider");
                }
            }
        }
        self.bus = None;
        info!(engine = self.id, "terrain selection detached");
    }

    fn reevaluate(&mut self, trigger: &'static str) {
        metrics::counter!(metric_defs::SELECTION_EVALUATIONS.name, "trigger" => trigger)
            .increment(1);
        let desired = self.desired_provider().map(str::to_string);
        debug!(engine = self.id, trigger, desired = ?desired, "terrain selection evaluated");
        self.apply_if_changed(desired.as_deref());
    }
}

impl<V: TerrainViewer, P: PreferenceStore> Drop for AutoSelectionEngine<V, P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryPreferences, MemoryViewer};
    use elev_common::Bbox;
    use std::sync::Arc;

    const BASE: &str = "https://cdn/base";

    fn layers() -> Vec<TerrainLayer> {
        vec![
            TerrainLayer::new(
                "navarra",
                "Navarra",
                "https://cdn/navarra",
                Some(Bbox::new(-2.5, 42.0, -1.0, 43.5).unwrap()),
            ),
            TerrainLayer::new(
                "spain",
                "Spain",
                "https://cdn/spain",
                Some(Bbox::new(-9.5, 36.0, 3.5, 44.0).unwrap()),
            ),
        ]
    }

    fn engine() -> AutoSelectionEngine<MemoryViewer, MemoryPreferences> {
        AutoSelectionEngine::attach(MemoryViewer::new(Some(BASE)), MemoryPreferences::new(), None)
    }

    #[test]
    fn test_apply_if_changed_is_idempotent() {
        let mut engine = engine();
        assert!(engine.apply_if_changed(Some("https://cdn/spain")));
        assert!(!engine.apply_if_changed(Some("https://cdn/spain")));
        assert_eq!(engine.viewer().mutations(), 1);
    }

    #[test]
    fn test_first_directory_fetch_evaluates_once() {
        let mut engine = engine();
        engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
        assert_eq!(engine.viewer().mutations(), 0);

        engine.on_directory_fetched(&layers());
        assert_eq!(engine.active_provider(), Some("https://cdn/navarra"));

        let mut reordered = layers();
        reordered.reverse();
        engine.on_directory_fetched(&reordered);
        assert_eq!(engine.active_provider(), Some("https://cdn/navarra"));
        assert_eq!(engine.viewer().mutations(), 1);

        engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
        assert_eq!(engine.active_provider(), Some("https://cdn/spain"));
    }

    #[test]
    fn test_off_overrides_auto_match() {
        let mut engine = engine();
        engine.on_directory_fetched(&layers());
        engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
        assert_eq!(engine.active_provider(), Some("https://cdn/navarra"));

        engine.set_mode(SelectionMode::Off).unwrap();
        assert_eq!(engine.active_provider(), None);
        assert_eq!(engine.viewer().current(), Some(BASE));
    }

    #[test]
    fn test_teardown_restores_original_provider() {
        let mut engine = engine();
        engine.on_directory_fetched(&layers());
        for position in [
            GeoPoint::new(-1.64, 42.81),
            GeoPoint::new(-3.7, 40.4),
            GeoPoint::new(-1.64, 42.81),
        ] {
            engine.on_camera_settled(position);
        }
        engine.set_mode(SelectionMode::Layer("spain".into())).unwrap();
        assert_eq!(engine.viewer().current(), Some("https://cdn/spain"));

        engine.teardown();
        engine.teardown();
        assert_eq!(engine.viewer().current(), Some(BASE));
        assert!(engine.is_torn_down());

        let mutations = engine.viewer().mutations();
        engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
        engine.set_mode(SelectionMode::Auto).unwrap();
        assert!(!engine.apply_if_changed(Some("https://cdn/navarra")));
        assert_eq!(engine.viewer().mutations(), mutations);
    }

    #[test]
    fn test_teardown_without_changes_leaves_viewer_alone() {
        let mut engine = engine();
        engine.teardown();
        assert_eq!(engine.viewer().mutations(), 0);
    }

    #[test]
    fn test_viewer_failure_keeps_active_provider() {
        let viewer = MemoryViewer::new(Some(BASE)).fail_installs_of("https://cdn/spain");
        let mut engine = AutoSelectionEngine::attach(viewer, MemoryPreferences::new(), None);
        engine.on_directory_fetched(&layers());
        engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
        assert_eq!(engine.active_provider(), Some("https://cdn/navarra"));

        engine.on_camera_settled(GeoPoint::new(-3.7, 40.4));
        assert_eq!(engine.active_provider(), Some("https://cdn/navarra"));
        assert_eq!(engine.viewer().current(), Some("https://cdn/navarra"));
    }

    #[test]
    fn test_mode_persisted_and_restored() {
        let prefs = Arc::new(MemoryPreferences::new());
        {
            let mut engine =
                AutoSelectionEngine::attach(MemoryViewer::new(None), Arc::clone(&prefs), None);
            engine.set_mode(SelectionMode::Layer("navarra".into())).unwrap();
        }
        assert_eq!(
            prefs.get(MODE_PREFERENCE_KEY).unwrap().as_deref(),
            Some("navarra")
        );

        let engine = AutoSelectionEngine::attach(MemoryViewer::new(None), prefs, None);
        assert_eq!(engine.mode(), &SelectionMode::Layer("navarra".into()));
    }

    #[test]
    fn test_mode_broadcast_between_engines() {
        let bus = ModeBroadcast::new();
        let prefs = Arc::new(MemoryPreferences::new());
        let mut a =
            AutoSelectionEngine::attach(MemoryViewer::new(None), Arc::clone(&prefs), Some(&bus));
        let mut b =
            AutoSelectionEngine::attach(MemoryViewer::new(None), Arc::clone(&prefs), Some(&bus));
        b.on_directory_fetched(&layers());

        a.set_mode(SelectionMode::Layer("spain".into())).unwrap();
        assert_eq!(a.poll_mode_changes(), 0);
        assert_eq!(b.poll_mode_changes(), 1);
        assert_eq!(b.mode(), &SelectionMode::Layer("spain".into()));
        assert_eq!(b.viewer().current(), Some("https://cdn/spain"));
    }
}
