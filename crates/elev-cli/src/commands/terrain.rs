//! Terrain commands: layers, select, mode.

use clap::Args;
use elev_common::{GeoPoint, ReqwestClient};
use elev_terrain::{
    AutoSelectionEngine, FilePreferences, LayerDirectory, ModeEvent, RefreshOutcome,
    SelectionMode,
};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::viewer::LoggingViewer;
use crate::{CliError, Config};

/// Arguments for `elev select`.
#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Camera path file, one "lon,lat" per line ('#' starts a comment)
    pub path: PathBuf,
}

/// Arguments for `elev mode`.
#[derive(Debug, Args)]
pub struct ModeArgs {
    /// New mode: "auto", "off" or "layer:<id>". Omit to show the current one.
    pub mode: Option<String>,
}

fn directory(config: &Config) -> Result<LayerDirectory<ReqwestClient>, CliError> {
    let http = ReqwestClient::with_timeout(config.request_timeout())?;
    Ok(LayerDirectory::new(
        http,
        config.endpoints(),
        config.credentials(),
    ))
}

/// List the backend's terrain layers.
pub async fn layers(config: &Config) -> Result<(), CliError> {
    let mut directory = directory(config)?;
    if let RefreshOutcome::Retained { error } = directory.refresh().await {
        return Err(error.into());
    }

    if directory.list().is_empty() {
        println!("No terrain layers registered.");
        return Ok(());
    }

    for layer in directory.list() {
        let coverage = layer
            .bbox
            .map(|bbox| bbox.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        let status = if layer.is_active { "active" } else { "inactive" };
        println!("{}  {}", layer.id, layer.name);
        println!("    url:      {}", layer.url);
        println!("    coverage: {coverage} ({status})");
    }
    Ok(())
}

/// Replay a camera path through the selection engine.
pub async fn select(args: SelectArgs, config: &Config) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.path).map_err(|source| CliError::Read {
        path: args.path.clone(),
        source,
    })?;
    let path = parse_camera_path(&text)?;

    let mut directory = directory(config)?;
    if let RefreshOutcome::Retained { error } = directory.refresh().await {
        warn!(error = %error, "continuing without terrain layers");
    }

    let preferences = FilePreferences::new(&config.preferences_path);
    let mut engine = AutoSelectionEngine::attach(LoggingViewer::new(), preferences, None);
    info!(mode = %engine.mode(), points = path.len(), "replaying camera path");

    if directory.has_fetched() {
        engine.on_directory_fetched(directory.list());
    }

    for point in path {
        engine.on_camera_settled(point);
        println!(
            "{},{} -> {}",
            point.lon,
            point.lat,
            engine.active_provider().unwrap_or("<built-in>")
        );
    }

    engine.teardown();
    println!(
        "{} provider change(s), viewer left on {}",
        engine.viewer().switches(),
        engine.viewer().current().unwrap_or("<built-in>")
    );
    Ok(())
}

/// Show or change the persisted selection mode.
///
/// Goes through a headless engine so the preference is only ever read and
/// written the way a live viewer session would.
pub fn mode(args: ModeArgs, config: &Config) -> Result<(), CliError> {
    let preferences = FilePreferences::new(&config.preferences_path);
    let mut engine = AutoSelectionEngine::attach(LoggingViewer::new(), preferences, None);

    if let Some(value) = args.mode {
        engine.set_mode(SelectionMode::parse(&value))?;
        info!(
            mode = %engine.mode(),
            path = %config.preferences_path.display(),
            "terrain mode saved"
        );
    }
    let mode = engine.mode().clone();
    engine.teardown();

    let event = serde_json::to_string(&ModeEvent::from(&mode))
        .map_err(|e| CliError::Config(e.to_string()))?;
    println!("{mode} {event}");
    Ok(())
}

/// Parse a camera path: one `lon,lat` pair per line.
///
/// Blank lines and `#` comments are ignored.
fn parse_camera_path(text: &str) -> Result<Vec<GeoPoint>, CliError> {
    let mut points = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let error = |reason: String| CliError::CameraPath {
            line: index + 1,
            reason,
        };

        let (lon, lat) = line
            .split_once(',')
            .ok_or_else(|| error(format!("expected 'lon,lat', got '{line}'")))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| error(format!("invalid longitude '{}'", lon.trim())))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| error(format!("invalid latitude '{}'", lat.trim())))?;
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(error(format!("({lon}, {lat}) is outside WGS84 range")));
        }
        points.push(GeoPoint::new(lon, lat));
    }
    Ok(points)
}
