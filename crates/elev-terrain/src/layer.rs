//! Terrain layer records.

use elev_common::{Bbox, GeoPoint};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// A pre-generated terrain dataset the viewer can display.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainLayer {
    /// Layer id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Provider URL handed to the viewer.
    pub url: String,
    /// Coverage; `None` means unbounded and never matches automatically.
    pub bbox: Option<Bbox>,
    /// Backend activity flag; informational only.
    pub is_active: bool,
}

impl TerrainLayer {
    /// An active layer.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        bbox: Option<Bbox>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            bbox,
            is_active: true,
        }
    }

    /// Mark the layer inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Inclusive coverage test; unbounded layers cover nothing.
    pub fn covers(&self, point: GeoPoint) -> bool {
        self.bbox.is_some_and(|bbox| bbox.contains(point))
    }

    /// Decode one wire record.
    ///
    /// Bounding boxes are only kept when all four edges are present and
    /// form a valid box; anything else leaves the layer unbounded.
    pub(crate) fn from_record(value: Value) -> Option<Self> {
        let record: LayerRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping malformed terrain layer");
                return None;
            }
        };

        let id = match record.id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                warn!(id = %other, "skipping terrain layer with unusable id");
                return None;
            }
        };

        let bbox = match (
            record.bbox_minx,
            record.bbox_miny,
            record.bbox_maxx,
            record.bbox_maxy,
        ) {
            (None, None, None, None) => None,
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => {
                match Bbox::new(min_x, min_y, max_x, max_y) {
                    Ok(bbox) => Some(bbox),
                    Err(e) => {
                        warn!(layer_id = %id, error = %e, "ignoring invalid layer bbox");
                        None
                    }
                }
            }
            _ => {
                warn!(layer_id = %id, "ignoring partial layer bbox");
                None
            }
        };

        Some(Self {
            id,
            name: record.name,
            url: record.url,
            bbox,
            is_active: record.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LayerRecord {
    id: Value,
    name: String,
    url: String,
    #[serde(default)]
    bbox_minx: Option<f64>,
    #[serde(default)]
    bbox_miny: Option<f64>,
    #[serde(default)]
    bbox_maxx: Option<f64>,
    #[serde(default)]
    bbox_maxy: Option<f64>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_record() {
        let layer = TerrainLayer::from_record(json!({
            "id": "5f1c",
            "name": "Navarra 5m",
            "url": "https://cdn.example.org/terrain/navarra",
            "bbox_minx": -2.5, "bbox_miny": 42.0, "bbox_maxx": -1.0, "bbox_maxy": 43.5,
            "is_active": true
        }))
        .unwrap();

        assert_eq!(layer.id, "5f1c");
        assert!(layer.covers(GeoPoint::new(-2.5, 43.5)));
        assert!(!layer.covers(GeoPoint::new(-0.9, 43.0)));
    }

    #[test]
    fn test_partial_or_invalid_bbox_is_unbounded() {
        let partial = TerrainLayer::from_record(json!({
            "id": 7, "name": "Partial", "url": "u", "bbox_minx": -2.5, "bbox_maxy": 43.5
        }))
        .unwrap();
        assert_eq!(partial.id, "7");
        assert_eq!(partial.bbox, None);
        assert!(partial.is_active);

        let inverted = TerrainLayer::from_record(json!({
            "id": "x", "name": "Inverted", "url": "u",
            "bbox_minx": 1.0, "bbox_miny": 42.0, "bbox_maxx": -1.0, "bbox_maxy": 43.5
        }))
        .unwrap();
        assert_eq!(inverted.bbox, None);
        assert!(!inverted.covers(GeoPoint::new(0.0, 43.0)));
    }

    #[test]
    fn test_malformed_record_skipped() {
        assert!(TerrainLayer::from_record(json!({"id": "x", "name": "No url"})).is_none());
        assert!(TerrainLayer::from_record(json!({"id": null, "name": "n", "url": "u"})).is_none());
    }
}
