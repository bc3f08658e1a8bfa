//! Terrain selection rules.

use elev_common::GeoPoint;
use std::fmt;

use crate::TerrainLayer;

/// Which terrain the viewer should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Follow the camera: first covering layer wins.
    #[default]
    Auto,
    /// Never install a layer; the viewer keeps its own terrain.
    Off,
    /// Pin one layer by id.
    Layer(String),
}

impl SelectionMode {
    /// Parse the persisted form: `"auto"`, `"off"` or a layer id.
    ///
    /// The displayed `"layer:<id>"` form is accepted too. Blank values fall
    /// back to [`SelectionMode::Auto`].
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            SelectionMode::Auto
        } else if value.eq_ignore_ascii_case("off") {
            SelectionMode::Off
        } else {
            let id = value.strip_prefix("layer:").map(str::trim).unwrap_or(value);
            if id.is_empty() {
                SelectionMode::Auto
            } else {
                SelectionMode::Layer(id.to_string())
            }
        }
    }

    /// The persisted form.
    pub fn as_preference(&self) -> &str {
        match self {
            SelectionMode::Auto => "auto",
            SelectionMode::Off => "off",
            SelectionMode::Layer(id) => id,
        }
    }

    /// Pinned layer id, if any.
    pub fn layer_id(&self) -> Option<&str> {
        match self {
            SelectionMode::Layer(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Layer(id) => write!(f, "layer:{id}"),
            other => f.write_str(other.as_preference()),
        }
    }
}

/// Provider URL the viewer should show, or `None` for the viewer's default.
///
/// In [`Auto`](SelectionMode::Auto) mode the first layer, in directory
/// order, whose bounding box contains `position` wins; layers without a
/// bounding box never match. [`Layer`](SelectionMode::Layer) resolves the
/// pinned id regardless of position.
pub fn evaluate<'a>(
    position: Option<GeoPoint>,
    layers: &'a [TerrainLayer],
    mode: &SelectionMode,
) -> Option<&'a str> {
    match mode {
        SelectionMode::Off => None,
        SelectionMode::Layer(id) => layers
            .iter()
            .find(|layer| &layer.id == id)
            .map(|layer| layer.url.as_str()),
        SelectionMode::Auto => {
            let position = position?;
            layers
                .iter()
                .find(|layer| layer.covers(position))
                .map(|layer| layer.url.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elev_common::Bbox;

    fn layer(id: &str, bbox: Option<[f64; 4]>) -> TerrainLayer {
        let bbox = bbox.map(|[a, b, c, d]| Bbox::new(a, b, c, d).unwrap());
        TerrainLayer::new(id, id, format!("https://cdn/{id}"), bbox)
    }

    fn layers() -> Vec<TerrainLayer> {
        vec![
            layer("world", None),
            layer("navarra", Some([-2.5, 42.0, -1.0, 43.5])),
            layer("spain", Some([-9.5, 36.0, 3.5, 44.0])),
        ]
    }

    #[test]
    fn test_auto_first_match_wins() {
        let layers = layers();
        let pamplona = Some(GeoPoint::new(-1.64, 42.81));
        assert_eq!(
            evaluate(pamplona, &layers, &SelectionMode::Auto),
            Some("https://cdn/navarra")
        );

        let madrid = Some(GeoPoint::new(-3.7, 40.4));
        assert_eq!(
            evaluate(madrid, &layers, &SelectionMode::Auto),
            Some("https://cdn/spain")
        );
    }

    #[test]
    fn test_auto_boundary_is_inclusive() {
        let layers = layers();
        let corner = Some(GeoPoint::new(-1.0, 43.5));
        assert_eq!(
            evaluate(corner, &layers, &SelectionMode::Auto),
            Some("https://cdn/navarra")
        );
    }

    #[test]
    fn test_auto_without_match_or_position() {
        let layers = layers();
        let paris = Some(GeoPoint::new(2.35, 48.85));
        assert_eq!(evaluate(paris, &layers, &SelectionMode::Auto), None);
        assert_eq!(evaluate(None, &layers, &SelectionMode::Auto), None);
        assert_eq!(evaluate(paris, &[], &SelectionMode::Auto), None);
    }

    #[test]
    fn test_auto_first_match_ignores_activity_flag() {
        let mut layers = layers();
        layers[1] = layers[1].clone().inactive();
        let pamplona = Some(GeoPoint::new(-1.64, 42.81));
        assert_eq!(
            evaluate(pamplona, &layers, &SelectionMode::Auto),
            Some("https://cdn/navarra")
        );
    }

    #[test]
    fn test_off_always_none() {
        let layers = layers();
        let pamplona = Some(GeoPoint::new(-1.64, 42.81));
        assert_eq!(evaluate(pamplona, &layers, &SelectionMode::Off), None);
    }

    #[test]
    fn test_pinned_layer() {
        let layers = layers();
        let paris = Some(GeoPoint::new(2.35, 48.85));
        assert_eq!(
            evaluate(paris, &layers, &SelectionMode::Layer("world".into())),
            Some("https://cdn/world")
        );
        assert_eq!(
            evaluate(paris, &layers, &SelectionMode::Layer("gone".into())),
            None
        );
    }

    #[test]
    fn test_mode_preference_round_trip() {
        assert_eq!(SelectionMode::parse("auto"), SelectionMode::Auto);
        assert_eq!(SelectionMode::parse("OFF"), SelectionMode::Off);
        assert_eq!(SelectionMode::parse(""), SelectionMode::Auto);
        assert_eq!(
            SelectionMode::parse("5f1c"),
            SelectionMode::Layer("5f1c".into())
        );
        assert_eq!(SelectionMode::Layer("5f1c".into()).as_preference(), "5f1c");
        assert_eq!(SelectionMode::Layer("5f1c".into()).to_string(), "layer:5f1c");
        assert_eq!(
            SelectionMode::parse("layer:5f1c"),
            SelectionMode::Layer("5f1c".into())
        );
        assert_eq!(SelectionMode::parse("layer:"), SelectionMode::Auto);
    }
}
