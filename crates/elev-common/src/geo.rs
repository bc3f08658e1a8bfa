//! Geographic primitives shared by ingestion and terrain selection.
//!
//! All coordinates are geographic degrees (EPSG:4326) with longitude on the
//! X axis and latitude on the Y axis, matching the `(minX, minY, maxX, maxY)`
//! ordering used on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::BboxError;

/// A camera or query position in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees (X).
    pub lon: f64,
    /// Latitude in degrees (Y).
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lon, self.lat)
    }
}

/// Axis-aligned geographic bounding box.
///
/// A `Bbox` can only be built through [`Bbox::new`] or [`Bbox::from_slice`],
/// so every value holds four finite numbers with `min_x < max_x` and
/// `min_y < max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "Vec<f64>")]
pub struct Bbox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bbox {
    /// Build a validated bounding box from `(min_x, min_y, max_x, max_y)`.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BboxError> {
        for (index, value) in [min_x, min_y, max_x, max_y].into_iter().enumerate() {
            if !value.is_finite() {
                return Err(BboxError::NonFinite { index });
            }
        }
        if min_x >= max_x {
            return Err(BboxError::Inverted {
                axis: "x",
                min: min_x,
                max: max_x,
            });
        }
        if min_y >= max_y {
            return Err(BboxError::Inverted {
                axis: "y",
                min: min_y,
                max: max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Build a bounding box from a slice that must hold exactly four values.
    pub fn from_slice(values: &[f64]) -> Result<Self, BboxError> {
        match values {
            [min_x, min_y, max_x, max_y] => Self::new(*min_x, *min_y, *max_x, *max_y),
            _ => Err(BboxError::WrongLength(values.len())),
        }
    }

    /// Minimum longitude.
    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Minimum latitude.
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    /// Maximum longitude.
    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    /// Maximum latitude.
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    /// Inclusive containment test: points on an edge are inside.
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.min_x <= point.lon
            && point.lon <= self.max_x
            && self.min_y <= point.lat
            && point.lat <= self.max_y
    }

    /// The four values in wire order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Comma-joined form used by multipart form fields.
    pub fn to_csv(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(bbox: Bbox) -> Self {
        bbox.to_array()
    }
}

impl TryFrom<Vec<f64>> for Bbox {
    type Error = BboxError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
