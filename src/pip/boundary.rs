//! User-drawn filter boundaries and their GeoJSON form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::FilterPolygon;
use crate::error::PolygonError;

/// A closed ring of `(lat, lon)` vertices as supplied by the caller, plus
/// optional holes. The last vertex implicitly connects to the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawnPolygon {
    pub exterior: Vec<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<(f64, f64)>>,
}

impl DrawnPolygon {
    pub fn new(exterior: Vec<(f64, f64)>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Vec<(f64, f64)>) -> Self {
        self.holes.push(hole);
        self
    }

    /// Validate into a polygon usable for membership tests
    pub fn validate(&self) -> Result<FilterPolygon, PolygonError> {
        FilterPolygon::with_holes(&self.exterior, &self.holes)
    }
}

/// Extract filter polygons from GeoJSON.
///
/// Accepts a `Polygon` or `MultiPolygon` geometry, a `Feature` wrapping one,
/// or a `FeatureCollection` of such features. Any other geometry type is an
/// error, since filtering by it has no meaning.
pub fn polygons_from_geojson(value: &Value) -> Result<Vec<DrawnPolygon>, PolygonError> {
    match geojson_type(value)? {
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| PolygonError::Malformed("missing 'features'".into()))?;
            let mut polygons = Vec::new();
            for feature in features {
                polygons.extend(polygons_from_geojson(feature)?);
            }
            Ok(polygons)
        }
        "Feature" => {
            let geometry = value
                .get("geometry")
                .ok_or_else(|| PolygonError::Malformed("feature without geometry".into()))?;
            polygons_from_geojson(geometry)
        }
        "Polygon" => Ok(vec![polygon_from_rings(coordinates(value)?)?]),
        "MultiPolygon" => {
            let parts = coordinates(value)?
                .as_array()
                .ok_or_else(|| PolygonError::Malformed("MultiPolygon coordinates".into()))?;
            parts.iter().map(polygon_from_rings).collect()
        }
        other => Err(PolygonError::UnsupportedGeometry(other.to_string())),
    }
}

fn geojson_type(value: &Value) -> Result<&str, PolygonError> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| PolygonError::Malformed("missing 'type'".into()))
}

fn coordinates(value: &Value) -> Result<&Value, PolygonError> {
    value
        .get("coordinates")
        .ok_or_else(|| PolygonError::Malformed("missing 'coordinates'".into()))
}

/// `[[ [lon, lat], ... ], hole, ...]` to a drawn polygon
fn polygon_from_rings(rings: &Value) -> Result<DrawnPolygon, PolygonError> {
    let rings = rings
        .as_array()
        .ok_or_else(|| PolygonError::Malformed("polygon rings must be an array".into()))?;

    let mut rings = rings.iter().map(ring_from_positions);
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => {
            debug!("GeoJSON polygon without rings");
            Vec::new()
        }
    };
    let holes = rings.collect::<Result<Vec<_>, _>>()?;

    Ok(DrawnPolygon { exterior, holes })
}

fn ring_from_positions(ring: &Value) -> Result<Vec<(f64, f64)>, PolygonError> {
    ring.as_array()
        .ok_or_else(|| PolygonError::Malformed("ring must be an array of positions".into()))?
        .iter()
        .map(|pos| {
            let lon = pos.get(0).and_then(Value::as_f64);
            let lat = pos.get(1).and_then(Value::as_f64);
            match (lat, lon) {
                (Some(lat), Some(lon)) => Ok((lat, lon)),
                _ => Err(PolygonError::Malformed(format!("bad position {}", pos))),
            }
        })
        .collect()
}
