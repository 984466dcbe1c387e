//! Saved place rows as read from an exported list.

use serde::{Deserialize, Serialize};

use super::MatchedProvider;

/// Geographic point (lat/lon), always within valid ranges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

/// Unchecked wire form of a point
#[derive(Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = String;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lon)
            .ok_or_else(|| format!("coordinates out of range: ({}, {})", raw.lat, raw.lon))
    }
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Well-known-text form, longitude first
    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.lon, self.lat)
    }
}

/// Coordinates already present in the source data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedCoordinates {
    pub point: GeoPoint,
    /// Service the coordinates originally came from
    pub source: MatchedProvider,
}

/// One record of an exported saved-places list.
///
/// Identity is the position in the source list; rows are never mutated once read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedPlaceRow {
    pub title: String,
    /// Free-text address or location description
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<EmbeddedCoordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// User labels from the list, used as category hints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SavedPlaceRow {
    pub fn new(title: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    /// Attach coordinates extracted from the source data
    pub fn with_coordinates(mut self, point: GeoPoint, source: MatchedProvider) -> Self {
        self.coordinates = Some(EmbeddedCoordinates { point, source });
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Text sent to geocoding providers: the location text, else the title
    pub fn query(&self) -> Option<&str> {
        [self.location.trim(), self.title.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_range_checks() {
        assert!(GeoPoint::new(90.0, 180.0).is_some());
        assert!(GeoPoint::new(-90.0, -180.0).is_some());
        assert!(GeoPoint::new(90.1, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_deserialize_checks_range() {
        let p: GeoPoint = serde_json::from_str(r#"{"lat": 48.85, "lon": 2.35}"#).unwrap();
        assert_eq!((p.lat(), p.lon()), (48.85, 2.35));
        assert!(serde_json::from_str::<GeoPoint>(r#"{"lat": -120.0, "lon": 2.35}"#).is_err());
        assert!(serde_json::from_str::<GeoPoint>(r#"{"lat": 95.0, "lon": 500.0}"#).is_err());
    }

    #[test]
    fn test_row_with_invalid_embedded_point_is_rejected() {
        let good = r#"{"title": "Pier", "location": "",
            "coordinates": {"point": {"lat": 37.8, "lon": -122.4}, "source": "google"}}"#;
        let row: SavedPlaceRow = serde_json::from_str(good).unwrap();
        assert_eq!(row.coordinates.unwrap().point.lat(), 37.8);

        let bad = r#"{"title": "Pier", "location": "",
            "coordinates": {"point": {"lat": -120.0, "lon": -122.4}, "source": "google"}}"#;
        assert!(serde_json::from_str::<SavedPlaceRow>(bad).is_err());
    }

    #[test]
    fn test_wkt_is_lon_first() {
        let p = GeoPoint::new(48.85, 2.35).unwrap();
        assert_eq!(p.to_wkt(), "POINT(2.35 48.85)");
    }

    #[test]
    fn test_query_prefers_location() {
        let row = SavedPlaceRow::new("Louvre", "Rue de Rivoli, Paris");
        assert_eq!(row.query(), Some("Rue de Rivoli, Paris"));

        let row = SavedPlaceRow::new("Louvre", "   ");
        assert_eq!(row.query(), Some("Louvre"));

        let row = SavedPlaceRow::new("", "");
        assert_eq!(row.query(), None);
    }
}
