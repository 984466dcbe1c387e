//! Takeout `Saved Places.json` reader.

use serde_json::Value;
use tracing::{debug, warn};

use super::coordinates_from_map_url;
use crate::error::InputError;
use crate::models::{GeoPoint, MatchedProvider, SavedPlaceRow};

/// Look up the first present string among alternative property paths
fn string_at<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(value, |v, key| v.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// `[lon, lat]` point geometry; Takeout writes `[0, 0]` for unknown positions
fn geometry_point(feature: &Value) -> Option<GeoPoint> {
    let geometry = feature.get("geometry")?;
    if geometry.get("type").and_then(Value::as_str) != Some("Point") {
        return None;
    }
    let coords = geometry.get("coordinates")?.as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    if lat == 0.0 && lon == 0.0 {
        return None;
    }
    GeoPoint::new(lat, lon)
}

/// Older exports nest the position under `Location.Geo Coordinates`
fn legacy_point(properties: &Value) -> Option<GeoPoint> {
    let coords = properties.get("Location")?.get("Geo Coordinates")?;
    let number = |key: &str| {
        coords.get(key).and_then(|v| match v {
            Value::String(s) => s.trim().parse().ok(),
            other => other.as_f64(),
        })
    };
    GeoPoint::new(number("Latitude")?, number("Longitude")?)
}

/// Parse a saved-places feature collection, in file order
pub fn parse_saved_places_geojson(data: &str) -> Result<Vec<SavedPlaceRow>, InputError> {
    let root: Value = serde_json::from_str(data)?;
    let Some(features) = root.get("features").and_then(Value::as_array) else {
        warn!("Saved places file has no features array");
        return Ok(Vec::new());
    };

    let mut rows = Vec::with_capacity(features.len());
    for feature in features {
        let empty = Value::Null;
        let properties = feature.get("properties").unwrap_or(&empty);

        let title = string_at(
            properties,
            &[
                &["location", "name"],
                &["Title"],
                &["Location", "Business Name"],
                &["title"],
            ],
        )
        .unwrap_or_default();
        let address = string_at(
            properties,
            &[&["location", "address"], &["Location", "Address"]],
        )
        .unwrap_or_default();
        let url = string_at(properties, &[&["google_maps_url"], &["Google Maps URL"]]);

        let mut row = SavedPlaceRow::new(title, address);

        let point = geometry_point(feature)
            .or_else(|| legacy_point(properties))
            .or_else(|| url.and_then(coordinates_from_map_url));
        match point {
            Some(point) => row = row.with_coordinates(point, MatchedProvider::Google),
            None => debug!("No usable position for saved place '{}'", title),
        }

        if let Some(url) = url {
            row = row.with_url(url);
        }
        if let Some(comment) = string_at(properties, &[&["Comment"], &["comment"]]) {
            row = row.with_note(comment);
        }

        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVED: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "geometry": {"coordinates": [-73.9855, 40.758], "type": "Point"},
          "properties": {
            "date": "2023-05-01T12:00:00Z",
            "google_maps_url": "http://maps.google.com/?cid=123",
            "location": {"address": "Manhattan, NY 10036", "country_code": "US", "name": "Times Square"}
          },
          "type": "Feature"
        },
        {
          "geometry": {"coordinates": [0, 0], "type": "Point"},
          "properties": {
            "google_maps_url": "http://maps.google.com/?q=Somewhere+Else",
            "Comment": "No location information is available for this saved place"
          },
          "type": "Feature"
        },
        {
          "geometry": {"coordinates": [0, 0], "type": "Point"},
          "properties": {
            "google_maps_url": "https://www.google.com/maps/search/51.5007,-0.1246",
            "location": {"name": "Big Ben"}
          },
          "type": "Feature"
        }
      ]
    }"#;

    #[test]
    fn test_takeout_saved_places() {
        let rows = parse_saved_places_geojson(SAVED).unwrap();
        assert_eq!(rows.len(), 3);

        let times = &rows[0];
        assert_eq!(times.title, "Times Square");
        assert_eq!(times.location, "Manhattan, NY 10036");
        let coords = times.coordinates.unwrap();
        assert_eq!((coords.point.lat(), coords.point.lon()), (40.758, -73.9855));

        let unknown = &rows[1];
        assert!(unknown.coordinates.is_none());
        assert_eq!(unknown.query(), None);
        assert!(unknown.note.is_some());

        let from_url = rows[2].coordinates.unwrap();
        assert_eq!((from_url.point.lat(), from_url.point.lon()), (51.5007, -0.1246));
    }

    #[test]
    fn test_legacy_layout() {
        let data = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [0, 0]},
            "properties": {
                "Title": "Ferry Building",
                "Google Maps URL": "http://maps.google.com/?cid=1",
                "Location": {
                    "Address": "1 Ferry Building, San Francisco",
                    "Geo Coordinates": {"Latitude": "37.7955", "Longitude": "-122.3937"}
                }
            }
        }]}"#;
        let rows = parse_saved_places_geojson(data).unwrap();
        assert_eq!(rows[0].title, "Ferry Building");
        assert_eq!(rows[0].location, "1 Ferry Building, San Francisco");
        let point = rows[0].coordinates.unwrap().point;
        assert_eq!((point.lat(), point.lon()), (37.7955, -122.3937));
    }

    #[test]
    fn test_invalid_json_and_missing_features() {
        assert!(matches!(
            parse_saved_places_geojson("{not json"),
            Err(InputError::Json(_))
        ));
        assert!(parse_saved_places_geojson(r#"{"type": "FeatureCollection"}"#)
            .unwrap()
            .is_empty());
    }
}
