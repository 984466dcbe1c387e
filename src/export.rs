//! Output views over the final place sequence.
//!
//! Both views are read-only projections: a GeoJSON feature collection and
//! flat `name, description, category, WKT` rows for map-import tools.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::models::{EnrichedPlace, FilteredPlace, MatchedProvider};

/// GeoJSON FeatureCollection of saved places
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geo_type: String,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Properties {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub matched_provider: MatchedProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub address: String,
}

impl Feature {
    fn new(place: &FilteredPlace, title: &str, description: &str, category: &str) -> Self {
        let row = place.row();
        Self {
            feature_type: "Feature".to_string(),
            geometry: Geometry {
                geo_type: "Point".to_string(),
                coordinates: [place.point.lon(), place.point.lat()],
            },
            properties: Properties {
                title: title.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                location: Location {
                    name: row.title.clone(),
                    address: row.location.clone(),
                },
                google_maps_url: row.url.clone(),
                note: row.note.clone(),
                matched_provider: place.place.geocode.provider(),
            },
        }
    }
}

impl FeatureCollection {
    fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }

    pub fn from_enriched(places: &[EnrichedPlace]) -> Self {
        Self::new(
            places
                .iter()
                .map(|p| Feature::new(&p.place, &p.title, &p.description, &p.category))
                .collect(),
        )
    }

    /// Features for places that were never enriched: original titles, empty text
    pub fn from_filtered(places: &[FilteredPlace]) -> Self {
        Self::new(
            places
                .iter()
                .map(|p| Feature::new(p, &p.row().title, "", ""))
                .collect(),
        )
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One line of the flat export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularRow {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "WKT")]
    pub wkt: String,
}

pub fn tabular_rows(places: &[EnrichedPlace]) -> Vec<TabularRow> {
    places
        .iter()
        .map(|p| TabularRow {
            name: p.title.clone(),
            description: p.description.clone(),
            category: p.category.clone(),
            wkt: p.point().to_wkt(),
        })
        .collect()
}

/// Write the flat export as CSV with a header row
pub fn write_tabular_csv<W: Write>(
    writer: W,
    places: &[EnrichedPlace],
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in tabular_rows(places) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichmentStatus, GeoPoint, GeocodeResult, ResolvedPlace, SavedPlaceRow};

    fn filtered(title: &str, lat: f64, lon: f64) -> FilteredPlace {
        let point = GeoPoint::new(lat, lon).unwrap();
        FilteredPlace::from_resolved(ResolvedPlace {
            index: 0,
            row: SavedPlaceRow::new(title, "Somewhere, Earth")
                .with_url("https://maps.google.com/?cid=42"),
            geocode: GeocodeResult::found(point, MatchedProvider::Nominatim, Some(0.6)),
        })
        .unwrap()
    }

    fn enriched(title: &str, lat: f64, lon: f64) -> EnrichedPlace {
        EnrichedPlace {
            place: filtered(title, lat, lon),
            title: format!("{title}, generated"),
            description: "A place, with a comma.".into(),
            category: "park".into(),
            status: EnrichmentStatus::Generated,
        }
    }

    #[test]
    fn test_feature_collection_layout() {
        let fc = FeatureCollection::from_enriched(&[enriched("Dolores Park", 37.7596, -122.4269)]);
        let value = serde_json::to_value(&fc).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        let feature = &value["features"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"][0], -122.4269);
        assert_eq!(feature["geometry"]["coordinates"][1], 37.7596);
        assert_eq!(feature["properties"]["title"], "Dolores Park, generated");
        assert_eq!(feature["properties"]["location"]["name"], "Dolores Park");
        assert_eq!(feature["properties"]["location"]["address"], "Somewhere, Earth");
        assert_eq!(feature["properties"]["matched_provider"], "nominatim");
        assert!(feature["properties"].get("note").is_none());
    }

    #[test]
    fn test_from_filtered_keeps_original_title() {
        let fc = FeatureCollection::from_filtered(&[filtered("Dolores Park", 37.7596, -122.4269)]);
        assert_eq!(fc.features[0].properties.title, "Dolores Park");
        assert!(fc.features[0].properties.description.is_empty());
        assert!(fc.to_json_pretty().unwrap().contains("\"FeatureCollection\""));
    }

    #[test]
    fn test_tabular_csv() {
        let places = vec![
            enriched("Dolores Park", 37.7596, -122.4269),
            enriched("Twin Peaks", 37.7544, -122.4477),
        ];
        let rows = tabular_rows(&places);
        assert_eq!(rows[1].wkt, "POINT(-122.4477 37.7544)");

        let mut out = Vec::new();
        write_tabular_csv(&mut out, &places).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("name,description,category,WKT"));
        assert_eq!(
            lines.next(),
            Some("\"Dolores Park, generated\",\"A place, with a comma.\",park,POINT(-122.4269 37.7596)")
        );
        assert_eq!(lines.count(), 1);
    }
}
