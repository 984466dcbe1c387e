//! Pipeline stage records: resolved, filtered and enriched places.

use serde::{Deserialize, Serialize};

use super::place::{GeoPoint, SavedPlaceRow};

/// Service that produced a row's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedProvider {
    Google,
    Nominatim,
    #[serde(rename = "arcgis")]
    ArcGis,
    /// No provider found the place
    None,
}

impl std::fmt::Display for MatchedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedProvider::Google => write!(f, "google"),
            MatchedProvider::Nominatim => write!(f, "nominatim"),
            MatchedProvider::ArcGis => write!(f, "arcgis"),
            MatchedProvider::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for MatchedProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(MatchedProvider::Google),
            "nominatim" | "osm" => Ok(MatchedProvider::Nominatim),
            "arcgis" => Ok(MatchedProvider::ArcGis),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Outcome of geocoding one row.
///
/// Fields are private so that a matched provider always comes with a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    point: Option<GeoPoint>,
    provider: MatchedProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    /// True when the coordinates came from the row itself
    embedded: bool,
}

impl GeocodeResult {
    pub fn embedded(point: GeoPoint, source: MatchedProvider) -> Self {
        Self {
            point: Some(point),
            provider: source,
            confidence: None,
            embedded: true,
        }
    }

    /// A provider match. `provider` must not be `MatchedProvider::None`.
    pub fn found(point: GeoPoint, provider: MatchedProvider, confidence: Option<f64>) -> Self {
        debug_assert!(provider != MatchedProvider::None);
        Self {
            point: Some(point),
            provider,
            confidence,
            embedded: false,
        }
    }

    pub fn not_found() -> Self {
        Self {
            point: None,
            provider: MatchedProvider::None,
            confidence: None,
            embedded: false,
        }
    }

    pub fn point(&self) -> Option<GeoPoint> {
        self.point
    }

    pub fn provider(&self) -> MatchedProvider {
        self.provider
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn is_resolved(&self) -> bool {
        self.point.is_some()
    }
}

/// A saved place with its geocoding outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    /// Position in the source list
    pub index: usize,
    pub row: SavedPlaceRow,
    pub geocode: GeocodeResult,
}

/// A resolved place known to be inside the active polygon set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredPlace {
    pub place: ResolvedPlace,
    pub point: GeoPoint,
}

impl FilteredPlace {
    /// Returns `None` for places without coordinates
    pub fn from_resolved(place: ResolvedPlace) -> Option<Self> {
        let point = place.geocode.point()?;
        Some(Self { place, point })
    }

    pub fn row(&self) -> &SavedPlaceRow {
        &self.place.row
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Generated,
    /// Provider gave no usable answer; original title kept
    Fallback,
}

/// Filtered place with a generated title, description and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPlace {
    pub place: FilteredPlace,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: EnrichmentStatus,
}

impl EnrichedPlace {
    /// Keep the original title with an empty description and category
    pub fn fallback(place: FilteredPlace) -> Self {
        let title = place.row().title.clone();
        Self {
            place,
            title,
            description: String::new(),
            category: String::new(),
            status: EnrichmentStatus::Fallback,
        }
    }

    pub fn point(&self) -> GeoPoint {
        self.place.point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_and_display() {
        for p in [
            MatchedProvider::Google,
            MatchedProvider::Nominatim,
            MatchedProvider::ArcGis,
        ] {
            assert_eq!(p.to_string().parse::<MatchedProvider>().unwrap(), p);
        }
        assert_eq!("OSM".parse::<MatchedProvider>().unwrap(), MatchedProvider::Nominatim);
        assert!("bing".parse::<MatchedProvider>().is_err());
    }

    #[test]
    fn test_not_found_has_no_point() {
        let r = GeocodeResult::not_found();
        assert_eq!(r.provider(), MatchedProvider::None);
        assert!(!r.is_resolved());
    }

    #[test]
    fn test_filtered_requires_point() {
        let unresolved = ResolvedPlace {
            index: 0,
            row: SavedPlaceRow::new("x", "y"),
            geocode: GeocodeResult::not_found(),
        };
        assert!(FilteredPlace::from_resolved(unresolved).is_none());
    }

    #[test]
    fn test_fallback_keeps_title() {
        let point = GeoPoint::new(1.0, 2.0).unwrap();
        let place = FilteredPlace::from_resolved(ResolvedPlace {
            index: 3,
            row: SavedPlaceRow::new("Cafe", "Main St"),
            geocode: GeocodeResult::found(point, MatchedProvider::ArcGis, Some(0.9)),
        })
        .unwrap();
        let enriched = EnrichedPlace::fallback(place);
        assert_eq!(enriched.title, "Cafe");
        assert!(enriched.description.is_empty());
        assert_eq!(enriched.status, EnrichmentStatus::Fallback);
    }
}
