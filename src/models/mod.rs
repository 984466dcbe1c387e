//! Core data models for the saved-places pipeline.

pub mod place;
pub mod resolved;

pub use place::{EmbeddedCoordinates, GeoPoint, SavedPlaceRow};
pub use resolved::{
    EnrichedPlace, EnrichmentStatus, FilteredPlace, GeocodeResult, MatchedProvider, ResolvedPlace,
};
