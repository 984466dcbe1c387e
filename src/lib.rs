//! Placesift - geocode, filter and describe exported saved-places lists.
//!
//! Rows from a saved list are resolved to coordinates through a fallback
//! chain of geocoding providers, kept when they fall inside user-drawn
//! polygons, and optionally given generated descriptions before export.

pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod geocode;
pub mod input;
pub mod models;
pub mod pip;
pub mod pipeline;

pub use config::Config;
pub use error::{InputError, PolygonError, ProviderError};
pub use models::{
    EnrichedPlace, FilteredPlace, GeoPoint, GeocodeResult, MatchedProvider, ResolvedPlace,
    SavedPlaceRow,
};
pub use pipeline::{Pipeline, PipelineReport};
