//! Point-in-Polygon (PIP) filtering of resolved places.
//!
//! Validates user-drawn boundaries and keeps the places that fall inside
//! any of them, using an R-tree spatial index for candidate lookup.

mod boundary;
mod geometry;
mod index;
mod service;

pub use boundary::{polygons_from_geojson, DrawnPolygon};
pub use geometry::{closed_ring, FilterPolygon};
pub use index::PolygonIndex;
pub use service::{filter_places, FilterOutcome, SpatialFilter};
