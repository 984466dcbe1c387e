//! Spatial filter: keeps resolved places that fall inside the polygon set.

use rayon::prelude::*;
use tracing::{info, warn};

use super::{DrawnPolygon, PolygonIndex};
use crate::models::{FilteredPlace, ResolvedPlace};

/// Result of filtering a resolved list
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Places inside at least one polygon, in input order
    pub kept: Vec<FilteredPlace>,
    /// Places without coordinates, reported rather than dropped silently
    pub skipped_unresolved: Vec<ResolvedPlace>,
    /// Resolved places outside every polygon
    pub outside: usize,
    /// Polygons rejected as degenerate; they match nothing
    pub degenerate_polygons: usize,
}

enum Membership {
    Inside,
    Outside,
    Unresolved,
}

/// Point-in-polygon filter over a fixed polygon set (union semantics)
pub struct SpatialFilter {
    index: PolygonIndex,
    degenerate: usize,
}

impl SpatialFilter {
    /// Validate the polygons and index the usable ones
    pub fn new(polygons: &[DrawnPolygon]) -> Self {
        let mut valid = Vec::with_capacity(polygons.len());
        let mut degenerate = 0;

        for (id, drawn) in polygons.iter().enumerate() {
            match drawn.validate() {
                Ok(polygon) => valid.push((id, polygon)),
                Err(e) => {
                    warn!("Ignoring filter polygon {}: {}", id, e);
                    degenerate += 1;
                }
            }
        }

        if valid.is_empty() {
            warn!("No usable filter polygon; no place will be kept");
        }

        Self {
            index: PolygonIndex::build(valid),
            degenerate,
        }
    }

    /// Number of polygons used for membership tests
    pub fn polygon_count(&self) -> usize {
        self.index.len()
    }

    /// Split `places` into kept, outside and unresolved. Input order is kept.
    pub fn filter(&self, places: &[ResolvedPlace]) -> FilterOutcome {
        let membership: Vec<Membership> = places
            .par_iter()
            .map(|place| match place.geocode.point() {
                None => Membership::Unresolved,
                Some(point) if self.index.contains(point) => Membership::Inside,
                Some(_) => Membership::Outside,
            })
            .collect();

        let mut outcome = FilterOutcome {
            degenerate_polygons: self.degenerate,
            ..Default::default()
        };

        for (place, m) in places.iter().zip(membership) {
            match m {
                Membership::Inside => {
                    if let Some(filtered) = FilteredPlace::from_resolved(place.clone()) {
                        outcome.kept.push(filtered);
                    }
                }
                Membership::Outside => outcome.outside += 1,
                Membership::Unresolved => outcome.skipped_unresolved.push(place.clone()),
            }
        }

        info!(
            "Filtered {} places against {} polygons down to {} ({} outside, {} unresolved skipped)",
            places.len(),
            self.polygon_count(),
            outcome.kept.len(),
            outcome.outside,
            outcome.skipped_unresolved.len()
        );

        outcome
    }
}

/// Filter `places` by the union of `polygons`
pub fn filter_places(places: &[ResolvedPlace], polygons: &[DrawnPolygon]) -> FilterOutcome {
    SpatialFilter::new(polygons).filter(places)
}
