//! Spatial index for fast filter polygon lookups.

use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::{info, trace};

use super::FilterPolygon;
use crate::models::GeoPoint;

/// Wrapper for R-tree indexing of filter polygons
#[derive(Clone)]
pub struct IndexedPolygon {
    /// Position of the polygon in the caller's list
    pub id: usize,
    pub polygon: Arc<FilterPolygon>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPolygon {
    pub fn new(id: usize, polygon: FilterPolygon) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = polygon.bbox()?;
        Some(Self {
            id,
            polygon: Arc::new(polygon),
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Spatial index over the active polygon set using an R-tree
pub struct PolygonIndex {
    tree: RTree<IndexedPolygon>,
}

impl PolygonIndex {
    /// Build spatial index from validated polygons, keyed by list position
    pub fn build(polygons: Vec<(usize, FilterPolygon)>) -> Self {
        let indexed: Vec<IndexedPolygon> = polygons
            .into_iter()
            .filter_map(|(id, polygon)| IndexedPolygon::new(id, polygon))
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} polygons", tree.size());

        Self { tree }
    }

    /// True if any polygon contains the point
    pub fn contains(&self, point: GeoPoint) -> bool {
        let query_envelope = AABB::from_point([point.lon(), point.lat()]);
        match self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .find(|ip| ip.polygon.contains_point(point))
        {
            Some(ip) => {
                trace!("{} falls in polygon {}", point.to_wkt(), ip.id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
