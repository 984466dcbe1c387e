//! Validated filter polygons and the boundary-inclusive membership test.
//!
//! Vertices come in as `(lat, lon)`; internally geo uses `x = lon, y = lat`.
//! Membership uses geo's `CoordinatePosition`, which classifies a coordinate
//! against every ring with robust orientation predicates, so points on an edge
//! or vertex come back as `OnBoundary` and count as inside. Collinear runs of
//! vertices are harmless for that test; a ring whose vertices all lie on one
//! line covers nothing and is rejected up front. Self-intersecting rings such
//! as a bow-tie are kept, their net signed area can be zero while their lobes
//! still cover ground.

use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::kernels::{Kernel, Orientation, RobustKernel};
use geo::{BoundingRect, Coord, LineString, Polygon};
use hashbrown::HashSet;

use crate::error::PolygonError;
use crate::models::GeoPoint;

/// A polygon that passed validation and can answer membership queries
#[derive(Debug, Clone)]
pub struct FilterPolygon {
    polygon: Polygon<f64>,
}

impl FilterPolygon {
    /// Build from an exterior ring of `(lat, lon)` vertices
    pub fn from_vertices(exterior: &[(f64, f64)]) -> Result<Self, PolygonError> {
        Self::with_holes(exterior, &[])
    }

    /// Build from an exterior ring plus interior rings (holes).
    ///
    /// Degenerate holes are dropped; a degenerate exterior is an error.
    pub fn with_holes(
        exterior: &[(f64, f64)],
        holes: &[Vec<(f64, f64)>],
    ) -> Result<Self, PolygonError> {
        let exterior = closed_ring(exterior)?;
        if is_collinear(&exterior) {
            return Err(PolygonError::ZeroArea);
        }

        let interiors = holes
            .iter()
            .filter_map(|hole| closed_ring(hole).ok())
            .filter(|ring| !is_collinear(ring))
            .collect();

        Ok(Self {
            polygon: Polygon::new(exterior, interiors),
        })
    }

    /// True if the point lies inside or on the boundary
    pub fn contains_point(&self, point: GeoPoint) -> bool {
        let coord = Coord {
            x: point.lon(),
            y: point.lat(),
        };
        matches!(
            self.polygon.coordinate_position(&coord),
            CoordPos::Inside | CoordPos::OnBoundary
        )
    }

    /// Bounding box as (min_lon, min_lat, max_lon, max_lat)
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.polygon
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }
}

/// Turn `(lat, lon)` vertices into a closed ring.
///
/// Consecutive duplicates and an explicit closing vertex are tolerated; the
/// ring needs at least 3 distinct vertices.
pub fn closed_ring(vertices: &[(f64, f64)]) -> Result<LineString<f64>, PolygonError> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(vertices.len() + 1);

    for &(lat, lon) in vertices {
        if GeoPoint::new(lat, lon).is_none() {
            return Err(PolygonError::InvalidVertex { lat, lon });
        }
        let c = Coord { x: lon, y: lat };
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }

    let distinct = distinct_vertices(&coords);
    if distinct < 3 {
        return Err(PolygonError::TooFewVertices(distinct));
    }

    // Close the ring if needed
    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }

    Ok(LineString::new(coords))
}

/// True if every vertex lies on the line through the first two distinct ones
fn is_collinear(ring: &LineString<f64>) -> bool {
    let Some(&first) = ring.0.first() else {
        return true;
    };
    let Some(&second) = ring.0.iter().find(|c| **c != first) else {
        return true;
    };
    ring.0
        .iter()
        .all(|&c| RobustKernel::orient2d(first, second, c) == Orientation::Collinear)
}

fn distinct_vertices(coords: &[Coord<f64>]) -> usize {
    coords
        .iter()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}
