// Polygon geometry - coordinates, rings and centroids
use serde::{Deserialize, Serialize};

pub const MIN_POLYGON_POINTS: usize = 3;
pub const MAX_POLYGON_POINTS: usize = 12;

/// Signed areas smaller than this are treated as collinear rings.
const AREA_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite degrees inside latitude [-90, 90] and longitude [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An unclosed ring; the last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Coordinate>,
}

impl Polygon {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn has_valid_point_count(&self) -> bool {
        (MIN_POLYGON_POINTS..=MAX_POLYGON_POINTS).contains(&self.point_count())
    }
}

/// Area-weighted centroid of the ring, computed on planar (lng, lat) pairs.
///
/// Collinear rings (zero signed area) fall back to the vertex mean. Returns
/// `None` only for an empty ring.
pub fn centroid(polygon: &Polygon) -> Option<Coordinate> {
    let points = &polygon.points;
    if points.is_empty() {
        return None;
    }

    // Shoelace sums are taken relative to the first vertex to keep the
    // cross products small for tiny polygons far from the origin.
    let origin = points[0];
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        let (x0, y0) = (current.lng - origin.lng, current.lat - origin.lat);
        let (x1, y1) = (next.lng - origin.lng, next.lat - origin.lat);
        let cross = x0 * y1 - x1 * y0;
        twice_area += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }

    if twice_area.abs() < AREA_EPSILON {
        tracing::debug!(points = points.len(), "Degenerate ring, using vertex mean");
        return Some(vertex_mean(points));
    }

    let factor = 1.0 / (3.0 * twice_area);
    Some(Coordinate::new(
        origin.lat + cy * factor,
        origin.lng + cx * factor,
    ))
}

fn vertex_mean(points: &[Coordinate]) -> Coordinate {
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let lng = points.iter().map(|p| p.lng).sum::<f64>() / n;
    Coordinate::new(lat, lng)
}
