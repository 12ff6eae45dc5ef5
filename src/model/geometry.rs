//! Geometry primitives and distance math.
//!
//! The engine works in a single coordinate reference: either projected
//! (x/y, Euclidean meters) or geographic (lon/lat degrees, great-circle
//! meters). One [`DistanceMetric`] is used consistently for index queries
//! and reported connector distances, so a candidate ranked nearest by the
//! index is also nearest in the output.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Mean Earth radius in meters (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A coordinate pair. `x`/`y` are projected meters under
/// [`DistanceMetric::Euclidean`], lon/lat degrees under
/// [`DistanceMetric::GreatCircle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which distance function the coordinates call for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Projected planar coordinates; straight-line distance.
    #[default]
    Euclidean,
    /// Geographic lon/lat degrees; haversine distance in meters.
    GreatCircle,
}

impl DistanceMetric {
    /// Distance between two points, in the metric's length unit.
    pub fn distance(self, a: Point, b: Point) -> f64 {
        match self {
            DistanceMetric::Euclidean => ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt(),
            DistanceMetric::GreatCircle => haversine(a, b),
        }
    }

    /// Shortest distance from `p` to any segment of `line`.
    ///
    /// Under `GreatCircle` each segment is evaluated in a local
    /// equirectangular projection centered on the query point: accurate at
    /// connector-search scale (a few km) and cheap enough for index refine.
    pub fn distance_to_polyline(self, p: Point, line: &Polyline) -> f64 {
        let project = |pt: Point| -> Point {
            match self {
                DistanceMetric::Euclidean => pt,
                DistanceMetric::GreatCircle => {
                    let lat0 = p.y.to_radians();
                    Point::new(
                        (pt.x - p.x).to_radians() * lat0.cos() * EARTH_RADIUS_M,
                        (pt.y - p.y).to_radians() * EARTH_RADIUS_M,
                    )
                }
            }
        };
        let origin = project(p);
        line.points()
            .windows(2)
            .map(|seg| point_to_segment(origin, project(seg[0]), project(seg[1])))
            .fold(f64::INFINITY, f64::min)
    }

    /// How many length units one coordinate degree/unit spans, for sizing
    /// grid cells and radius boxes.
    pub(crate) fn units_per_coord(self, around: Point) -> (f64, f64) {
        match self {
            DistanceMetric::Euclidean => (1.0, 1.0),
            DistanceMetric::GreatCircle => {
                let lat = around.y.to_radians();
                let per_deg = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
                (per_deg * lat.cos(), per_deg)
            }
        }
    }
}

fn haversine(a: Point, b: Point) -> f64 {
    let (lat1, lat2) = (a.y.to_radians(), b.y.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.x - a.x).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

fn point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return DistanceMetric::Euclidean.distance(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * dx, a.y + t * dy);
    DistanceMetric::Euclidean.distance(p, closest)
}

/// A link geometry: two or more vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::InvalidGeometry(format!(
                "polyline needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(Self(points))
    }

    /// Straight segment between two endpoints.
    pub fn segment(from: Point, to: Point) -> Self {
        Self(vec![from, to])
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn first(&self) -> Point {
        self.0[0]
    }

    pub fn last(&self) -> Point {
        self.0[self.0.len() - 1]
    }

    /// Axis-aligned bounding box as (min, max) corners.
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = self.0[0];
        let mut max = self.0[0];
        for p in &self.0[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Total length under `metric`.
    pub fn length(&self, metric: DistanceMetric) -> f64 {
        self.0.windows(2).map(|seg| metric.distance(seg[0], seg[1])).sum()
    }
}

/// Ray-crossing point-in-polygon test. The polygon is closed implicitly
/// (last vertex connects back to the first).
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
