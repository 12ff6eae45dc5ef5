//! Demand zone.

use serde::{Deserialize, Serialize};
use super::geometry::Point;

/// Opaque zone identifier. Doubles as the centroid's node id once the zone
/// is attached, which is why zone and node id spaces must not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u64);

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the zone generates demand inside the study area or at its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OriginKind {
    #[default]
    Internal,
    External,
}

/// A demand-generation area, represented by its centroid. Immutable after
/// creation except for attribute annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub centroid: Point,
    /// Boundary polygon vertices, when the importer has them. Used for
    /// containment matching of activity nodes.
    pub boundary: Option<Vec<Point>>,
    pub origin_kind: OriginKind,
    pub population: Option<f64>,
}

impl Zone {
    pub fn new(id: ZoneId, centroid: Point) -> Self {
        Self { id, centroid, boundary: None, origin_kind: OriginKind::Internal, population: None }
    }

    pub fn external(id: ZoneId, centroid: Point) -> Self {
        Self { origin_kind: OriginKind::External, ..Self::new(id, centroid) }
    }

    pub fn with_boundary(mut self, boundary: Vec<Point>) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Attribute annotation, the one permitted post-creation mutation.
    pub fn annotate_population(&mut self, population: f64) {
        self.population = Some(population);
    }

    pub fn is_external(&self) -> bool {
        self.origin_kind == OriginKind::External
    }
}
