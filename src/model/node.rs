//! Node in the transportation network.

use serde::{Deserialize, Serialize};
use super::geometry::Point;
use super::link::RoadClass;

/// Opaque node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a node represents. Every node has exactly one kind.
///
/// The id spaces of `ZoneCentroid` / `ExternalZoneCentroid` must never
/// intersect those of `Physical` / `Activity`; the importer guarantees it
/// on handoff and [`crate::NetworkGraph::validate_kind_disjointness`]
/// re-checks it after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Infrastructure node of the base road graph.
    Physical,
    /// Point-of-interest node used as a trip-loading target.
    Activity,
    /// Centroid of an internal demand zone.
    ZoneCentroid,
    /// Centroid of an external (boundary) demand zone.
    ExternalZoneCentroid,
}

impl NodeKind {
    /// Centroid kinds carry zone identity rather than infrastructure.
    pub fn is_centroid(self) -> bool {
        matches!(self, NodeKind::ZoneCentroid | NodeKind::ExternalZoneCentroid)
    }
}

/// A node in the network graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub point: Point,
    pub kind: NodeKind,
    /// Road hierarchy bucket this node feeds, when known (Physical only).
    pub functional_class: Option<RoadClass>,
}

impl Node {
    pub fn new(id: NodeId, point: Point, kind: NodeKind) -> Self {
        Self { id, point, kind, functional_class: None }
    }

    pub fn physical(id: NodeId, point: Point) -> Self {
        Self::new(id, point, NodeKind::Physical)
    }

    pub fn activity(id: NodeId, point: Point) -> Self {
        Self::new(id, point, NodeKind::Activity)
    }

    pub fn with_functional_class(mut self, class: RoadClass) -> Self {
        self.functional_class = Some(class);
        self
    }
}
