//! Link (directed edge) in the transportation network.

use serde::{Deserialize, Serialize};
use super::geometry::Polyline;
use super::node::NodeId;

/// Opaque link identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Road hierarchy classification.
///
/// `Connector` is reserved for synthesized zone-attachment links; the
/// importer never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadClass {
    Highway,
    Arterial,
    Collector,
    Local,
    Connector,
}

impl RoadClass {
    /// The four physical classes, highest capacity first.
    pub const HIERARCHY: [RoadClass; 4] = [
        RoadClass::Highway,
        RoadClass::Arterial,
        RoadClass::Collector,
        RoadClass::Local,
    ];
}

/// BPR-style volume-delay attributes, carried through to the external
/// assignment engine unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeDelay {
    pub lanes: u32,
    pub free_speed: f64,
    pub capacity: f64,
    pub alpha: f64,
    pub beta: f64,
    pub plf: f64,
    pub toll: f64,
    /// Free-flow travel time in minutes.
    pub fftt: f64,
}

impl VolumeDelay {
    /// Attributes stamped on every synthesized connector: one generous lane
    /// so the connector never constrains assignment.
    pub fn connector_default(length: f64) -> Self {
        let free_speed = 90.0;
        Self {
            lanes: 1,
            free_speed,
            capacity: 99_999.0,
            alpha: 0.15,
            beta: 4.0,
            plf: 1.0,
            toll: 0.0,
            fftt: (length / free_speed) * 0.06,
        }
    }
}

/// A directed link in the network graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub geometry: Polyline,
    pub road_class: RoadClass,
    pub length: f64,
    pub vdf: Option<VolumeDelay>,
}

impl Link {
    pub fn new(
        id: LinkId,
        from_node: NodeId,
        to_node: NodeId,
        geometry: Polyline,
        road_class: RoadClass,
        length: f64,
    ) -> Self {
        Self { id, from_node, to_node, geometry, road_class, length, vdf: None }
    }

    pub fn with_vdf(mut self, vdf: VolumeDelay) -> Self {
        self.vdf = Some(vdf);
        self
    }

    pub fn is_connector(&self) -> bool {
        self.road_class == RoadClass::Connector
    }
}
