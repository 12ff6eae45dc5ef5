//! Synthesized connector record.

use serde::{Deserialize, Serialize};
use super::link::{LinkId, RoadClass};
use super::node::NodeId;
use super::zone::ZoneId;

/// Hierarchy bucket a connector was assigned to during enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Highway,
    Arterial,
    Collector,
    Local,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Highway, Tier::Arterial, Tier::Collector, Tier::Local];

    /// The road class whose links feed this tier.
    pub fn road_class(self) -> RoadClass {
        match self {
            Tier::Highway => RoadClass::Highway,
            Tier::Arterial => RoadClass::Arterial,
            Tier::Collector => RoadClass::Collector,
            Tier::Local => RoadClass::Local,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tier::Highway => "highway",
            Tier::Arterial => "arterial",
            Tier::Collector => "collector",
            Tier::Local => "local",
        };
        write!(f, "{name}")
    }
}

/// One zone-to-network attachment. Materialized in the graph as a
/// bidirectional pair of Connector-class links (`out_link` zone→node,
/// `back_link` node→zone); never mutated after creation, only appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub zone_id: ZoneId,
    pub target_node_id: NodeId,
    pub out_link: LinkId,
    pub back_link: LinkId,
    /// Centroid-to-target distance in the configured metric.
    pub distance: f64,
    /// `None` for nearest-first connectors from initial construction.
    pub tier: Option<Tier>,
}
