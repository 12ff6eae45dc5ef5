//! # Network Model
//!
//! Clean DTOs that define the transportation network: typed nodes,
//! classified links, demand zones, and synthesized connectors.
//! These types cross every boundary: importer ↔ engine ↔ persistence.
//!
//! Design rule: this module is pure data. No I/O, no state, no indexes.

pub mod node;
pub mod link;
pub mod zone;
pub mod connector;
pub mod geometry;

pub use node::{Node, NodeId, NodeKind};
pub use link::{Link, LinkId, RoadClass, VolumeDelay};
pub use zone::{Zone, ZoneId, OriginKind};
pub use connector::{Connector, Tier};
pub use geometry::{DistanceMetric, Point, Polyline};
