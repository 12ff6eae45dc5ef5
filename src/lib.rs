//! # gmns-connect: Zone-to-Network Connection & Connectivity Repair
//!
//! Attaches demand zones to a physical road graph through synthetic
//! "connector" links, then validates and repairs the resulting connectivity.
//!
//! ## Design Principles
//!
//! 1. **Pure core**: no file I/O, no ambient filesystem state; importers
//!    hand in typed records, persistence takes serializable snapshots out
//! 2. **Clean DTOs**: `Node`, `Link`, `Zone`, `Connector` cross all boundaries
//! 3. **Additive synthesis**: connectors are only ever appended, dedup-keyed
//!    by (zone, target node), so repeated passes never regress
//! 4. **Notices, not panics**: per-zone problems travel in an [`Outcome`]
//!    side-channel; only structural graph violations abort an operation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gmns_connect::{build_network, ConnectConfig, NetworkGraph, Zone, ZoneId, Point};
//!
//! # fn example(graph: NetworkGraph) -> gmns_connect::Result<()> {
//! let zones = vec![Zone::new(ZoneId(1), Point::new(0.0, 0.0))];
//! let config = ConnectConfig::default();
//!
//! let outcome = build_network(&zones, graph, &config)?;
//! for notice in &outcome.notices {
//!     eprintln!("{notice}");
//! }
//! let augmented = outcome.value.graph;
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Operation | Module |
//! |-------|-----------|--------|
//! | Prune | [`clean_network`] | `clean` |
//! | Attach | [`build_network`] | `synth` |
//! | Score | [`score_connectivity`] | `analyze` |
//! | Repair | [`enhance_connectors`] | `enhance` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod config;
pub mod graph;
pub mod index;
pub mod synth;
pub mod analyze;
pub mod clean;
pub mod enhance;
pub mod report;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeId, NodeKind,
    Link, LinkId, RoadClass, VolumeDelay,
    Zone, ZoneId, OriginKind,
    Connector, Tier,
    Point, Polyline, DistanceMetric,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use config::{ConnectConfig, TierWeights};
pub use graph::NetworkGraph;
pub use index::SpatialIndexSet;
pub use synth::{build_network, BuildResult, Synthesizer, ZoneOutcome};
pub use analyze::{
    score_connectivity, under_connected_zones, AccessibilityMatrix, ConnectivityScore,
};
pub use clean::{clean_network, CleanResult, DiscardedComponent};
pub use enhance::{enhance_connectors, EnhanceResult, RemediationReport};
pub use report::{Notice, Outcome};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Id collision on insert. Fatal: aborts construction.
    #[error("duplicate {what} id {id}")]
    DuplicateId { what: &'static str, id: u64 },

    /// A link references a node that does not exist. Fatal.
    #[error("link {link} references missing node {node}")]
    InvalidReference { link: u64, node: u64 },

    /// A polyline had fewer than two points.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A zone found zero candidates even under the configured search.
    /// Fatal for that zone's synthesis call; batch operations collect it.
    #[error("zone {zone} has no reachable network candidate")]
    NoReachableNetwork { zone: u64 },

    /// External zone coincident with a physical node (strict mode only;
    /// the default is a [`report::Notice::Overlap`]).
    #[error("external zone {zone} coincides with physical node {node} ({distance} apart)")]
    Overlap { zone: u64, node: u64, distance: f64 },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
