//! Spatial index over network nodes and links.
//!
//! Uniform-grid buckets keyed by cell coordinate. One point index is kept
//! per node-kind filter and one polyline index per road class, because the
//! engine's queries are always "nearest Physical node" or "nearest Arterial
//! link", never "nearest anything".
//!
//! Candidates are gathered from the cells a query box touches, then refined
//! with the exact metric distance, the same metric the engine reports, so
//! ranking never flips at cell boundaries. Indexes are immutable once
//! built; the parallel synthesis phase reads them concurrently.

mod grid;

pub use grid::{LinkIndex, NodeIndex};

use hashbrown::HashMap;

use crate::graph::NetworkGraph;
use crate::model::{DistanceMetric, NodeKind, RoadClass};

/// All the indexes one synthesis pass needs, built in one sweep.
pub struct SpatialIndexSet {
    metric: DistanceMetric,
    /// Per-kind point indexes.
    by_kind: HashMap<NodeKind, NodeIndex>,
    /// Physical + Activity nodes together: the nearest-first search target.
    loading_targets: NodeIndex,
    /// Per-class polyline indexes for hierarchy-distributed search.
    by_class: HashMap<RoadClass, LinkIndex>,
}

impl SpatialIndexSet {
    /// Index every node and link currently in the graph.
    pub fn build(graph: &NetworkGraph, metric: DistanceMetric) -> Self {
        let mut by_kind: HashMap<NodeKind, Vec<_>> = HashMap::new();
        let mut targets = Vec::new();
        for node in graph.nodes() {
            by_kind.entry(node.kind).or_default().push((node.id, node.point));
            if matches!(node.kind, NodeKind::Physical | NodeKind::Activity) {
                targets.push((node.id, node.point));
            }
        }

        let mut by_class: HashMap<RoadClass, Vec<_>> = HashMap::new();
        for link in graph.links() {
            by_class
                .entry(link.road_class)
                .or_default()
                .push((link.id, link.from_node, link.geometry.clone()));
        }

        Self {
            metric,
            by_kind: by_kind
                .into_iter()
                .map(|(kind, pts)| (kind, NodeIndex::build(pts, metric)))
                .collect(),
            loading_targets: NodeIndex::build(targets, metric),
            by_class: by_class
                .into_iter()
                .map(|(class, links)| (class, LinkIndex::build(links, metric)))
                .collect(),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Point index over nodes of one kind. Empty index if the graph has
    /// none of that kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> &NodeIndex {
        self.by_kind.get(&kind).unwrap_or(NodeIndex::empty())
    }

    /// Point index over Physical + Activity nodes.
    pub fn loading_targets(&self) -> &NodeIndex {
        &self.loading_targets
    }

    /// Polyline index over links of one road class.
    pub fn links_of_class(&self, class: RoadClass) -> &LinkIndex {
        self.by_class.get(&class).unwrap_or(LinkIndex::empty())
    }
}
