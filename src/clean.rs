//! Network cleaning: keep the largest connected component.
//!
//! The physical graph (Physical + Activity nodes, non-Connector links) is
//! treated as undirected for component purposes. Everything outside the
//! largest component is discarded and reported for audit. Idempotent:
//! cleaning an already-single-component graph changes nothing.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::NetworkGraph;
use crate::model::{NodeId, NodeKind};
use crate::report::Outcome;
use crate::Result;

/// One discarded component, for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardedComponent {
    /// Lowest node id in the component.
    pub representative: NodeId,
    pub node_count: usize,
    pub link_count: usize,
}

/// What [`clean_network`] returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanResult {
    pub graph: NetworkGraph,
    /// Discarded components, ascending representative id.
    pub discarded: Vec<DiscardedComponent>,
}

/// Union-find with path halving.
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n as u32).collect() }
    }

    fn find(&mut self, mut i: u32) -> u32 {
        while self.parent[i as usize] != i {
            self.parent[i as usize] = self.parent[self.parent[i as usize] as usize];
            i = self.parent[i as usize];
        }
        i
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb as usize] = ra;
        }
    }
}

/// Isolate and discard disconnected subgraphs, keeping the component with
/// the most nodes (ties: lowest minimum node id). Zone centroids are never
/// pruned; connectors survive unless their target node is discarded, in
/// which case the connector record and its link pair go with it.
pub fn clean_network(graph: NetworkGraph) -> Result<Outcome<CleanResult>> {
    // Index physical-subgraph nodes densely for union-find, in sorted id
    // order so component labeling is deterministic.
    let mut physical: Vec<NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind, NodeKind::Physical | NodeKind::Activity))
        .map(|n| n.id)
        .collect();
    physical.sort();
    let slot: HashMap<NodeId, u32> =
        physical.iter().enumerate().map(|(i, &id)| (id, i as u32)).collect();

    let mut uf = UnionFind::new(physical.len());
    for link in graph.links().filter(|l| !l.is_connector()) {
        if let (Some(&a), Some(&b)) = (slot.get(&link.from_node), slot.get(&link.to_node)) {
            uf.union(a, b);
        }
    }

    // Group nodes by root. `physical` is sorted, so the first member of
    // each group is the component's minimum id.
    let mut components: HashMap<u32, Vec<NodeId>> = HashMap::new();
    for (i, &id) in physical.iter().enumerate() {
        components.entry(uf.find(i as u32)).or_default().push(id);
    }

    let mut components: Vec<Vec<NodeId>> = components.into_values().collect();
    // Largest first; ties by lowest minimum node id.
    components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    let Some(main) = components.first() else {
        // No physical nodes at all: nothing to clean.
        return Ok(Outcome::new(CleanResult { graph, discarded: Vec::new() }));
    };

    let mut keep: HashSet<NodeId> = main.iter().copied().collect();
    // Non-physical nodes (zone centroids) are not subject to pruning.
    for node in graph.nodes() {
        if node.kind.is_centroid() {
            keep.insert(node.id);
        }
    }

    let mut discarded: Vec<DiscardedComponent> = components[1..]
        .iter()
        .map(|members| {
            let set: HashSet<NodeId> = members.iter().copied().collect();
            let link_count = graph
                .links()
                .filter(|l| set.contains(&l.from_node) && set.contains(&l.to_node))
                .count();
            DiscardedComponent {
                representative: members[0],
                node_count: members.len(),
                link_count,
            }
        })
        .collect();
    discarded.sort_by_key(|c| c.representative);

    let mut graph = graph;
    if !discarded.is_empty() {
        graph.retain_nodes(&keep);
    }
    info!(
        kept = main.len(),
        discarded = discarded.len(),
        "cleaned network"
    );

    Ok(Outcome::new(CleanResult { graph, discarded }))
}

// ============================================================================
// Tests
// ============================================================================
