//! Connectivity scoring.
//!
//! For each zone: its direct connector degree and the fraction of all
//! zones it can reach. Reachability comes from the external assignment
//! delegate's zone-to-zone matrix when one is supplied; otherwise it is
//! approximated by BFS over the connector + physical link graph.
//!
//! Scores are recomputed on demand and never persisted in the graph.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::NetworkGraph;
use crate::model::{NodeId, Zone, ZoneId};

// ============================================================================
// AccessibilityMatrix
// ============================================================================

/// Zone-to-zone flow/reachability matrix from the assignment delegate.
/// Absent or zero entries mean "not reachable".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessibilityMatrix {
    /// zone → zones it exchanges nonzero flow with (either direction).
    partners: HashMap<ZoneId, HashSet<ZoneId>>,
}

impl AccessibilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: ZoneId, to: ZoneId, flow: f64) {
        if flow != 0.0 && from != to {
            self.partners.entry(from).or_default().insert(to);
            self.partners.entry(to).or_default().insert(from);
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (ZoneId, ZoneId, f64)>) -> Self {
        let mut m = Self::new();
        for (from, to, flow) in entries {
            m.insert(from, to, flow);
        }
        m
    }

    /// Distinct other zones with a nonzero entry involving `zone`.
    pub fn reachable_count(&self, zone: ZoneId) -> usize {
        self.partners.get(&zone).map_or(0, HashSet::len)
    }
}

// ============================================================================
// ConnectivityScore
// ============================================================================

/// Per-zone connectivity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityScore {
    pub zone_id: ZoneId,
    /// Direct connector degree from the graph.
    pub connector_count: usize,
    pub reachable_zone_count: usize,
    /// `reachable_zone_count / total_zone_count`.
    pub accessibility_ratio: f64,
}

impl ConnectivityScore {
    /// Under-connected: reaches too little of the system, or is not
    /// attached at all.
    pub fn is_under_connected(&self, threshold: f64) -> bool {
        self.accessibility_ratio < threshold || self.connector_count == 0
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Score every zone. Deterministic: output follows the input zone order.
pub fn score_connectivity(
    zones: &[Zone],
    graph: &NetworkGraph,
    matrix: Option<&AccessibilityMatrix>,
) -> Vec<ConnectivityScore> {
    let total = zones.len().max(1);
    let scores: Vec<ConnectivityScore> = zones
        .iter()
        .map(|zone| {
            let reachable = match matrix {
                Some(m) => m.reachable_count(zone.id),
                None => reachable_by_bfs(graph, zone.id),
            };
            ConnectivityScore {
                zone_id: zone.id,
                connector_count: graph.connector_count(zone.id),
                reachable_zone_count: reachable,
                accessibility_ratio: reachable as f64 / total as f64,
            }
        })
        .collect();
    info!(zones = zones.len(), matrix = matrix.is_some(), "scored connectivity");
    scores
}

/// Under-connected zone ids in remediation order: ascending accessibility
/// ratio, then ascending zone id.
pub fn under_connected_zones(scores: &[ConnectivityScore], threshold: f64) -> Vec<ZoneId> {
    let mut flagged: Vec<&ConnectivityScore> =
        scores.iter().filter(|s| s.is_under_connected(threshold)).collect();
    flagged.sort_by(|a, b| {
        a.accessibility_ratio
            .partial_cmp(&b.accessibility_ratio)
            .unwrap()
            .then(a.zone_id.cmp(&b.zone_id))
    });
    flagged.into_iter().map(|s| s.zone_id).collect()
}

/// Count other zone centroids reachable from this zone's centroid through
/// the forward-star graph.
fn reachable_by_bfs(graph: &NetworkGraph, zone: ZoneId) -> usize {
    let start = NodeId(zone.0);
    if graph.node(start).is_none() {
        return 0;
    }

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue = std::collections::VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    let mut reached = 0usize;
    while let Some(current) = queue.pop_front() {
        for lid in graph.out_links(current) {
            let Some(link) = graph.link(*lid) else { continue };
            let next = link.to_node;
            if !visited.insert(next) {
                continue;
            }
            if let Some(node) = graph.node(next) {
                if node.kind.is_centroid() {
                    reached += 1;
                }
            }
            queue.push_back(next);
        }
    }
    reached
}

// ============================================================================
// Tests
// ============================================================================
