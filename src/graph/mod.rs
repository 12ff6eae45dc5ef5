//! In-memory network graph.
//!
//! Node and link stores plus forward/backward-star adjacency. The
//! forward-star lists hold each node's outgoing link ids in insertion
//! order; downstream assignment tools depend on that ordering being stable
//! across runs, so nothing here ever reorders them.
//!
//! Mutations are fail-fast: duplicate ids and dangling link endpoints are
//! structural violations that abort construction.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};

type AdjList = SmallVec<[LinkId; 4]>;

/// The network graph: typed nodes, classified links, forward-star adjacency,
/// and the connector records appended by synthesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkGraph {
    nodes: HashMap<NodeId, Node>,
    links: HashMap<LinkId, Link>,
    /// node → outgoing link ids, insertion order.
    forward_star: HashMap<NodeId, AdjList>,
    /// node → incoming link ids, insertion order.
    backward_star: HashMap<NodeId, AdjList>,
    /// Synthesized connectors, in creation order.
    connectors: Vec<Connector>,
    /// Dedup keys: one connector per (zone, target node) pair, ever.
    connector_pairs: HashSet<(ZoneId, NodeId)>,
    next_link_id: u64,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateId { what: "node", id: node.id.0 });
        }
        self.forward_star.insert(node.id, AdjList::new());
        self.backward_star.insert(node.id, AdjList::new());
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub fn add_link(&mut self, link: Link) -> Result<()> {
        if self.links.contains_key(&link.id) {
            return Err(Error::DuplicateId { what: "link", id: link.id.0 });
        }
        if !self.nodes.contains_key(&link.from_node) {
            return Err(Error::InvalidReference { link: link.id.0, node: link.from_node.0 });
        }
        if !self.nodes.contains_key(&link.to_node) {
            return Err(Error::InvalidReference { link: link.id.0, node: link.to_node.0 });
        }
        self.next_link_id = self.next_link_id.max(link.id.0 + 1);
        self.forward_star.get_mut(&link.from_node).unwrap().push(link.id);
        self.backward_star.get_mut(&link.to_node).unwrap().push(link.id);
        self.links.insert(link.id, link);
        Ok(())
    }

    /// Next free link id for synthesized links. Monotonic, never reused.
    pub fn next_link_id(&mut self) -> LinkId {
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        id
    }

    /// Record a synthesized connector and insert its link pair.
    ///
    /// Returns `false` without touching the graph when the (zone, node)
    /// pair already has a connector.
    pub fn add_connector(
        &mut self,
        connector: Connector,
        out_link: Link,
        back_link: Link,
    ) -> Result<bool> {
        let key = (connector.zone_id, connector.target_node_id);
        if self.connector_pairs.contains(&key) {
            return Ok(false);
        }
        self.add_link(out_link)?;
        self.add_link(back_link)?;
        self.connector_pairs.insert(key);
        self.connectors.push(connector);
        Ok(true)
    }

    pub fn has_connector_pair(&self, zone: ZoneId, node: NodeId) -> bool {
        self.connector_pairs.contains(&(zone, node))
    }

    /// Drop a set of nodes and every link touching them. Used by the
    /// cleaner only; synthesis never removes anything.
    pub(crate) fn retain_nodes(&mut self, keep: &HashSet<NodeId>) {
        self.nodes.retain(|id, _| keep.contains(id));
        self.links
            .retain(|_, link| keep.contains(&link.from_node) && keep.contains(&link.to_node));
        let links = &self.links;
        self.forward_star.retain(|id, _| keep.contains(id));
        self.backward_star.retain(|id, _| keep.contains(id));
        for adj in self.forward_star.values_mut() {
            adj.retain(|lid| links.contains_key(lid));
        }
        for adj in self.backward_star.values_mut() {
            adj.retain(|lid| links.contains_key(lid));
        }
        // Connector records whose link pair was severed go too, and their
        // (zone, node) keys are released.
        self.connectors
            .retain(|c| links.contains_key(&c.out_link) && links.contains_key(&c.back_link));
        self.connector_pairs =
            self.connectors.iter().map(|c| (c.zone_id, c.target_node_id)).collect();
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Outgoing link ids in insertion order (the forward star).
    pub fn out_links(&self, node: NodeId) -> &[LinkId] {
        self.forward_star.get(&node).map(|adj| adj.as_slice()).unwrap_or(&[])
    }

    /// Incoming link ids in insertion order.
    pub fn in_links(&self, node: NodeId) -> &[LinkId] {
        self.backward_star.get(&node).map(|adj| adj.as_slice()).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    pub fn links_of_class(&self, class: RoadClass) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.road_class == class)
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Direct connector degree of a zone: outgoing Connector-class links
    /// from its centroid node.
    pub fn connector_count(&self, zone: ZoneId) -> usize {
        self.out_links(NodeId(zone.0))
            .iter()
            .filter(|lid| self.links.get(*lid).is_some_and(Link::is_connector))
            .count()
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Check that Physical/Activity, ZoneCentroid, and ExternalZoneCentroid
    /// id spaces are pairwise disjoint. Each node has exactly one kind by
    /// construction, so it suffices that no id appears twice (which
    /// `add_node` already enforces) and that centroid ids were not issued
    /// to infrastructure nodes before attachment.
    pub fn validate_kind_disjointness(&self) -> Result<()> {
        // A single map can't hold two kinds for one id; the invariant can
        // only break if a centroid insert was rejected. Verify every
        // recorded connector still points at a centroid of the right kind.
        for connector in &self.connectors {
            let centroid = NodeId(connector.zone_id.0);
            match self.nodes.get(&centroid).map(|n| n.kind) {
                Some(kind) if kind.is_centroid() => {}
                other => {
                    return Err(Error::DuplicateId {
                        what: match other {
                            Some(_) => "zone centroid (id held by non-centroid node)",
                            None => "zone centroid (missing node)",
                        },
                        id: centroid.0,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn physical(id: u64, x: f64, y: f64) -> Node {
        Node::physical(NodeId(id), Point::new(x, y))
    }

    fn road(id: u64, from: u64, to: u64) -> Link {
        Link::new(
            LinkId(id),
            NodeId(from),
            NodeId(to),
            Polyline::segment(Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
            RoadClass::Local,
            1.0,
        )
    }

    #[test]
    fn test_add_and_get_node() {
        let mut g = NetworkGraph::new();
        g.add_node(physical(1, 0.0, 0.0)).unwrap();

        let node = g.node(NodeId(1)).unwrap();
        assert_eq!(node.kind, NodeKind::Physical);
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut g = NetworkGraph::new();
        g.add_node(physical(1, 0.0, 0.0)).unwrap();

        let err = g.add_node(physical(1, 5.0, 5.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { what: "node", id: 1 }));
    }

    #[test]
    fn test_link_to_missing_node_rejected() {
        let mut g = NetworkGraph::new();
        g.add_node(physical(1, 0.0, 0.0)).unwrap();

        let err = g.add_link(road(10, 1, 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { link: 10, node: 2 }));
    }

    #[test]
    fn test_forward_star_insertion_order() {
        let mut g = NetworkGraph::new();
        for id in 1..=4 {
            g.add_node(physical(id, id as f64, 0.0)).unwrap();
        }
        g.add_link(road(10, 1, 2)).unwrap();
        g.add_link(road(11, 1, 3)).unwrap();
        g.add_link(road(12, 1, 4)).unwrap();

        assert_eq!(g.out_links(NodeId(1)), &[LinkId(10), LinkId(11), LinkId(12)]);
        assert_eq!(g.in_links(NodeId(3)), &[LinkId(11)]);
    }

    #[test]
    fn test_connector_pair_dedup() {
        let mut g = NetworkGraph::new();
        g.add_node(physical(100, 0.0, 0.0)).unwrap();
        g.add_node(Node::new(NodeId(1), Point::new(1.0, 1.0), NodeKind::ZoneCentroid)).unwrap();

        let make = |g: &mut NetworkGraph| {
            let out_id = g.next_link_id();
            let back_id = g.next_link_id();
            let geom = Polyline::segment(Point::new(1.0, 1.0), Point::new(0.0, 0.0));
            let out = Link::new(out_id, NodeId(1), NodeId(100), geom.clone(), RoadClass::Connector, 1.4);
            let back = Link::new(back_id, NodeId(100), NodeId(1), geom, RoadClass::Connector, 1.4);
            let conn = Connector {
                zone_id: ZoneId(1),
                target_node_id: NodeId(100),
                out_link: out_id,
                back_link: back_id,
                distance: 1.4,
                tier: None,
            };
            g.add_connector(conn, out, back)
        };

        assert!(make(&mut g).unwrap());
        assert!(!make(&mut g).unwrap());
        assert_eq!(g.connectors().len(), 1);
        assert_eq!(g.connector_count(ZoneId(1)), 1);
    }

    #[test]
    fn test_retain_nodes_prunes_severed_connectors() {
        let mut g = NetworkGraph::new();
        g.add_node(physical(100, 0.0, 0.0)).unwrap();
        g.add_node(Node::new(NodeId(1), Point::new(1.0, 1.0), NodeKind::ZoneCentroid)).unwrap();

        let out_id = g.next_link_id();
        let back_id = g.next_link_id();
        let geom = Polyline::segment(Point::new(1.0, 1.0), Point::new(0.0, 0.0));
        let out = Link::new(out_id, NodeId(1), NodeId(100), geom.clone(), RoadClass::Connector, 1.4);
        let back = Link::new(back_id, NodeId(100), NodeId(1), geom, RoadClass::Connector, 1.4);
        let conn = Connector {
            zone_id: ZoneId(1),
            target_node_id: NodeId(100),
            out_link: out_id,
            back_link: back_id,
            distance: 1.4,
            tier: None,
        };
        g.add_connector(conn, out, back).unwrap();

        // Discarding the physical target severs the pair; the record and
        // its dedup key must go with it.
        let keep: HashSet<NodeId> = [NodeId(1)].into_iter().collect();
        g.retain_nodes(&keep);

        assert!(g.connectors().is_empty());
        assert!(!g.has_connector_pair(ZoneId(1), NodeId(100)));
        assert_eq!(g.connector_count(ZoneId(1)), 0);
    }

    #[test]
    fn test_next_link_id_skips_imported_ids() {
        let mut g = NetworkGraph::new();
        g.add_node(physical(1, 0.0, 0.0)).unwrap();
        g.add_node(physical(2, 1.0, 0.0)).unwrap();
        g.add_link(road(50, 1, 2)).unwrap();

        assert_eq!(g.next_link_id(), LinkId(51));
    }

    #[test]
    fn test_retain_nodes_prunes_links_and_stars() {
        let mut g = NetworkGraph::new();
        for id in 1..=3 {
            g.add_node(physical(id, id as f64, 0.0)).unwrap();
        }
        g.add_link(road(10, 1, 2)).unwrap();
        g.add_link(road(11, 2, 3)).unwrap();

        let keep: HashSet<NodeId> = [NodeId(1), NodeId(2)].into_iter().collect();
        g.retain_nodes(&keep);

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.link_count(), 1);
        assert_eq!(g.out_links(NodeId(2)), &[] as &[LinkId]);
        assert!(g.node(NodeId(3)).is_none());
    }
}
