//! Connector synthesis.
//!
//! Turns a zone set plus a physical network into zone-attachment connectors
//! under three policies:
//!
//! - **nearest-first** (initial construction): one connector to the nearest
//!   Physical-or-Activity node within the search radius
//! - **hierarchy-distributed** (enhancement): a quota of connectors per road
//!   class tier, partial fulfillment allowed and reported
//! - **external-zone**: targets restricted to Physical nodes, with
//!   coincidence detection against the physical node set
//!
//! Synthesis is split into a read-only *planning* phase (parallelizable;
//! graph and indexes are not touched) and a sequential *apply* phase that
//! appends to the graph in zone order, so output is deterministic.

use hashbrown::HashSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ConnectConfig;
use crate::graph::NetworkGraph;
use crate::index::SpatialIndexSet;
use crate::model::*;
use crate::model::geometry::point_in_polygon;
use crate::report::{Notice, Outcome};
use crate::{Error, Result};

// ============================================================================
// Outcome records
// ============================================================================

/// Per-zone synthesis outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneOutcome {
    pub zone_id: ZoneId,
    pub connectors_added: usize,
    /// Tiers whose full quota was met (hierarchy-distributed mode only).
    pub tiers_fulfilled: Vec<Tier>,
    /// Tiers that fell short of their quota.
    pub tiers_missing: Vec<Tier>,
}

impl ZoneOutcome {
    fn new(zone_id: ZoneId) -> Self {
        Self { zone_id, connectors_added: 0, tiers_fulfilled: Vec::new(), tiers_missing: Vec::new() }
    }
}

/// What [`build_network`] returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub graph: NetworkGraph,
    /// Activity nodes present in the augmented graph, ascending id.
    pub activity_nodes: Vec<NodeId>,
    pub outcomes: Vec<ZoneOutcome>,
}

/// A connector decided during planning but not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedConnector {
    pub zone_id: ZoneId,
    pub zone_point: Point,
    pub target: NodeId,
    pub target_point: Point,
    pub distance: f64,
    pub tier: Option<Tier>,
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Read-only connector planner over a frozen graph + index set.
pub struct Synthesizer<'a> {
    graph: &'a NetworkGraph,
    index: &'a SpatialIndexSet,
    config: &'a ConnectConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(graph: &'a NetworkGraph, index: &'a SpatialIndexSet, config: &'a ConnectConfig) -> Self {
        Self { graph, index, config }
    }

    /// Nearest-first mode: the single nearest loading target within the
    /// search radius. Distance ties break on lower node id. External zones
    /// only consider Physical nodes and get the coincidence check.
    pub fn plan_nearest(&self, zone: &Zone) -> Result<(PlannedConnector, Vec<Notice>)> {
        let candidates = if zone.is_external() {
            self.index.nodes_of_kind(NodeKind::Physical)
        } else {
            self.index.loading_targets()
        };

        let (target, distance) = match self.config.search_radius {
            None => candidates.nearest(zone.centroid),
            Some(radius) => candidates
                .within_radius(zone.centroid, Some(radius))
                .into_iter()
                .next(),
        }
        .ok_or(Error::NoReachableNetwork { zone: zone.id.0 })?;

        let mut notices = Vec::new();
        if zone.is_external() {
            self.check_overlap(zone, target, distance, &mut notices)?;
        }

        let target_point = self.graph.node(target).map(|n| n.point).unwrap_or(zone.centroid);
        Ok((
            PlannedConnector {
                zone_id: zone.id,
                zone_point: zone.centroid,
                target,
                target_point,
                distance,
                tier: None,
            },
            notices,
        ))
    }

    /// Hierarchy-distributed mode: per-tier quotas from the configured
    /// weights, candidates drawn from that tier's link index and mapped to
    /// each link's from-node. Unfilled tiers are reported, never fatal; a
    /// shortfall against `min_connectors` is topped up from the Local tier.
    pub fn plan_distributed(
        &self,
        zone: &Zone,
    ) -> (Vec<PlannedConnector>, ZoneOutcome, Vec<Notice>) {
        let quotas = self.config.tier_weights.quotas(self.config.min_connectors);
        let centroid_node = NodeId(zone.id.0);

        let mut planned = Vec::new();
        let mut outcome = ZoneOutcome::new(zone.id);
        let mut notices = Vec::new();
        // Local dedup on top of the graph's (zone, node) pair keys.
        let mut picked: HashSet<NodeId> = HashSet::new();
        // Local-tier surplus kept aside for the top-up pass.
        let mut local_surplus: Vec<(NodeId, f64)> = Vec::new();

        for (tier, wanted) in quotas {
            let hits = self
                .index
                .links_of_class(tier.road_class())
                .within_radius(zone.centroid, self.config.search_radius);

            // The link index filters and ranks by point-to-polyline
            // distance, but the connector targets the from-node: a long
            // link can pass near the zone while its from-node sits far
            // outside the radius. Re-check and re-rank by the actual
            // centroid-to-node distance.
            let mut candidates: Vec<(NodeId, f64)> = Vec::new();
            let mut seen: HashSet<NodeId> = HashSet::new();
            for hit in hits {
                if !seen.insert(hit.from_node) {
                    continue;
                }
                let Some(node) = self.graph.node(hit.from_node) else { continue };
                let distance = self.config.metric.distance(zone.centroid, node.point);
                if self.config.search_radius.is_some_and(|r| distance > r) {
                    continue;
                }
                candidates.push((hit.from_node, distance));
            }
            candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));

            let mut found = 0usize;
            for (target, distance) in candidates {
                if target == centroid_node
                    || picked.contains(&target)
                    || self.graph.has_connector_pair(zone.id, target)
                {
                    continue;
                }
                let Some(node) = self.graph.node(target) else { continue };
                if zone.is_external() && node.kind != NodeKind::Physical {
                    continue;
                }
                if node.kind.is_centroid() {
                    continue;
                }

                if found >= wanted {
                    if tier == Tier::Local {
                        local_surplus.push((target, distance));
                    }
                    continue;
                }

                picked.insert(target);
                planned.push(PlannedConnector {
                    zone_id: zone.id,
                    zone_point: zone.centroid,
                    target,
                    target_point: node.point,
                    distance,
                    tier: Some(tier),
                });
                found += 1;
            }

            if wanted > 0 {
                if found == wanted {
                    outcome.tiers_fulfilled.push(tier);
                } else {
                    outcome.tiers_missing.push(tier);
                    notices.push(Notice::PartialFulfillment { zone: zone.id, tier, wanted, found });
                }
            }
        }

        // Top up from Local candidates the quota pass left over.
        for (target, distance) in local_surplus {
            if planned.len() >= self.config.min_connectors {
                break;
            }
            if picked.insert(target) {
                let target_point = self.graph.node(target).map(|n| n.point).unwrap_or(zone.centroid);
                planned.push(PlannedConnector {
                    zone_id: zone.id,
                    zone_point: zone.centroid,
                    target,
                    target_point,
                    distance,
                    tier: Some(Tier::Local),
                });
            }
        }

        outcome.connectors_added = planned.len();
        debug!(zone = zone.id.0, planned = planned.len(), "distributed plan");
        (planned, outcome, notices)
    }

    fn check_overlap(
        &self,
        zone: &Zone,
        node: NodeId,
        distance: f64,
        notices: &mut Vec<Notice>,
    ) -> Result<()> {
        if distance <= self.config.overlap_epsilon {
            if self.config.strict_overlap {
                return Err(Error::Overlap { zone: zone.id.0, node: node.0, distance });
            }
            warn!(zone = zone.id.0, node = node.0, "external zone coincides with physical node");
            notices.push(Notice::Overlap { zone: zone.id, node, distance });
        }
        Ok(())
    }
}

// ============================================================================
// Apply phase
// ============================================================================

/// Insert one centroid node per zone. Id collision with an existing node is
/// a structural violation (the importer must keep the id spaces disjoint).
pub(crate) fn ensure_centroids(graph: &mut NetworkGraph, zones: &[Zone]) -> Result<()> {
    for zone in zones {
        let id = NodeId(zone.id.0);
        match graph.node(id) {
            None => {
                let kind = match zone.origin_kind {
                    OriginKind::Internal => NodeKind::ZoneCentroid,
                    OriginKind::External => NodeKind::ExternalZoneCentroid,
                };
                graph.add_node(Node::new(id, zone.centroid, kind))?;
            }
            Some(existing) if existing.kind.is_centroid() => {}
            Some(_) => return Err(Error::DuplicateId { what: "zone centroid", id: id.0 }),
        }
    }
    Ok(())
}

/// Materialize a planned connector as a bidirectional Connector-class link
/// pair. Returns `false` if the (zone, node) pair was already connected.
pub(crate) fn apply_connector(graph: &mut NetworkGraph, plan: &PlannedConnector) -> Result<bool> {
    let centroid = NodeId(plan.zone_id.0);
    if graph.has_connector_pair(plan.zone_id, plan.target) {
        return Ok(false);
    }

    let out_id = graph.next_link_id();
    let back_id = graph.next_link_id();
    let out_geom = Polyline::segment(plan.zone_point, plan.target_point);
    let back_geom = Polyline::segment(plan.target_point, plan.zone_point);

    let out = Link::new(out_id, centroid, plan.target, out_geom, RoadClass::Connector, plan.distance)
        .with_vdf(VolumeDelay::connector_default(plan.distance));
    let back = Link::new(back_id, plan.target, centroid, back_geom, RoadClass::Connector, plan.distance)
        .with_vdf(VolumeDelay::connector_default(plan.distance));

    graph.add_connector(
        Connector {
            zone_id: plan.zone_id,
            target_node_id: plan.target,
            out_link: out_id,
            back_link: back_id,
            distance: plan.distance,
            tier: plan.tier,
        },
        out,
        back,
    )
}

// ============================================================================
// build_network
// ============================================================================

/// Attach every zone to the network.
///
/// Two passes, mirroring how trip loading works downstream:
///
/// 1. **Activity pass**: each Activity node is connected to its zone, by
///    boundary containment when the zone has a polygon and by nearest
///    internal centroid otherwise. Zones reached this way are done.
/// 2. **Nearest pass**: every remaining zone gets one nearest-first
///    connector (Physical-only for external zones).
///
/// Zones with zero candidates are reported via [`Notice::ZoneUnreachable`]
/// and never abort the batch. With no time budget configured the nearest
/// pass plans in parallel; the apply phase is always sequential in zone
/// order, so the connector set and forward-star ordering are identical
/// across runs.
pub fn build_network(
    zones: &[Zone],
    mut graph: NetworkGraph,
    config: &ConnectConfig,
) -> Result<Outcome<BuildResult>> {
    config.validate()?;
    info!(zones = zones.len(), nodes = graph.node_count(), "building network");

    ensure_centroids(&mut graph, zones)?;
    let index = SpatialIndexSet::build(&graph, config.metric);

    let mut notices = Vec::new();
    let mut outcomes: Vec<ZoneOutcome> = zones.iter().map(|z| ZoneOutcome::new(z.id)).collect();
    let slot: hashbrown::HashMap<ZoneId, usize> =
        zones.iter().enumerate().map(|(i, z)| (z.id, i)).collect();

    // ------------------------------------------------------------------
    // Activity pass
    // ------------------------------------------------------------------
    let mut activity_nodes: Vec<NodeId> =
        graph.nodes_of_kind(NodeKind::Activity).map(|n| n.id).collect();
    activity_nodes.sort();

    let bounded_zones: Vec<&Zone> = {
        let mut v: Vec<&Zone> = zones.iter().filter(|z| z.boundary.is_some()).collect();
        v.sort_by_key(|z| z.id);
        v
    };

    let mut zones_with_activity: HashSet<ZoneId> = HashSet::new();
    let mut activity_plans = Vec::new();
    for &node_id in &activity_nodes {
        let Some(node) = graph.node(node_id) else { continue };
        let point = node.point;

        // Boundary containment wins; fall back to nearest internal centroid.
        let zone_id = bounded_zones
            .iter()
            .find(|z| point_in_polygon(point, z.boundary.as_deref().unwrap_or(&[])))
            .map(|z| z.id)
            .or_else(|| {
                index
                    .nodes_of_kind(NodeKind::ZoneCentroid)
                    .nearest(point)
                    .map(|(centroid, _)| ZoneId(centroid.0))
            });

        let Some(zone_id) = zone_id else { continue };
        let Some(&i) = slot.get(&zone_id) else { continue };
        let zone = &zones[i];
        activity_plans.push(PlannedConnector {
            zone_id,
            zone_point: zone.centroid,
            target: node_id,
            target_point: point,
            distance: config.metric.distance(zone.centroid, point),
            tier: None,
        });
        zones_with_activity.insert(zone_id);
    }
    for plan in &activity_plans {
        if apply_connector(&mut graph, plan)? {
            outcomes[slot[&plan.zone_id]].connectors_added += 1;
        }
    }
    info!(
        activity_nodes = activity_nodes.len(),
        zones_reached = zones_with_activity.len(),
        "activity pass done"
    );

    // ------------------------------------------------------------------
    // Nearest pass for the remaining zones
    // ------------------------------------------------------------------
    let pending: Vec<&Zone> =
        zones.iter().filter(|z| !zones_with_activity.contains(&z.id)).collect();
    let synth = Synthesizer::new(&graph, &index, config);

    let plans: Vec<(ZoneId, Result<(PlannedConnector, Vec<Notice>)>)> =
        if let Some(budget) = config.time_budget {
            // Cooperative budget: sequential planning, checked between zones.
            let start = std::time::Instant::now();
            let mut plans = Vec::with_capacity(pending.len());
            for (i, zone) in pending.iter().enumerate() {
                if start.elapsed() >= budget {
                    notices.push(Notice::BudgetExhausted {
                        zones_remaining: pending[i..].iter().map(|z| z.id).collect(),
                    });
                    break;
                }
                plans.push((zone.id, synth.plan_nearest(zone)));
            }
            plans
        } else {
            pending
                .par_iter()
                .map(|zone| (zone.id, synth.plan_nearest(zone)))
                .collect()
        };

    for (zone_id, plan) in plans {
        match plan {
            Ok((plan, mut zone_notices)) => {
                notices.append(&mut zone_notices);
                if apply_connector(&mut graph, &plan)? {
                    outcomes[slot[&zone_id]].connectors_added += 1;
                }
            }
            Err(Error::NoReachableNetwork { zone }) => {
                warn!(zone, "no reachable network candidate");
                notices.push(Notice::ZoneUnreachable { zone: ZoneId(zone) });
            }
            Err(Error::Overlap { zone, node, distance }) => {
                // Strict mode rejects the connector but must not abort the
                // other zones; the rejection is surfaced as a notice.
                warn!(zone, node, "strict overlap: connector rejected");
                notices.push(Notice::Overlap {
                    zone: ZoneId(zone),
                    node: NodeId(node),
                    distance,
                });
            }
            Err(other) => return Err(other),
        }
    }

    graph.validate_kind_disjointness()?;
    info!(connectors = graph.connectors().len(), "network built");

    Ok(Outcome::with_notices(BuildResult { graph, activity_nodes, outcomes }, notices))
}

// ============================================================================
// Tests
// ============================================================================
