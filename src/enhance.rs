//! Enhancement orchestration.
//!
//! A single Scored → Synthesizing → Reported pass: score every zone,
//! partition out the under-connected ones, run hierarchy-distributed
//! synthesis for each in remediation order, and aggregate a report.
//!
//! Deliberately not a convergence loop: the documented remediation loop is
//! the external caller re-invoking this after re-scoring. Repeated calls
//! are safe: synthesis is additive and (zone, node)-deduped, so a pass can
//! only raise or hold a zone's accessibility ratio, never lower it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyze::{score_connectivity, under_connected_zones, AccessibilityMatrix, ConnectivityScore};
use crate::config::ConnectConfig;
use crate::graph::NetworkGraph;
use crate::index::SpatialIndexSet;
use crate::model::{Zone, ZoneId};
use crate::report::{Notice, Outcome};
use crate::synth::{apply_connector, ensure_centroids, Synthesizer, ZoneOutcome};
use crate::Result;

/// Aggregated result of one enhancement pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationReport {
    pub generated_at: DateTime<Utc>,
    pub zones_scored: usize,
    /// Under-connected zones, in the order they were remediated.
    pub zones_under_connected: Vec<ZoneId>,
    /// Total connectors added across all zones this pass.
    pub connectors_added: usize,
    /// Per-zone outcomes, same order as `zones_under_connected`; a prefix
    /// of it when the time budget ran out.
    pub outcomes: Vec<ZoneOutcome>,
    /// Scores that drove the partition, input zone order (matrix-based
    /// when a delegate matrix is supplied).
    pub pre_scores: Vec<ConnectivityScore>,
    /// BFS-based scores taken before the pass, comparable with
    /// `post_scores` even when the partition used a delegate matrix.
    pub baseline_scores: Vec<ConnectivityScore>,
    /// BFS-based scores after the pass (the delegate matrix only reflects
    /// the new connectors after the next assignment run).
    pub post_scores: Vec<ConnectivityScore>,
}

impl RemediationReport {
    /// Pretty-printed JSON snapshot, for audit logs and downstream tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// What [`enhance_connectors`] returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceResult {
    pub graph: NetworkGraph,
    pub report: RemediationReport,
}

/// Identify under-connected zones and add hierarchy-distributed connectors
/// for each.
pub fn enhance_connectors(
    zones: &[Zone],
    mut graph: NetworkGraph,
    config: &ConnectConfig,
    matrix: Option<&AccessibilityMatrix>,
) -> Result<Outcome<EnhanceResult>> {
    config.validate()?;

    // --- Scored ---------------------------------------------------------
    let pre_scores = score_connectivity(zones, &graph, matrix);
    let baseline_scores = match matrix {
        Some(_) => score_connectivity(zones, &graph, None),
        None => pre_scores.clone(),
    };
    let flagged = under_connected_zones(&pre_scores, config.accessibility_threshold);
    info!(
        zones = zones.len(),
        under_connected = flagged.len(),
        threshold = config.accessibility_threshold,
        "enhancement pass"
    );

    if flagged.is_empty() {
        let report = RemediationReport {
            generated_at: Utc::now(),
            zones_scored: zones.len(),
            zones_under_connected: Vec::new(),
            connectors_added: 0,
            outcomes: Vec::new(),
            post_scores: baseline_scores.clone(),
            baseline_scores,
            pre_scores,
        };
        return Ok(Outcome::new(EnhanceResult { graph, report }));
    }

    // --- Synthesizing -----------------------------------------------------
    ensure_centroids(&mut graph, zones)?;
    let index = SpatialIndexSet::build(&graph, config.metric);

    let by_id: hashbrown::HashMap<ZoneId, &Zone> = zones.iter().map(|z| (z.id, z)).collect();
    let mut notices = Vec::new();
    let mut outcomes = Vec::with_capacity(flagged.len());
    let mut all_planned = Vec::new();
    {
        let synth = Synthesizer::new(&graph, &index, config);
        let start = std::time::Instant::now();
        for (i, zone_id) in flagged.iter().enumerate() {
            if let Some(budget) = config.time_budget {
                if start.elapsed() >= budget {
                    notices.push(Notice::BudgetExhausted {
                        zones_remaining: flagged[i..].to_vec(),
                    });
                    break;
                }
            }
            let Some(zone) = by_id.get(zone_id) else { continue };
            let (planned, outcome, mut zone_notices) = synth.plan_distributed(zone);
            // Zero candidates AND zero existing connectors: the zone is
            // genuinely unreachable, not merely saturated.
            if planned.is_empty() && graph.connector_count(*zone_id) == 0 {
                notices.push(Notice::ZoneUnreachable { zone: *zone_id });
            }
            notices.append(&mut zone_notices);
            outcomes.push(outcome);
            all_planned.push(planned);
        }
    }

    let mut connectors_added = 0usize;
    for (planned, outcome) in all_planned.iter().zip(outcomes.iter_mut()) {
        let mut applied = 0usize;
        for plan in planned {
            if apply_connector(&mut graph, plan)? {
                applied += 1;
            }
        }
        outcome.connectors_added = applied;
        connectors_added += applied;
    }

    graph.validate_kind_disjointness()?;

    // --- Reported ---------------------------------------------------------
    let post_scores = score_connectivity(zones, &graph, None);
    let report = RemediationReport {
        generated_at: Utc::now(),
        zones_scored: zones.len(),
        zones_under_connected: flagged,
        connectors_added,
        outcomes,
        pre_scores,
        baseline_scores,
        post_scores,
    };
    info!(connectors_added, "enhancement pass done");

    Ok(Outcome::with_notices(EnhanceResult { graph, report }, notices))
}

// ============================================================================
// Tests
// ============================================================================
