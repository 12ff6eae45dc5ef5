//! Engine configuration.
//!
//! Every policy constant the engine applies (search radius, accessibility
//! threshold, connector counts, tier split) lives here as explicit
//! configuration with documented defaults. There is no ambient state.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::model::{DistanceMetric, Tier};
use crate::{Error, Result};

/// Relative weights for splitting `min_connectors` across the four road
/// hierarchy tiers during enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierWeights {
    pub highway: u32,
    pub arterial: u32,
    pub collector: u32,
    pub local: u32,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self { highway: 3, arterial: 3, collector: 2, local: 2 }
    }
}

impl TierWeights {
    fn weight(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Highway => self.highway,
            Tier::Arterial => self.arterial,
            Tier::Collector => self.collector,
            Tier::Local => self.local,
        }
    }

    /// Scale the weights to quotas summing exactly to `total`, by largest
    /// remainder. Remainder ties go to the higher tier (Highway first), so
    /// the split is deterministic.
    pub fn quotas(&self, total: usize) -> [(Tier, usize); 4] {
        let sum: u32 = Tier::ALL.iter().map(|&t| self.weight(t)).sum();
        if sum == 0 || total == 0 {
            return Tier::ALL.map(|t| (t, 0));
        }

        let mut quotas = [0usize; 4];
        let mut remainders = [0.0f64; 4];
        let mut assigned = 0usize;
        for (i, &tier) in Tier::ALL.iter().enumerate() {
            let exact = total as f64 * self.weight(tier) as f64 / sum as f64;
            quotas[i] = exact.floor() as usize;
            remainders[i] = exact - exact.floor();
            assigned += quotas[i];
        }

        let mut order: Vec<usize> = (0..4).collect();
        order.sort_by(|&a, &b| remainders[b].partial_cmp(&remainders[a]).unwrap().then(a.cmp(&b)));
        for &i in order.iter().take(total - assigned) {
            quotas[i] += 1;
        }

        [
            (Tier::Highway, quotas[0]),
            (Tier::Arterial, quotas[1]),
            (Tier::Collector, quotas[2]),
            (Tier::Local, quotas[3]),
        ]
    }
}

/// Configuration shared by all engine operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Maximum candidate search distance, in the metric's length unit.
    /// `None` = unbounded (always find the system-wide nearest feature).
    pub search_radius: Option<f64>,
    /// Target additional connectors per under-connected zone.
    pub min_connectors: usize,
    /// How `min_connectors` is split across road hierarchy tiers.
    pub tier_weights: TierWeights,
    /// A zone is under-connected when it reaches fewer than this fraction
    /// of all zones.
    pub accessibility_threshold: f64,
    /// External zone / physical node coincidence tolerance. 0.0 = exact
    /// coordinate match only.
    pub overlap_epsilon: f64,
    /// Reject coincident external zones with [`Error::Overlap`] instead of
    /// recording a notice.
    pub strict_overlap: bool,
    pub metric: DistanceMetric,
    /// Cooperative budget for batch synthesis, checked between zones.
    pub time_budget: Option<Duration>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            search_radius: Some(1000.0),
            min_connectors: 6,
            tier_weights: TierWeights::default(),
            accessibility_threshold: 0.10,
            overlap_epsilon: 0.0,
            strict_overlap: false,
            metric: DistanceMetric::Euclidean,
            time_budget: None,
        }
    }
}

impl ConnectConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(r) = self.search_radius {
            if !r.is_finite() || r < 0.0 {
                return Err(Error::InvalidConfig(format!("search_radius must be >= 0, got {r}")));
            }
        }
        if !(0.0..=1.0).contains(&self.accessibility_threshold) {
            return Err(Error::InvalidConfig(format!(
                "accessibility_threshold must be in [0, 1], got {}",
                self.accessibility_threshold
            )));
        }
        if self.overlap_epsilon < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "overlap_epsilon must be >= 0, got {}",
                self.overlap_epsilon
            )));
        }
        Ok(())
    }
}
