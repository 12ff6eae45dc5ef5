//! Result objects and the non-fatal notice side-channel.
//!
//! Every public operation returns an [`Outcome`]: the primary output plus
//! the notices accumulated while producing it. A call can succeed and still
//! carry notices; callers must inspect them to learn about under-fulfilled
//! remediation, skipped tiers, or unreachable zones.

use serde::{Deserialize, Serialize};

use crate::model::{NodeId, Tier, ZoneId};

/// A non-fatal condition recorded during an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// External zone centroid coincides with a physical node (within the
    /// configured epsilon). Under the default policy the connector is still
    /// created; under `strict_overlap` it was rejected and the zone has no
    /// connector from this pass.
    Overlap { zone: ZoneId, node: NodeId, distance: f64 },

    /// A hierarchy tier had fewer candidates in range than its quota.
    PartialFulfillment { zone: ZoneId, tier: Tier, wanted: usize, found: usize },

    /// A zone found zero candidates under the configured search. Synthesis
    /// for that zone was skipped; other zones were unaffected.
    ZoneUnreachable { zone: ZoneId },

    /// The cooperative time budget ran out between zones; the listed zones
    /// were not processed.
    BudgetExhausted { zones_remaining: Vec<ZoneId> },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Overlap { zone, node, distance } => {
                write!(f, "external zone {zone} coincides with physical node {node} ({distance:.2} apart)")
            }
            Notice::PartialFulfillment { zone, tier, wanted, found } => {
                write!(f, "zone {zone}: {tier} tier fulfilled {found}/{wanted}")
            }
            Notice::ZoneUnreachable { zone } => {
                write!(f, "zone {zone}: no reachable network candidate")
            }
            Notice::BudgetExhausted { zones_remaining } => {
                write!(f, "time budget exhausted with {} zones remaining", zones_remaining.len())
            }
        }
    }
}

/// Primary output plus its notice side-channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub value: T,
    pub notices: Vec<Notice>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self { value, notices: Vec::new() }
    }

    pub fn with_notices(value: T, notices: Vec<Notice>) -> Self {
        Self { value, notices }
    }

    pub fn has_notices(&self) -> bool {
        !self.notices.is_empty()
    }
}
