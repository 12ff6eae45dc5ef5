//! Uniform-grid implementations behind [`super::SpatialIndexSet`].

use std::sync::OnceLock;

use hashbrown::{HashMap, HashSet};

use crate::model::{DistanceMetric, LinkId, NodeId, Point, Polyline};

/// Grid cell coordinate.
type Cell = (i64, i64);

/// Cell sizing: aim for a handful of features per cell, never degenerate.
fn cell_size_for(extent: (Point, Point), count: usize) -> f64 {
    let span_x = extent.1.x - extent.0.x;
    let span_y = extent.1.y - extent.0.y;
    let span = span_x.max(span_y);
    if span <= 0.0 || count == 0 {
        return 1.0;
    }
    (span / (count as f64).sqrt().max(1.0)).max(span * 1e-9)
}

fn cell_of(origin: Point, cell_size: f64, p: Point) -> Cell {
    (
        ((p.x - origin.x) / cell_size).floor() as i64,
        ((p.y - origin.y) / cell_size).floor() as i64,
    )
}

/// Radius in length units → half-spans in coordinate units around `p`.
fn coord_spans(metric: DistanceMetric, p: Point, radius: f64) -> (f64, f64) {
    let (ux, uy) = metric.units_per_coord(p);
    (radius / ux.max(f64::MIN_POSITIVE), radius / uy.max(f64::MIN_POSITIVE))
}

// ============================================================================
// NodeIndex
// ============================================================================

/// Point index over nodes. Immutable after build.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    metric: DistanceMetric,
    /// Sorted by node id, so bucket contents and result ordering are
    /// deterministic across runs.
    entries: Vec<(NodeId, Point)>,
    cells: HashMap<Cell, Vec<u32>>,
    origin: Point,
    cell_size: f64,
}

impl NodeIndex {
    pub fn build(mut entries: Vec<(NodeId, Point)>, metric: DistanceMetric) -> Self {
        entries.sort_by_key(|(id, _)| *id);

        let origin = entries.first().map(|(_, p)| *p).unwrap_or(Point::new(0.0, 0.0));
        let extent = entries.iter().fold((origin, origin), |(mut min, mut max), (_, p)| {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            (min, max)
        });
        let cell_size = cell_size_for(extent, entries.len());

        let mut cells: HashMap<Cell, Vec<u32>> = HashMap::new();
        for (i, (_, p)) in entries.iter().enumerate() {
            cells.entry(cell_of(extent.0, cell_size, *p)).or_default().push(i as u32);
        }

        Self { metric, entries, cells, origin: extent.0, cell_size }
    }

    /// Shared empty index for kind filters the graph doesn't have.
    pub fn empty() -> &'static Self {
        static EMPTY: OnceLock<NodeIndex> = OnceLock::new();
        EMPTY.get_or_init(|| NodeIndex::build(Vec::new(), DistanceMetric::Euclidean))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All nodes within `radius`, ordered by (distance, id). `None` radius
    /// ranks the entire index.
    pub fn within_radius(&self, p: Point, radius: Option<f64>) -> Vec<(NodeId, f64)> {
        let mut hits: Vec<(NodeId, f64)> = match radius {
            None => self
                .entries
                .iter()
                .map(|(id, pt)| (*id, self.metric.distance(p, *pt)))
                .collect(),
            Some(radius) => {
                let (sx, sy) = coord_spans(self.metric, p, radius);
                let lo = cell_of(self.origin, self.cell_size, Point::new(p.x - sx, p.y - sy));
                let hi = cell_of(self.origin, self.cell_size, Point::new(p.x + sx, p.y + sy));
                let mut hits = Vec::new();
                for cx in lo.0..=hi.0 {
                    for cy in lo.1..=hi.1 {
                        let Some(bucket) = self.cells.get(&(cx, cy)) else { continue };
                        for &i in bucket {
                            let (id, pt) = self.entries[i as usize];
                            let dist = self.metric.distance(p, pt);
                            if dist <= radius {
                                hits.push((id, dist));
                            }
                        }
                    }
                }
                hits
            }
        };
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
        hits
    }

    /// Single nearest node, tie-broken on lower id. Expanding-ring search;
    /// always terminates (bounded by the populated grid extent).
    pub fn nearest(&self, p: Point) -> Option<(NodeId, f64)> {
        if self.entries.is_empty() {
            return None;
        }

        // Length units per grid cell, conservatively small so the stop
        // condition never cuts off a true nearest in a diagonal cell.
        let (ux, uy) = self.metric.units_per_coord(p);
        let cell_len = self.cell_size * ux.min(uy);

        let center = cell_of(self.origin, self.cell_size, p);
        let max_ring = self
            .cells
            .keys()
            .map(|&(cx, cy)| (cx - center.0).abs().max((cy - center.1).abs()))
            .max()
            .unwrap_or(0);

        let mut best: Option<(NodeId, f64)> = None;
        for ring in 0..=max_ring {
            if let Some((_, best_dist)) = best {
                if (ring - 1).max(0) as f64 * cell_len > best_dist {
                    break;
                }
            }
            // Once the ring perimeter outgrows the populated cell count
            // (queries far outside the extent), scanning every entry is
            // cheaper than walking empty rings.
            if 8 * ring > self.cells.len() as i64 {
                for (id, pt) in &self.entries {
                    let dist = self.metric.distance(p, *pt);
                    let better = match best {
                        None => true,
                        Some((best_id, best_dist)) => {
                            dist < best_dist || (dist == best_dist && *id < best_id)
                        }
                    };
                    if better {
                        best = Some((*id, dist));
                    }
                }
                break;
            }
            for &i in self.ring_buckets(center, ring) {
                let (id, pt) = self.entries[i as usize];
                let dist = self.metric.distance(p, pt);
                let better = match best {
                    None => true,
                    Some((best_id, best_dist)) => {
                        dist < best_dist || (dist == best_dist && id < best_id)
                    }
                };
                if better {
                    best = Some((id, dist));
                }
            }
        }
        best
    }

    /// Indices of all entries in cells at Chebyshev distance `ring` from
    /// `center`, in deterministic cell order.
    fn ring_buckets(&self, center: Cell, ring: i64) -> impl Iterator<Item = &u32> {
        let cells = &self.cells;
        ring_cells(center, ring).flat_map(move |cell| cells.get(&cell).into_iter().flatten())
    }
}

/// Cells at exactly Chebyshev distance `ring` from `center`, row-major.
fn ring_cells(center: Cell, ring: i64) -> impl Iterator<Item = Cell> {
    (-ring..=ring).flat_map(move |dx| {
        (-ring..=ring).filter_map(move |dy| {
            if dx.abs().max(dy.abs()) == ring {
                Some((center.0 + dx, center.1 + dy))
            } else {
                None
            }
        })
    })
}

// ============================================================================
// LinkIndex
// ============================================================================

/// A link candidate returned by a radius query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkHit {
    pub id: LinkId,
    /// Origin node of the link, i.e. the connector target.
    pub from_node: NodeId,
    /// Exact point-to-polyline distance.
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct LinkEntry {
    id: LinkId,
    from_node: NodeId,
    geometry: Polyline,
}

/// Polyline index over links of one road class. Each link is bucketed into
/// every cell its bounding box touches; queries dedup on gather.
#[derive(Debug, Clone)]
pub struct LinkIndex {
    metric: DistanceMetric,
    entries: Vec<LinkEntry>,
    cells: HashMap<Cell, Vec<u32>>,
    origin: Point,
    cell_size: f64,
}

impl LinkIndex {
    pub fn build(links: Vec<(LinkId, NodeId, Polyline)>, metric: DistanceMetric) -> Self {
        let mut entries: Vec<LinkEntry> = links
            .into_iter()
            .map(|(id, from_node, geometry)| LinkEntry { id, from_node, geometry })
            .collect();
        entries.sort_by_key(|e| e.id);

        let origin = entries.first().map(|e| e.geometry.bounds().0).unwrap_or(Point::new(0.0, 0.0));
        let extent = entries.iter().fold((origin, origin), |(mut min, mut max), e| {
            let (lo, hi) = e.geometry.bounds();
            min.x = min.x.min(lo.x);
            min.y = min.y.min(lo.y);
            max.x = max.x.max(hi.x);
            max.y = max.y.max(hi.y);
            (min, max)
        });
        let cell_size = cell_size_for(extent, entries.len());

        let mut cells: HashMap<Cell, Vec<u32>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let (lo, hi) = entry.geometry.bounds();
            let c_lo = cell_of(extent.0, cell_size, lo);
            let c_hi = cell_of(extent.0, cell_size, hi);
            for cx in c_lo.0..=c_hi.0 {
                for cy in c_lo.1..=c_hi.1 {
                    cells.entry((cx, cy)).or_default().push(i as u32);
                }
            }
        }

        Self { metric, entries, cells, origin: extent.0, cell_size }
    }

    pub fn empty() -> &'static Self {
        static EMPTY: OnceLock<LinkIndex> = OnceLock::new();
        EMPTY.get_or_init(|| LinkIndex::build(Vec::new(), DistanceMetric::Euclidean))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All links within `radius` of `p` (point-to-polyline), ordered by
    /// (distance, id). `None` radius ranks the entire index.
    pub fn within_radius(&self, p: Point, radius: Option<f64>) -> Vec<LinkHit> {
        let candidates: Vec<u32> = match radius {
            None => (0..self.entries.len() as u32).collect(),
            Some(radius) => {
                let (sx, sy) = coord_spans(self.metric, p, radius);
                let lo = cell_of(self.origin, self.cell_size, Point::new(p.x - sx, p.y - sy));
                let hi = cell_of(self.origin, self.cell_size, Point::new(p.x + sx, p.y + sy));
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for cx in lo.0..=hi.0 {
                    for cy in lo.1..=hi.1 {
                        let Some(bucket) = self.cells.get(&(cx, cy)) else { continue };
                        for &i in bucket {
                            if seen.insert(i) {
                                out.push(i);
                            }
                        }
                    }
                }
                out
            }
        };

        let mut hits: Vec<LinkHit> = candidates
            .into_iter()
            .map(|i| {
                let entry = &self.entries[i as usize];
                LinkHit {
                    id: entry.id,
                    from_node: entry.from_node,
                    distance: self.metric.distance_to_polyline(p, &entry.geometry),
                }
            })
            .filter(|hit| radius.is_none_or(|r| hit.distance <= r))
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap().then(a.id.cmp(&b.id)));
        hits
    }
}

// ============================================================================
// Tests
// ============================================================================
