//! Radius-bounded multi-metric traversal kernel.
//!
//! One Dijkstra driver serves every analysis. Traversal nodes on the axial
//! graph are `(line, crossing, travel direction)` states: the turn cost at a
//! junction is the angle between the arrival travel direction and the
//! departure travel direction, so facing matters and fold-backs cost close
//! to 180°. Passing a junction without turning is free, as is walking along
//! a line.
//!
//! The depth vector carries all five metric accumulations simultaneously;
//! a state is admitted (and expanded) only when the whole vector satisfies
//! the radius mask. The queue is ordered by the analysis' routing metric
//! with ties broken by insertion order. Every ~1024 pops the kernel polls
//! the progress sink and unwinds with `Cancelled` on request.
//!
//! Per-origin label arrays come out of the caller's [`ArenaContext`]; the
//! analyses reset it between origins.

use crate::arena::ArenaContext;
use axial_core::geometry::{angle_between_degrees, perpendicular_foot, Vec2};
use axial_core::{
    DepthVector, DistanceMode, EngineResult, JunctionId, LineId, ProgressSink, RadiusMask,
};
use axial_graph::AxialGraph;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// How often the pop loop polls for cancellation.
pub const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Traversal parameters shared by the axial analyses.
#[derive(Clone, Copy)]
pub struct TraversalConfig<'a> {
    pub mode: DistanceMode,
    pub radius: RadiusMask,
    /// Custom per-line weights for `DistanceMode::Weights`; the cost of a
    /// full line traversal, prorated by the traversed fraction.
    pub line_weights: Option<&'a [f32]>,
    /// Weight per meter applied to point-attachment stubs in weights mode.
    pub weight_per_meter_point_edges: f64,
}

impl Default for TraversalConfig<'_> {
    fn default() -> Self {
        Self {
            mode: DistanceMode::Walking,
            radius: RadiusMask::none(),
            line_weights: None,
            weight_per_meter_point_edges: 0.0,
        }
    }
}

/// Where a traversal starts.
#[derive(Debug, Clone, Copy)]
pub enum OriginSpec {
    Line(LineId),
    Junction(JunctionId),
    /// A position attached to `line` at parameter `t` with a perpendicular
    /// stub of length `offset` (graph points and ad-hoc analysis points).
    PointOn {
        line: LineId,
        t: f64,
        offset: f64,
    },
}

/// A settled traversal state.
#[derive(Debug, Clone, Copy)]
pub struct StateRef {
    pub state: u32,
    pub line: LineId,
    pub junction: JunctionId,
    /// Parameter of the junction along the line.
    pub t: f64,
    /// +1 traveling toward `p1`, -1 toward `p0`.
    pub dir: i8,
    /// True when the state was reached by turning onto its line (seeds and
    /// straight continuations along a line are not entries).
    pub entry: bool,
}

/// Per-settle callback.
pub trait StateVisitor {
    fn on_state(&mut self, st: &StateRef, depth: &DepthVector);
}

impl<F: FnMut(&StateRef, &DepthVector)> StateVisitor for F {
    fn on_state(&mut self, st: &StateRef, depth: &DepthVector) {
        self(st, depth)
    }
}

/// Heap entry ordered by (metric, insertion sequence), smallest first.
struct HeapEntry {
    metric: f64,
    seq: u64,
    state: u32,
    depth: DepthVector,
    entry: bool,
    /// Predecessor state, `u32::MAX` for seeds.
    parent: u32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.metric == other.metric && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap on (metric, seq).
        other
            .metric
            .total_cmp(&self.metric)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Precomputed state space over an axial graph.
pub struct AxialExplorer<'g> {
    pub graph: &'g AxialGraph,
    /// Per line: first crossing-slot index into the state numbering.
    slot_base: Vec<u32>,
    state_count: usize,
    /// Per junction: incident `(line, slot)` pairs.
    junction_slots: Vec<Vec<(LineId, u32)>>,
}

impl<'g> AxialExplorer<'g> {
    pub fn new(graph: &'g AxialGraph) -> Self {
        let mut slot_base = Vec::with_capacity(graph.line_count());
        let mut total = 0u32;
        for i in 0..graph.line_count() {
            slot_base.push(total);
            total += graph.crossings_of(LineId::new(i as u32)).len() as u32;
        }
        let mut junction_slots = vec![Vec::new(); graph.junction_count()];
        for i in 0..graph.line_count() {
            let line = LineId::new(i as u32);
            for (slot, &(_, junction)) in graph.crossings_of(line).iter().enumerate() {
                junction_slots[junction.index()].push((line, slot as u32));
            }
        }
        Self {
            graph,
            slot_base,
            state_count: total as usize * 2,
            junction_slots,
        }
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    #[inline]
    fn state_id(&self, line: LineId, slot: u32, dir: i8) -> u32 {
        (self.slot_base[line.index()] + slot) * 2 + (dir > 0) as u32
    }

    #[inline]
    pub fn decode(&self, state: u32) -> StateRef {
        let dir = if state & 1 == 1 { 1i8 } else { -1 };
        let slot_global = state / 2;
        // Binary search for the owning line.
        let line_idx = match self.slot_base.binary_search(&slot_global) {
            Ok(mut i) => {
                // Lines without crossings share base values; take the last.
                while i + 1 < self.slot_base.len() && self.slot_base[i + 1] == slot_global {
                    i += 1;
                }
                i
            }
            Err(i) => i - 1,
        };
        let line = LineId::new(line_idx as u32);
        let slot = slot_global - self.slot_base[line_idx];
        let (t, junction) = self.graph.crossings_of(line)[slot as usize];
        StateRef {
            state,
            line,
            junction,
            t,
            dir,
            entry: false,
        }
    }

    #[inline]
    fn line_direction(&self, line: LineId) -> Vec2 {
        self.graph.line(line).direction().normalized()
    }

    /// Walking cost of traversing line `line` over `fraction` of its length,
    /// in the configured metric's weight dimension.
    #[inline]
    fn line_weight_cost(&self, cfg: &TraversalConfig, line: LineId, fraction: f64) -> f64 {
        match cfg.line_weights {
            Some(w) => w.get(line.index()).copied().unwrap_or(0.0) as f64 * fraction,
            None => 0.0,
        }
    }

    /// Straight-line distance from the origin position to the nearest point
    /// of a line, cached per origin run.
    fn line_straight(&self, cache: &mut [f64], origin_pos: Vec2, line: LineId) -> f64 {
        let cached = cache[line.index()];
        if !cached.is_nan() {
            return cached;
        }
        let l = self.graph.line(line);
        let (_, _, dist) = perpendicular_foot(origin_pos, l.p0, l.p1);
        cache[line.index()] = dist;
        dist
    }

    /// Origin position used for the straight metric.
    pub fn origin_position(&self, origin: OriginSpec) -> Vec2 {
        match origin {
            OriginSpec::Line(l) => self.graph.line(l).midpoint(),
            OriginSpec::Junction(j) => self.graph.junction(j).position,
            OriginSpec::PointOn { line, t, offset: _ } => {
                // The physical point sits off the line; analyses that need
                // the exact position pass it through `explore` themselves.
                self.graph.line(line).point_at(t)
            }
        }
    }

    /// Seed states for an origin. Walking/weight accumulate along the origin
    /// line; steps and angular start at zero.
    ///
    /// Only the adjacent crossing on each side of the origin position is
    /// seeded; continuation transitions chain to the rest. Seeding every
    /// crossing would enumerate the same physical walk twice and corrupt
    /// shortest-path counts.
    pub(crate) fn seeds(&self, cfg: &TraversalConfig, origin: OriginSpec) -> Vec<(u32, DepthVector)> {
        let mut seeds = Vec::new();
        let mut seed_line = |line: LineId, t_from: f64, base_walk: f64, base_weight: f64| {
            let geom = self.graph.line(line);
            let crossings = self.graph.crossings_of(line);
            let i_plus = crossings.partition_point(|&(t, _)| t < t_from);
            let mut chosen: [Option<(usize, i8)>; 2] = [None, None];
            if i_plus < crossings.len() {
                chosen[0] = Some((i_plus, 1));
            }
            if i_plus > 0 {
                chosen[1] = Some((i_plus - 1, -1));
            }
            for (slot, dir) in chosen.into_iter().flatten() {
                let (t, _) = crossings[slot];
                let fraction = (t - t_from).abs();
                let depth = DepthVector {
                    straight: 0.0,
                    walking: base_walk + fraction * geom.length,
                    steps: 0,
                    angular: 0.0,
                    axmeter: 0.0,
                    weight: base_weight + self.line_weight_cost(cfg, line, fraction),
                };
                seeds.push((self.state_id(line, slot as u32, dir), depth));
            }
        };
        match origin {
            OriginSpec::Line(line) => seed_line(line, 0.5, 0.0, 0.0),
            OriginSpec::PointOn { line, t, offset } => seed_line(
                line,
                t,
                offset,
                offset * cfg.weight_per_meter_point_edges,
            ),
            OriginSpec::Junction(junction) => {
                for &(line, slot) in &self.junction_slots[junction.index()] {
                    let (t, _) = self.graph.crossings_of(line)[slot as usize];
                    // Entering the first line from a junction is free; only
                    // directions with line extent exist.
                    if t < 1.0 - 1e-12 {
                        seeds.push((self.state_id(line, slot, 1), DepthVector::default()));
                    }
                    if t > 1e-12 {
                        seeds.push((self.state_id(line, slot, -1), DepthVector::default()));
                    }
                }
            }
        }
        seeds
    }

    /// Run radius-bounded Dijkstra from `origin`, invoking the visitor once
    /// per admitted state in settle order. Label arrays come out of
    /// `scratch`.
    pub fn explore(
        &self,
        origin: OriginSpec,
        origin_pos: Vec2,
        cfg: &TraversalConfig,
        progress: &dyn ProgressSink,
        scratch: &ArenaContext,
        visitor: &mut dyn StateVisitor,
    ) -> EngineResult<()> {
        self.explore_with_parents(origin, origin_pos, cfg, progress, scratch, visitor, None)
    }

    /// As [`explore`](Self::explore), optionally recording the predecessor
    /// state of each settled state (`u32::MAX` for seeds).
    #[allow(clippy::too_many_arguments)]
    pub fn explore_with_parents(
        &self,
        origin: OriginSpec,
        origin_pos: Vec2,
        cfg: &TraversalConfig,
        progress: &dyn ProgressSink,
        scratch: &ArenaContext,
        visitor: &mut dyn StateVisitor,
        mut parents: Option<&mut Vec<u32>>,
    ) -> EngineResult<()> {
        let mut best = scratch.alloc_vec_filled(self.state_count, f64::INFINITY);
        let mut straight_cache = scratch.alloc_vec_filled(self.graph.line_count(), f64::NAN);
        if let Some(parents) = parents.as_deref_mut() {
            parents.clear();
            parents.resize(self.state_count, u32::MAX);
        }

        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        let mut seq = 0u64;
        for (state, mut depth) in self.seeds(cfg, origin) {
            let st = self.decode(state);
            depth.straight = self.line_straight(&mut straight_cache, origin_pos, st.line);
            if !cfg.radius.admits(&depth) {
                continue;
            }
            heap.push(HeapEntry {
                metric: depth.metric(cfg.mode),
                seq,
                state,
                depth,
                entry: false,
                parent: u32::MAX,
            });
            seq += 1;
        }

        let mut pops = 0u64;
        while let Some(top) = heap.pop() {
            pops += 1;
            if pops % CANCEL_POLL_INTERVAL == 0 {
                axial_core::check_cancel(progress, None, 0.0)?;
            }
            if top.metric >= best[top.state as usize] {
                continue;
            }
            best[top.state as usize] = top.metric;
            if let Some(parents) = parents.as_deref_mut() {
                parents[top.state as usize] = top.parent;
            }
            let mut st = self.decode(top.state);
            st.entry = top.entry;
            visitor.on_state(&st, &top.depth);

            self.relax(
                &st,
                &top.depth,
                cfg,
                origin_pos,
                &mut straight_cache,
                &mut |state, depth, entry| {
                    let metric = depth.metric(cfg.mode);
                    if metric < best[state as usize] {
                        heap.push(HeapEntry {
                            metric,
                            seq,
                            state,
                            depth,
                            entry,
                            parent: top.state,
                        });
                        seq += 1;
                    }
                },
            );
        }
        Ok(())
    }

    /// Enumerate admitted transitions out of a settled state.
    pub(crate) fn relax(
        &self,
        st: &StateRef,
        depth: &DepthVector,
        cfg: &TraversalConfig,
        origin_pos: Vec2,
        straight_cache: &mut [f64],
        push: &mut dyn FnMut(u32, DepthVector, bool),
    ) {
        let geom = self.graph.line(st.line);
        let crossings = self.graph.crossings_of(st.line);
        let slot = (st.state / 2 - self.slot_base[st.line.index()]) as i64;

        // 1. Continue along the line to the adjacent crossing in the travel
        // direction; passing a junction costs nothing.
        let next_slot = slot + st.dir as i64;
        if next_slot >= 0 && (next_slot as usize) < crossings.len() {
            let (t_next, _) = crossings[next_slot as usize];
            let d_len = (t_next - st.t).abs() * geom.length;
            let mut next = *depth;
            next.walking += d_len;
            next.axmeter += depth.steps as f64 * d_len;
            next.weight += self.line_weight_cost(cfg, st.line, (t_next - st.t).abs());
            if cfg.radius.admits(&next) {
                push(
                    self.state_id(st.line, next_slot as u32, st.dir),
                    next,
                    false,
                );
            }
        }

        // 2. Turn onto the other lines at this junction.
        let arrive = self.line_direction(st.line).scale(st.dir as f64);
        for &(other, other_slot) in &self.junction_slots[st.junction.index()] {
            if other == st.line {
                continue;
            }
            let (t_other, _) = self.graph.crossings_of(other)[other_slot as usize];
            let other_dir = self.line_direction(other);
            for dir in [1i8, -1] {
                // Only directions with line extent ahead exist.
                if dir > 0 && t_other >= 1.0 - 1e-12 {
                    continue;
                }
                if dir < 0 && t_other <= 1e-12 {
                    continue;
                }
                let depart = other_dir.scale(dir as f64);
                let turn = angle_between_degrees(arrive, depart);
                let mut next = *depth;
                next.steps += 1;
                next.angular += turn;
                next.straight = self.line_straight(straight_cache, origin_pos, other);
                if cfg.radius.admits(&next) {
                    push(self.state_id(other, other_slot, dir), next, true);
                }
            }
        }
    }

    /// Score a line from one of its settled states: walking runs on to the
    /// line midpoint, which must lie in the travel direction.
    pub fn line_score(
        &self,
        st: &StateRef,
        depth: &DepthVector,
        cfg: &TraversalConfig,
    ) -> Option<DepthVector> {
        self.along_line_score(st, depth, cfg, 0.5, 0.0)
    }

    /// Score a position on the state's line at parameter `t_target` with a
    /// perpendicular stub of `offset` (attraction feet, graph points).
    pub fn along_line_score(
        &self,
        st: &StateRef,
        depth: &DepthVector,
        cfg: &TraversalConfig,
        t_target: f64,
        offset: f64,
    ) -> Option<DepthVector> {
        let delta = t_target - st.t;
        if (delta > 1e-9 && st.dir < 0) || (delta < -1e-9 && st.dir > 0) {
            return None;
        }
        let geom = self.graph.line(st.line);
        let d_len = delta.abs() * geom.length;
        let mut score = *depth;
        score.walking += d_len + offset;
        score.axmeter += depth.steps as f64 * d_len;
        score.weight += self.line_weight_cost(cfg, st.line, delta.abs())
            + offset * cfg.weight_per_meter_point_edges;
        Some(score)
    }
}


/// Quantize a turn angle: below the threshold it costs nothing, otherwise it
/// is rounded to the precision bin.
#[inline]
pub fn effective_angle(angle_degrees: f64, threshold: f64, precision: f64) -> f64 {
    if angle_degrees <= threshold {
        return 0.0;
    }
    if precision > 0.0 {
        (angle_degrees / precision).round() * precision
    } else {
        angle_degrees
    }
}

/// Parameters for segment-graph traversals.
#[derive(Debug, Clone, Copy)]
pub struct SegmentConfig {
    pub mode: DistanceMode,
    pub radius: RadiusMask,
    /// Turns at or below this many degrees cost nothing.
    pub angle_threshold: f64,
    /// Angle quantization bin in degrees (0 disables quantization).
    pub angle_precision: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            mode: DistanceMode::Angular,
            radius: RadiusMask::none(),
            angle_threshold: 0.0,
            angle_precision: 1.0,
        }
    }
}

/// Result arrays of one single-source segment search, reusable across
/// origins.
#[derive(Debug, Default)]
pub struct SegmentSearch {
    pub reached: Vec<bool>,
    pub settled: Vec<bool>,
    pub depth: Vec<DepthVector>,
    pub metric: Vec<f64>,
    /// Settle order (segment indices).
    pub order: Vec<u32>,
    /// Shortest-path counts (Brandes).
    pub sigma: Vec<f64>,
    /// Predecessors on shortest paths (Brandes).
    pub preds: Vec<Vec<u32>>,
    /// First-found tree parent, `u32::MAX` at the source.
    pub parent: Vec<u32>,
}

impl SegmentSearch {
    fn reset(&mut self, n: usize) {
        self.reached.clear();
        self.reached.resize(n, false);
        self.settled.clear();
        self.settled.resize(n, false);
        self.depth.clear();
        self.depth.resize(n, DepthVector::default());
        self.metric.clear();
        self.metric.resize(n, f64::INFINITY);
        self.order.clear();
        self.sigma.clear();
        self.sigma.resize(n, 0.0);
        for p in &mut self.preds {
            p.clear();
        }
        self.preds.resize(n, Vec::new());
        self.parent.clear();
        self.parent.resize(n, u32::MAX);
    }
}

/// Single-source Dijkstra over a segment graph, tracking everything the
/// centrality analyses need: settle order, path counts, predecessor sets
/// and a first-found routing tree.
///
/// Equal-metric relaxations (within epsilon) extend the predecessor set of
/// a not-yet-settled target; ties in the queue resolve by insertion order.
pub fn segment_search(
    graph: &axial_graph::SegmentGraph,
    source: LineId,
    cfg: &SegmentConfig,
    progress: &dyn ProgressSink,
    out: &mut SegmentSearch,
) -> EngineResult<()> {
    const TIE_EPS: f64 = 1e-9;
    let n = graph.segment_count();
    out.reset(n);

    let origin_pos = graph.segment(source).midpoint();
    let straight_of = |seg: LineId| -> f64 {
        let s = graph.segment(seg);
        perpendicular_foot(origin_pos, s.p0, s.p1).2
    };

    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut seq = 0u64;
    let source_depth = DepthVector::default();
    if !cfg.radius.admits(&source_depth) {
        return Ok(());
    }
    out.metric[source.index()] = 0.0;
    out.sigma[source.index()] = 1.0;
    out.depth[source.index()] = source_depth;
    out.reached[source.index()] = true;
    heap.push(HeapEntry {
        metric: 0.0,
        seq,
        state: source.value(),
        depth: source_depth,
        entry: false,
        parent: u32::MAX,
    });
    seq += 1;

    let mut pops = 0u64;
    while let Some(top) = heap.pop() {
        pops += 1;
        if pops % CANCEL_POLL_INTERVAL == 0 {
            axial_core::check_cancel(progress, None, 0.0)?;
        }
        let u = top.state as usize;
        if out.settled[u] {
            continue;
        }
        out.settled[u] = true;
        out.order.push(top.state);
        let u_depth = out.depth[u];

        for &edge_index in graph.edges_of(LineId::new(top.state)) {
            let edge = graph.edge(edge_index);
            let v = edge.other(LineId::new(top.state));
            let vi = v.index();
            if out.settled[vi] {
                continue;
            }
            let mut next = u_depth;
            next.steps += 1;
            next.walking += edge.walking;
            next.angular +=
                effective_angle(edge.angle_degrees, cfg.angle_threshold, cfg.angle_precision);
            next.axmeter += u_depth.steps as f64 * edge.walking;
            next.straight = straight_of(v);
            if !cfg.radius.admits(&next) {
                continue;
            }
            let metric = next.metric(cfg.mode);
            if metric + TIE_EPS < out.metric[vi] {
                out.metric[vi] = metric;
                out.depth[vi] = next;
                out.reached[vi] = true;
                out.sigma[vi] = out.sigma[u];
                out.preds[vi].clear();
                out.preds[vi].push(top.state);
                out.parent[vi] = top.state;
                heap.push(HeapEntry {
                    metric,
                    seq,
                    state: v.value(),
                    depth: next,
                    entry: true,
                    parent: top.state,
                });
                seq += 1;
            } else if (metric - out.metric[vi]).abs() <= TIE_EPS {
                let through = out.sigma[u];
                out.sigma[vi] += through;
                out.preds[vi].push(top.state);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod segment_tests {
    use super::*;
    use axial_core::NullProgress;
    use axial_graph::SegmentGraph;

    fn chain_segments(n: u32, length: f64) -> SegmentGraph {
        let pts: Vec<Vec2> = (0..=n)
            .map(|i| Vec2::new(i as f64 * length, 0.0))
            .collect();
        let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
        SegmentGraph::build(&pts, &pairs, 1e-3, &NullProgress).unwrap()
    }

    #[test]
    fn test_chain_search_counts() {
        let g = chain_segments(5, 3.0);
        let mut search = SegmentSearch::default();
        let cfg = SegmentConfig::default();
        segment_search(&g, LineId::new(0), &cfg, &NullProgress, &mut search).unwrap();
        assert_eq!(search.reached.iter().filter(|&&r| r).count(), 5);
        // All straight: zero angular depth everywhere.
        assert!(search.depth.iter().all(|d| d.angular.abs() < 1e-9));
        assert_eq!(search.depth[4].steps, 4);
        assert!((search.depth[4].walking - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_square_sigma_split() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(0.0, 3.0),
        ];
        let pairs = [(0u32, 1u32), (1, 2), (2, 3), (3, 0)];
        let g = SegmentGraph::build(&pts, &pairs, 1e-3, &NullProgress).unwrap();
        let mut search = SegmentSearch::default();
        segment_search(
            &g,
            LineId::new(0),
            &SegmentConfig::default(),
            &NullProgress,
            &mut search,
        )
        .unwrap();
        // Opposite side reachable two ways at 180°, both counted.
        assert!((search.depth[2].angular - 180.0).abs() < 1e-9);
        assert_eq!(search.sigma[2], 2.0);
        assert_eq!(search.preds[2].len(), 2);
    }

    #[test]
    fn test_steps_radius() {
        let g = chain_segments(5, 3.0);
        let mut search = SegmentSearch::default();
        let cfg = SegmentConfig {
            mode: DistanceMode::Steps,
            radius: RadiusMask::none().with_steps(1),
            ..Default::default()
        };
        segment_search(&g, LineId::new(2), &cfg, &NullProgress, &mut search).unwrap();
        let reached: Vec<usize> = (0..5).filter(|&i| search.reached[i]).collect();
        assert_eq!(reached, vec![1, 2, 3]);
    }
}
