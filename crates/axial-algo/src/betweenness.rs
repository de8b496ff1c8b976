//! Betweenness analyses.
//!
//! [`segment_betweenness`] runs Brandes' algorithm on the axial graph under
//! a selectable routing metric: a forward pass per source producing
//! shortest-path counts over traversal states, then backward dependency
//! accumulation over the successor DAG. Line-to-line runs count every
//! ordered pair and halve at the end; attraction-point sources replace the
//! line sources and carry their own mass.
//!
//! [`fast_segment_betweenness`] is the tree variant on the segment graph:
//! one shortest-path tree per source, subtree-mass accumulation, no
//! dependency back-propagation. The two are different analyses with
//! different outputs, not a speed knob.

use crate::arena::ArenaContext;
use crate::traversal::{
    segment_search, AxialExplorer, OriginSpec, SegmentConfig, SegmentSearch, TraversalConfig,
    CANCEL_POLL_INTERVAL,
};
use axial_core::geometry::Vec2;
use axial_core::{
    check_cancel, Degrees, DepthVector, DistanceMode, EngineError, EngineResult, LineId,
    ProgressSink, RadiusMask,
};
use axial_graph::{AxialGraph, SegmentGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering};

const TIE_EPS: f64 = 1e-9;

/// Betweenness outputs per line (or per segment for the fast variant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetweennessResult {
    pub betweenness: Vec<f32>,
    pub node_counts: Vec<u32>,
    pub total_depths: Vec<f32>,
}

/// Sources for [`segment_betweenness`].
pub enum BetweennessSources<'a> {
    /// Every line is a source; per-line weights scale pair mass; result is
    /// halved (each unordered pair counted once).
    Lines { weights: Option<&'a [f32]> },
    /// Attraction points replace the line sources; each carries its weight.
    Attractions {
        points: &'a [Vec2],
        weights: Option<&'a [f32]>,
    },
}

/// Forward-pass state labels for the axial Brandes search.
#[derive(Default)]
struct StateSearch {
    metric: Vec<f64>,
    depth: Vec<DepthVector>,
    sigma: Vec<f64>,
    preds: Vec<Vec<u32>>,
    order: Vec<u32>,
    settled: Vec<bool>,
    entry: Vec<bool>,
}

impl StateSearch {
    fn reset(&mut self, n: usize) {
        self.metric.clear();
        self.metric.resize(n, f64::INFINITY);
        self.depth.clear();
        self.depth.resize(n, DepthVector::default());
        self.sigma.clear();
        self.sigma.resize(n, 0.0);
        for p in &mut self.preds {
            p.clear();
        }
        self.preds.resize(n, Vec::new());
        self.order.clear();
        self.settled.clear();
        self.settled.resize(n, false);
        self.entry.clear();
        self.entry.resize(n, false);
    }
}

struct BrandesHeapEntry {
    metric: f64,
    seq: u64,
    state: u32,
    depth: DepthVector,
    entry: bool,
    pred: u32,
}

impl PartialEq for BrandesHeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.metric == other.metric && self.seq == other.seq
    }
}
impl Eq for BrandesHeapEntry {}
impl PartialOrd for BrandesHeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for BrandesHeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .metric
            .total_cmp(&self.metric)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Dijkstra with shortest-path counting over axial traversal states.
fn axial_brandes_search(
    explorer: &AxialExplorer,
    origin: OriginSpec,
    origin_pos: Vec2,
    cfg: &TraversalConfig,
    scratch: &ArenaContext,
    progress: &dyn ProgressSink,
    out: &mut StateSearch,
) -> EngineResult<()> {
    let n = explorer.state_count();
    out.reset(n);

    let mut straight_cache = scratch.alloc_vec_filled(explorer.graph.line_count(), f64::NAN);
    let mut heap: BinaryHeap<BrandesHeapEntry> = BinaryHeap::new();
    let mut seq = 0u64;
    for (state, mut depth) in explorer.seeds(cfg, origin) {
        let st = explorer.decode(state);
        depth.straight = {
            let l = explorer.graph.line(st.line);
            axial_core::geometry::perpendicular_foot(origin_pos, l.p0, l.p1).2
        };
        straight_cache[st.line.index()] = depth.straight;
        if !cfg.radius.admits(&depth) {
            continue;
        }
        let metric = depth.metric(cfg.mode);
        out.metric[state as usize] = metric;
        out.depth[state as usize] = depth;
        out.sigma[state as usize] = 1.0;
        heap.push(BrandesHeapEntry {
            metric,
            seq,
            state,
            depth,
            entry: false,
            pred: u32::MAX,
        });
        seq += 1;
    }

    let mut pops = 0u64;
    while let Some(top) = heap.pop() {
        pops += 1;
        if pops % CANCEL_POLL_INTERVAL == 0 {
            check_cancel(progress, None, 0.0)?;
        }
        let u = top.state as usize;
        if out.settled[u] {
            continue;
        }
        out.settled[u] = true;
        out.entry[u] = top.entry;
        out.order.push(top.state);

        let mut st = explorer.decode(top.state);
        st.entry = top.entry;
        let u_depth = out.depth[u];
        explorer.relax(
            &st,
            &u_depth,
            cfg,
            origin_pos,
            &mut straight_cache,
            &mut |state, depth, entry| {
                let vi = state as usize;
                if out.settled[vi] {
                    return;
                }
                let metric = depth.metric(cfg.mode);
                if metric + TIE_EPS < out.metric[vi] {
                    out.metric[vi] = metric;
                    out.depth[vi] = depth;
                    out.sigma[vi] = out.sigma[u];
                    out.preds[vi].clear();
                    out.preds[vi].push(top.state);
                    heap.push(BrandesHeapEntry {
                        metric,
                        seq,
                        state,
                        depth,
                        entry,
                        pred: top.state,
                    });
                    seq += 1;
                } else if (metric - out.metric[vi]).abs() <= TIE_EPS {
                    let through = out.sigma[u];
                    out.sigma[vi] += through;
                    out.preds[vi].push(top.state);
                }
            },
        );
    }
    Ok(())
}

/// Depth value reported for the chosen metric (angular in 90° units).
fn report_metric(mode: DistanceMode, depth: &DepthVector) -> f64 {
    match mode {
        DistanceMode::Angular => Degrees(depth.angular).quarter_turns(),
        other => depth.metric(other),
    }
}

/// One Brandes source pass: returns per-line betweenness contributions plus
/// `(node_count, total_depth)` for the source.
#[allow(clippy::too_many_arguments)]
fn brandes_pass(
    explorer: &AxialExplorer,
    search: &mut StateSearch,
    origin: OriginSpec,
    origin_pos: Vec2,
    origin_line: Option<LineId>,
    source_mass: f64,
    target_weights: Option<&[f32]>,
    cfg: &TraversalConfig,
    scratch: &ArenaContext,
    progress: &dyn ProgressSink,
    betweenness: &mut [f64],
) -> EngineResult<(u32, f64)> {
    axial_brandes_search(explorer, origin, origin_pos, cfg, scratch, progress, search)?;

    let line_count = explorer.graph.line_count();
    // Best entry metric and entry states per target line. The state lists
    // stay on the heap: bump storage never runs destructors.
    let mut line_best = scratch.alloc_vec_filled(line_count, f64::INFINITY);
    let mut line_states: Vec<Vec<u32>> = vec![Vec::new(); line_count];
    for &state in &search.order {
        if !search.entry[state as usize] {
            continue;
        }
        let st = explorer.decode(state);
        if Some(st.line) == origin_line {
            continue;
        }
        let m = search.metric[state as usize];
        let slot = st.line.index();
        if m + TIE_EPS < line_best[slot] {
            line_best[slot] = m;
            line_states[slot].clear();
            line_states[slot].push(state);
        } else if (m - line_best[slot]).abs() <= TIE_EPS {
            line_states[slot].push(state);
        }
    }

    // Inject pair mass at the best entry states of every target.
    let mut inject = scratch.alloc_vec_filled(explorer.state_count(), 0.0f64);
    let mut node_count = 1u32;
    let mut total_depth = 0.0f64;
    for line in 0..line_count {
        if line_states[line].is_empty() {
            continue;
        }
        let w_t = target_weights
            .and_then(|w| w.get(line))
            .copied()
            .unwrap_or(1.0) as f64;
        node_count += 1;
        let best_state = line_states[line][0] as usize;
        total_depth += report_metric(cfg.mode, &search.depth[best_state]);
        let sigma_total: f64 = line_states[line]
            .iter()
            .map(|&s| search.sigma[s as usize])
            .sum();
        if sigma_total <= 0.0 {
            continue;
        }
        for &s in &line_states[line] {
            inject[s as usize] += source_mass * w_t * search.sigma[s as usize] / sigma_total;
        }
    }

    // Backward dependency accumulation over the successor DAG.
    let mut delta = scratch.alloc_vec_filled(explorer.state_count(), 0.0f64);
    for &state in search.order.iter().rev() {
        let w = state as usize;
        let flow = inject[w] + delta[w];
        if flow != 0.0 {
            let sigma_w = search.sigma[w];
            for &p in &search.preds[w] {
                delta[p as usize] += search.sigma[p as usize] / sigma_w * flow;
            }
        }
        // Flow is credited once per line visit, at the entry state. For
        // point sources the seed states carry the flow along the attached
        // line itself.
        let creditable =
            search.entry[w] || (origin_line.is_none() && search.preds[w].is_empty());
        if creditable && delta[w] != 0.0 {
            let st = explorer.decode(state);
            if Some(st.line) != origin_line {
                betweenness[st.line.index()] += delta[w];
            }
        }
    }
    Ok((node_count, total_depth))
}

/// Brandes betweenness on the axial graph.
pub fn segment_betweenness(
    graph: &AxialGraph,
    mode: DistanceMode,
    radius: RadiusMask,
    sources: BetweennessSources<'_>,
    progress: &dyn ProgressSink,
) -> EngineResult<BetweennessResult> {
    let explorer = AxialExplorer::new(graph);
    let line_count = graph.line_count();
    let done = AtomicUsize::new(0);

    match sources {
        BetweennessSources::Lines { weights } => {
            if let Some(w) = weights {
                if w.len() != line_count {
                    return Err(EngineError::BadInput(format!(
                        "{} line weights for {} lines",
                        w.len(),
                        line_count
                    )));
                }
            }
            let passes: Vec<(Vec<f64>, u32, f64)> = (0..line_count)
                .into_par_iter()
                .map_init(
                    || (StateSearch::default(), ArenaContext::new()),
                    |worker, s| -> EngineResult<(Vec<f64>, u32, f64)> {
                        let (search, scratch) = worker;
                        scratch.reset();
                        let source = LineId::new(s as u32);
                        let cfg = TraversalConfig {
                            mode,
                            radius,
                            ..Default::default()
                        };
                        let origin = OriginSpec::Line(source);
                        let origin_pos = explorer.origin_position(origin);
                        let mass = weights
                            .and_then(|w| w.get(s))
                            .copied()
                            .unwrap_or(1.0) as f64;
                        let mut local = vec![0.0f64; line_count];
                        let (n, td) = brandes_pass(
                            &explorer,
                            search,
                            origin,
                            origin_pos,
                            Some(source),
                            mass,
                            weights,
                            &cfg,
                            scratch,
                            progress,
                            &mut local,
                        )?;
                        let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % 64 == 0 {
                            check_cancel(
                                progress,
                                Some("Betweenness"),
                                count as f32 / line_count as f32,
                            )?;
                        }
                        Ok((local, n, td))
                    },
                )
                .collect::<EngineResult<Vec<_>>>()?;

            let mut betweenness = vec![0.0f64; line_count];
            let mut node_counts = vec![0u32; line_count];
            let mut total_depths = vec![0.0f32; line_count];
            for (s, (local, n, td)) in passes.into_iter().enumerate() {
                for (b, l) in betweenness.iter_mut().zip(local) {
                    *b += l;
                }
                node_counts[s] = n;
                total_depths[s] = td as f32;
            }
            // Ordered pairs were counted twice.
            Ok(BetweennessResult {
                betweenness: betweenness.iter().map(|&b| (b * 0.5) as f32).collect(),
                node_counts,
                total_depths,
            })
        }
        BetweennessSources::Attractions { points, weights } => {
            if let Some(w) = weights {
                if w.len() != points.len() {
                    return Err(EngineError::BadInput(format!(
                        "{} weights for {} attraction points",
                        w.len(),
                        points.len()
                    )));
                }
            }
            let passes: Vec<Vec<f64>> = points
                .par_iter()
                .enumerate()
                .map_init(
                    || (StateSearch::default(), ArenaContext::new()),
                    |worker, (i, &p)| -> EngineResult<Vec<f64>> {
                        let (search, scratch) = worker;
                        scratch.reset();
                        let (line, t, offset) = graph.attach(p).ok_or_else(|| {
                            EngineError::BadInput("attraction point has no line".into())
                        })?;
                        let cfg = TraversalConfig {
                            mode,
                            radius,
                            ..Default::default()
                        };
                        let mass = weights
                            .and_then(|w| w.get(i))
                            .copied()
                            .unwrap_or(1.0) as f64;
                        let mut local = vec![0.0f64; line_count];
                        brandes_pass(
                            &explorer,
                            search,
                            OriginSpec::PointOn { line, t, offset },
                            p,
                            None,
                            mass,
                            None,
                            &cfg,
                            scratch,
                            progress,
                            &mut local,
                        )?;
                        let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % 64 == 0 {
                            check_cancel(
                                progress,
                                Some("Betweenness"),
                                count as f32 / points.len() as f32,
                            )?;
                        }
                        Ok(local)
                    },
                )
                .collect::<EngineResult<Vec<_>>>()?;

            let mut betweenness = vec![0.0f64; line_count];
            for local in passes {
                for (b, l) in betweenness.iter_mut().zip(local) {
                    *b += l;
                }
            }
            Ok(BetweennessResult {
                betweenness: betweenness.iter().map(|&b| b as f32).collect(),
                node_counts: vec![0; line_count],
                total_depths: vec![0.0; line_count],
            })
        }
    }
}

/// Tree-accumulation betweenness on the segment graph.
///
/// Per source: one shortest-path tree (ties resolve to the first-settled
/// route), every target contributes its mass to all tree ancestors. The sum
/// over ordered sources is halved. `total_depth` reports the angular depth
/// accumulated along the routing tree whatever the routing metric.
pub fn fast_segment_betweenness(
    graph: &SegmentGraph,
    mode: DistanceMode,
    weigh_by_length: bool,
    radius: RadiusMask,
    progress: &dyn ProgressSink,
) -> EngineResult<BetweennessResult> {
    if !matches!(
        mode,
        DistanceMode::Steps | DistanceMode::Walking | DistanceMode::Angular
    ) {
        return Err(EngineError::BadInput(
            "fast betweenness supports steps, walking and angular metrics".into(),
        ));
    }
    // Only a walking limit applies to the tree variant; other limits in the
    // mask are ignored.
    let radius = match radius.walking_limit() {
        Some(w) => RadiusMask::none().with_walking(w),
        None => RadiusMask::none(),
    };
    let n = graph.segment_count();
    let done = AtomicUsize::new(0);

    let passes: Vec<(Vec<f64>, u32, f64)> = (0..n)
        .into_par_iter()
        .map_init(
            || (SegmentSearch::default(), ArenaContext::new()),
            |worker, s| -> EngineResult<(Vec<f64>, u32, f64)> {
                let (search, scratch) = worker;
                scratch.reset();
                let source = LineId::new(s as u32);
                let cfg = SegmentConfig {
                    mode,
                    radius,
                    angle_threshold: 0.0,
                    angle_precision: 0.0,
                };
                segment_search(graph, source, &cfg, progress, search)?;

                let mass = |seg: usize| -> f64 {
                    if weigh_by_length {
                        graph.segments()[seg].length
                    } else {
                        1.0
                    }
                };
                let source_mass = mass(s);

                // Subtree masses over the routing tree, deepest first.
                let mut subtree = scratch.alloc_vec_filled(n, 0.0f64);
                for &seg in &search.order {
                    subtree[seg as usize] += mass(seg as usize);
                }
                let mut local = vec![0.0f64; n];
                let mut node_count = 0u32;
                let mut total_depth = 0.0f64;
                for &seg in search.order.iter().rev() {
                    let v = seg as usize;
                    node_count += 1;
                    if v != s {
                        total_depth += Degrees(search.depth[v].angular).quarter_turns();
                        local[v] += source_mass * (subtree[v] - mass(v));
                    }
                    let parent = search.parent[v];
                    if parent != u32::MAX {
                        let mass_below = subtree[v];
                        subtree[parent as usize] += mass_below;
                    }
                }

                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 256 == 0 {
                    check_cancel(progress, Some("Betweenness"), count as f32 / n as f32)?;
                }
                Ok((local, node_count, total_depth))
            },
        )
        .collect::<EngineResult<Vec<_>>>()?;

    let mut betweenness = vec![0.0f64; n];
    let mut node_counts = vec![0u32; n];
    let mut total_depths = vec![0.0f32; n];
    for (s, (local, count, td)) in passes.into_iter().enumerate() {
        for (b, l) in betweenness.iter_mut().zip(local) {
            *b += l;
        }
        node_counts[s] = count;
        total_depths[s] = td as f32;
    }
    Ok(BetweennessResult {
        betweenness: betweenness.iter().map(|&b| (b * 0.5) as f32).collect(),
        node_counts,
        total_depths,
    })
}
