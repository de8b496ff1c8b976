//! Network integration (axial, steps metric) and segment-group integration.
//!
//! Both produce per-node `{N, TD}` pairs under the radius mask and score
//! them with the distance-weighted integration value: relative asymmetry
//! against the diamond-normalized D-value for the reached node count.

use crate::arena::ArenaContext;
use crate::traversal::{AxialExplorer, OriginSpec, TraversalConfig};
use axial_core::geometry::Vec2;
use axial_core::{
    check_cancel, DepthVector, DistanceMode, EngineResult, GroupId, LineId, ProgressSink,
    RadiusMask,
};
use axial_graph::{AxialGraph, SegmentGroupGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// Sentinel for nodes where integration is undefined (fewer than three
/// reachable nodes, or zero relative asymmetry).
pub const UNDEFINED_SCORE: f32 = -1.0;

/// Integration score from reached-node count `n` (including the origin) and
/// total depth `td`.
///
/// `MD = TD/(n-1)`, `RA = 2(MD-1)/(n-2)` and the D-value
/// `2(n(log2((n+2)/3) - 1) + 1)/((n-1)(n-2))`; the score is `D/RA`.
pub fn integration_score(n: u32, td: f64) -> f32 {
    if n < 3 {
        return UNDEFINED_SCORE;
    }
    let nf = n as f64;
    let md = td / (nf - 1.0);
    let ra = 2.0 * (md - 1.0) / (nf - 2.0);
    if ra <= 0.0 {
        return UNDEFINED_SCORE;
    }
    let d = 2.0 * (nf * (((nf + 2.0) / 3.0).log2() - 1.0) + 1.0) / ((nf - 1.0) * (nf - 2.0));
    (d / ra) as f32
}

/// Per-line and per-junction outputs of network integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIntegrationResult {
    pub node_counts: Vec<u32>,
    pub total_depths: Vec<f32>,
    pub integration: Vec<f32>,
    pub junction_coords: Vec<Vec2>,
    pub junction_scores: Vec<f32>,
}

/// Axial integration over the steps metric: one traversal per line,
/// parallelized with private accumulators per origin.
pub fn network_integration(
    graph: &AxialGraph,
    radius: RadiusMask,
    progress: &dyn ProgressSink,
) -> EngineResult<NetworkIntegrationResult> {
    let explorer = AxialExplorer::new(graph);
    let line_count = graph.line_count();
    let done = AtomicUsize::new(0);

    let per_line: Vec<(u32, f32)> = (0..line_count)
        .into_par_iter()
        .map_init(ArenaContext::new, |scratch, origin| -> EngineResult<(u32, f32)> {
            scratch.reset();
            let cfg = TraversalConfig {
                mode: DistanceMode::Steps,
                radius,
                ..Default::default()
            };
            let origin_spec = OriginSpec::Line(LineId::new(origin as u32));
            let origin_pos = explorer.origin_position(origin_spec);
            let mut steps = scratch.alloc_vec_filled(line_count, u32::MAX);
            steps[origin] = 0;
            explorer.explore(
                origin_spec,
                origin_pos,
                &cfg,
                progress,
                scratch,
                &mut |st: &crate::traversal::StateRef, depth: &DepthVector| {
                    let slot = &mut steps[st.line.index()];
                    *slot = (*slot).min(depth.steps);
                },
            )?;
            let count = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            if count % 256 == 0 {
                check_cancel(
                    progress,
                    Some("Network integration"),
                    count as f32 / line_count as f32,
                )?;
            }
            let n = steps.iter().filter(|&&s| s != u32::MAX).count() as u32;
            let td: u64 = steps
                .iter()
                .filter(|&&s| s != u32::MAX)
                .map(|&s| s as u64)
                .sum();
            Ok((n, td as f32))
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let node_counts: Vec<u32> = per_line.iter().map(|&(n, _)| n).collect();
    let total_depths: Vec<f32> = per_line.iter().map(|&(_, td)| td).collect();
    let integration: Vec<f32> = per_line
        .iter()
        .map(|&(n, td)| integration_score(n, td as f64))
        .collect();

    // Junction score: mean integration of the lines meeting there.
    let mut junction_coords = Vec::with_capacity(graph.junction_count());
    let mut junction_scores = Vec::with_capacity(graph.junction_count());
    for junction in graph.junctions() {
        junction_coords.push(junction.position);
        let mut sum = 0.0f64;
        let mut n = 0usize;
        for &(line, _) in &junction.lines {
            let v = integration[line.index()];
            if v != UNDEFINED_SCORE {
                sum += v as f64;
                n += 1;
            }
        }
        junction_scores.push(if n > 0 {
            (sum / n as f64) as f32
        } else {
            UNDEFINED_SCORE
        });
    }

    Ok(NetworkIntegrationResult {
        node_counts,
        total_depths,
        integration,
        junction_coords,
        junction_scores,
    })
}

/// Per-group outputs of segment-group integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupIntegrationResult {
    pub node_counts: Vec<u32>,
    pub total_depths: Vec<f32>,
    pub integration: Vec<f32>,
}

struct GroupHeapEntry {
    metric: f64,
    seq: u64,
    group: u32,
    depth: DepthVector,
}

impl PartialEq for GroupHeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.metric == other.metric && self.seq == other.seq
    }
}
impl Eq for GroupHeapEntry {}
impl PartialOrd for GroupHeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for GroupHeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .metric
            .total_cmp(&self.metric)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Single-source traversal over the group graph. Walking depth counts the
/// member length of intermediate groups only: stepping to a neighbor is
/// free, continuing beyond a group pays for crossing it.
fn group_search(
    graph: &SegmentGroupGraph,
    source: GroupId,
    radius: &RadiusMask,
    scratch: &ArenaContext,
    steps_out: &mut [u32],
) -> EngineResult<()> {
    steps_out.fill(u32::MAX);
    let n = graph.group_count();
    let mut best = scratch.alloc_vec_filled(n, f64::INFINITY);
    let mut settled = scratch.alloc_vec_filled(n, false);
    let mut heap: BinaryHeap<GroupHeapEntry> = BinaryHeap::new();
    let mut seq = 0u64;
    heap.push(GroupHeapEntry {
        metric: 0.0,
        seq,
        group: source.value(),
        depth: DepthVector::default(),
    });
    seq += 1;
    best[source.index()] = 0.0;

    while let Some(top) = heap.pop() {
        let u = top.group as usize;
        if settled[u] {
            continue;
        }
        settled[u] = true;
        steps_out[u] = top.depth.steps;

        let crossing_cost = if top.group == source.value() {
            0.0
        } else {
            graph.group_length(GroupId::new(top.group))
        };
        for &edge_index in graph.edges_of(GroupId::new(top.group)) {
            let edge = graph.edge(edge_index);
            let v = edge.other(GroupId::new(top.group));
            if settled[v.index()] {
                continue;
            }
            let mut next = top.depth;
            next.steps += 1;
            next.walking += crossing_cost;
            next.angular += edge.min_angle_degrees;
            next.axmeter += top.depth.steps as f64 * crossing_cost;
            if !radius.admits(&next) {
                continue;
            }
            let metric = next.steps as f64;
            if metric < best[v.index()] {
                best[v.index()] = metric;
                heap.push(GroupHeapEntry {
                    metric,
                    seq,
                    group: v.value(),
                    depth: next,
                });
                seq += 1;
            }
        }
    }
    Ok(())
}

/// Integration over the segment-group graph; depth metric is steps between
/// groups.
pub fn segment_group_integration(
    graph: &SegmentGroupGraph,
    radius: RadiusMask,
    progress: &dyn ProgressSink,
) -> EngineResult<GroupIntegrationResult> {
    let group_count = graph.group_count();
    let done = AtomicUsize::new(0);
    let per_group: Vec<(u32, f32)> = (0..group_count)
        .into_par_iter()
        .map_init(ArenaContext::new, |scratch, origin| -> EngineResult<(u32, f32)> {
            scratch.reset();
            let mut steps = scratch.alloc_vec_filled(group_count, u32::MAX);
            group_search(graph, GroupId::new(origin as u32), &radius, scratch, &mut steps)?;
            let count = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            if count % 256 == 0 {
                check_cancel(
                    progress,
                    Some("Group integration"),
                    count as f32 / group_count as f32,
                )?;
            }
            let n = steps.iter().filter(|&&s| s != u32::MAX).count() as u32;
            let td: u64 = steps
                .iter()
                .filter(|&&s| s != u32::MAX)
                .map(|&s| s as u64)
                .sum();
            Ok((n, td as f32))
        })
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(GroupIntegrationResult {
        node_counts: per_group.iter().map(|&(n, _)| n).collect(),
        total_depths: per_group.iter().map(|&(_, td)| td).collect(),
        integration: per_group
            .iter()
            .map(|&(n, td)| integration_score(n, td as f64))
            .collect(),
    })
}
