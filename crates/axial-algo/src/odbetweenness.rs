//! Origin-destination betweenness.
//!
//! Origins are weighted ad-hoc points, destinations are the graph's
//! attached points with optional weights. Every origin sends its mass to
//! the reachable destinations (all of them, shared by destination weight,
//! or only the closest one); each line touched by a shortest path collects
//! the share routed over it.

use crate::arena::ArenaContext;
use crate::traversal::{AxialExplorer, OriginSpec, StateRef, TraversalConfig};
use axial_core::geometry::Vec2;
use axial_core::{
    check_cancel, DepthVector, DistanceMode, EngineError, EngineResult, ProgressSink, RadiusMask,
};
use axial_graph::AxialGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which destinations receive mass from an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DestinationMode {
    AllReachable = 0,
    ClosestOnly = 1,
}

impl DestinationMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AllReachable),
            1 => Some(Self::ClosestOnly),
            _ => None,
        }
    }
}

/// Per-line flow scores.
#[allow(clippy::too_many_arguments)]
pub fn od_betweenness(
    graph: &AxialGraph,
    origins: &[Vec2],
    origin_weights: Option<&[f32]>,
    destination_weights: Option<&[f32]>,
    destination_mode: DestinationMode,
    mode: DistanceMode,
    radius: RadiusMask,
    progress: &dyn ProgressSink,
) -> EngineResult<Vec<f32>> {
    if !matches!(mode, DistanceMode::Walking | DistanceMode::Angular) {
        return Err(EngineError::BadInput(
            "od betweenness supports walking and angular metrics".into(),
        ));
    }
    if let Some(w) = origin_weights {
        if w.len() != origins.len() {
            return Err(EngineError::BadInput(format!(
                "{} origin weights for {} origins",
                w.len(),
                origins.len()
            )));
        }
    }
    if let Some(w) = destination_weights {
        if w.len() != graph.point_count() {
            return Err(EngineError::BadInput(format!(
                "{} destination weights for {} graph points",
                w.len(),
                graph.point_count()
            )));
        }
    }

    let explorer = AxialExplorer::new(graph);
    let line_count = graph.line_count();
    let done = AtomicUsize::new(0);

    let per_origin: Vec<Vec<f64>> = origins
        .par_iter()
        .enumerate()
        .map_init(ArenaContext::new, |scratch, (oi, &origin_pos)| -> EngineResult<Vec<f64>> {
            scratch.reset();
            let (origin_line, origin_t, origin_offset) = graph
                .attach(origin_pos)
                .ok_or_else(|| EngineError::BadInput("origin point has no line".into()))?;
            let cfg = TraversalConfig {
                mode,
                radius,
                ..Default::default()
            };
            let origin = OriginSpec::PointOn {
                line: origin_line,
                t: origin_t,
                offset: origin_offset,
            };

            // Best arrival per destination: metric, score and the state the
            // path came through (`u32::MAX` = direct along the origin line).
            let mut best_metric = scratch.alloc_vec_filled(graph.point_count(), f64::INFINITY);
            let mut best_state = scratch.alloc_vec_filled(graph.point_count(), u32::MAX);
            let mut reachable = scratch.alloc_vec_filled(graph.point_count(), false);

            // Destinations on the origin line are walkable directly.
            let origin_geom = graph.line(origin_line);
            for &pid in graph.points_on(origin_line) {
                let dest = graph.point(pid);
                let d_len = (dest.t - origin_t).abs() * origin_geom.length;
                let score = DepthVector {
                    straight: origin_pos.distance(dest.position),
                    walking: origin_offset + d_len + dest.offset,
                    ..Default::default()
                };
                if radius.admits(&score) {
                    let metric = score.metric(mode);
                    if metric < best_metric[pid.index()] {
                        best_metric[pid.index()] = metric;
                        best_state[pid.index()] = u32::MAX;
                        reachable[pid.index()] = true;
                    }
                }
            }

            let mut parents: Vec<u32> = Vec::new();
            {
                let best_metric = &mut best_metric;
                let best_state = &mut best_state;
                let reachable = &mut reachable;
                explorer.explore_with_parents(
                    origin,
                    origin_pos,
                    &cfg,
                    progress,
                    scratch,
                    &mut |st: &StateRef, depth: &DepthVector| {
                        for &pid in graph.points_on(st.line) {
                            let dest = graph.point(pid);
                            let Some(mut score) = explorer.along_line_score(
                                st,
                                depth,
                                &cfg,
                                dest.t,
                                dest.offset,
                            ) else {
                                continue;
                            };
                            score.straight = origin_pos.distance(dest.position);
                            if !radius.admits(&score) {
                                continue;
                            }
                            let metric = score.metric(mode);
                            if metric < best_metric[pid.index()] {
                                best_metric[pid.index()] = metric;
                                best_state[pid.index()] = st.state;
                                reachable[pid.index()] = true;
                            }
                        }
                    },
                    Some(&mut parents),
                )?;
            }

            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 64 == 0 {
                check_cancel(progress, Some("OD betweenness"), count as f32 / origins.len() as f32)?;
            }

            let origin_mass = origin_weights.map_or(1.0, |w| w[oi] as f64);
            let dest_weight =
                |pid: usize| destination_weights.map_or(1.0, |w| w[pid] as f64);

            // Select destinations and their mass shares.
            let mut selected: Vec<(usize, f64)> = Vec::new();
            match destination_mode {
                DestinationMode::ClosestOnly => {
                    let mut closest: Option<usize> = None;
                    for pid in 0..graph.point_count() {
                        if !reachable[pid] {
                            continue;
                        }
                        if closest.map_or(true, |c| best_metric[pid] < best_metric[c]) {
                            closest = Some(pid);
                        }
                    }
                    if let Some(pid) = closest {
                        selected.push((pid, origin_mass));
                    }
                }
                DestinationMode::AllReachable => {
                    let total: f64 = (0..graph.point_count())
                        .filter(|&pid| reachable[pid])
                        .map(dest_weight)
                        .sum();
                    if total > 0.0 {
                        for pid in 0..graph.point_count() {
                            if reachable[pid] {
                                selected.push((pid, origin_mass * dest_weight(pid) / total));
                            }
                        }
                    }
                }
            }

            // Route each share over the lines of its path.
            let mut scores = vec![0.0f64; line_count];
            let mut touched = scratch.alloc_vec_filled(line_count, false);
            for (pid, share) in selected {
                if share == 0.0 {
                    continue;
                }
                for t in touched.iter_mut() {
                    *t = false;
                }
                let dest_line = graph.point(axial_core::PointId::new(pid as u32)).line;
                touched[dest_line.index()] = true;
                touched[origin_line.index()] = true;
                let mut state = best_state[pid];
                while state != u32::MAX {
                    touched[explorer.decode(state).line.index()] = true;
                    state = parents[state as usize];
                }
                for (line, &hit) in touched.iter().enumerate() {
                    if hit {
                        scores[line] += share;
                    }
                }
            }
            Ok(scores)
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let mut out = vec![0.0f64; line_count];
    for local in per_origin {
        for (o, l) in out.iter_mut().zip(local) {
            *o += l;
        }
    }
    Ok(out.into_iter().map(|v| v as f32).collect())
}
