//! Reach: how much network is inside the radius around each origin.
//!
//! Per origin the analysis reports the number of reached lines, their total
//! length, and the area of the catchment: the convex hull of the reached
//! line endpoints, or the full disc when a straight-line limit defines the
//! catchment boundary.

use crate::arena::ArenaContext;
use crate::traversal::{AxialExplorer, OriginSpec, StateRef, TraversalConfig};
use axial_core::geometry::{convex_hull_area, Vec2};
use axial_core::{
    check_cancel, DepthVector, DistanceMode, EngineError, EngineResult, LineId, ProgressSink,
    RadiusMask,
};
use axial_graph::AxialGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-origin reach outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachResult {
    pub reached_count: Vec<u32>,
    pub reached_length: Vec<f32>,
    pub reached_area: Vec<f32>,
}

/// Reach from every line, or from the supplied origin points when present.
pub fn reach(
    graph: &AxialGraph,
    radius: RadiusMask,
    origin_points: &[Vec2],
    progress: &dyn ProgressSink,
) -> EngineResult<ReachResult> {
    let explorer = AxialExplorer::new(graph);

    let origins: Vec<(OriginSpec, Vec2)> = if origin_points.is_empty() {
        (0..graph.line_count())
            .map(|i| {
                let spec = OriginSpec::Line(LineId::new(i as u32));
                (spec, explorer.origin_position(spec))
            })
            .collect()
    } else {
        origin_points
            .iter()
            .map(|&p| {
                let (line, t, offset) = graph
                    .attach(p)
                    .ok_or_else(|| EngineError::BadInput("origin point has no line".into()))?;
                Ok((OriginSpec::PointOn { line, t, offset }, p))
            })
            .collect::<EngineResult<Vec<_>>>()?
    };

    let done = AtomicUsize::new(0);
    let total = origins.len();
    let per_origin: Vec<(u32, f32, f32)> = origins
        .into_par_iter()
        .map_init(
            ArenaContext::new,
            |scratch, (origin, origin_pos)| -> EngineResult<(u32, f32, f32)> {
                scratch.reset();
                let cfg = TraversalConfig {
                    mode: DistanceMode::Walking,
                    radius,
                    ..Default::default()
                };
                let mut reached = scratch.alloc_vec_filled(graph.line_count(), false);
                // The origin's own line is inside every radius.
                let origin_line = match origin {
                    OriginSpec::Line(l) => l,
                    OriginSpec::PointOn { line, .. } => line,
                    OriginSpec::Junction(_) => unreachable!(),
                };
                reached[origin_line.index()] = true;
                explorer.explore(
                    origin,
                    origin_pos,
                    &cfg,
                    progress,
                    scratch,
                    &mut |st: &StateRef, _depth: &DepthVector| {
                        reached[st.line.index()] = true;
                    },
                )?;

                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 256 == 0 {
                    check_cancel(progress, Some("Reach"), count as f32 / total as f32)?;
                }

                let mut total_len = 0.0f64;
                let mut endpoints = scratch.alloc_vec::<Vec2>();
                let mut n = 0u32;
            for (i, &hit) in reached.iter().enumerate() {
                if !hit {
                    continue;
                }
                let line = graph.line(LineId::new(i as u32));
                total_len += line.length;
                endpoints.push(line.p0);
                endpoints.push(line.p1);
                n += 1;
            }
            let area = match radius.straight_limit() {
                Some(r) => (std::f64::consts::PI * r * r) as f32,
                None => convex_hull_area(&endpoints) as f32,
            };
            Ok((n, total_len as f32, area))
        })
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(ReachResult {
        reached_count: per_origin.iter().map(|r| r.0).collect(),
        reached_length: per_origin.iter().map(|r| r.1).collect(),
        reached_area: per_origin.iter().map(|r| r.2).collect(),
    })
}
