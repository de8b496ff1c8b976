//! Attraction accessibility: distance to the nearest attraction, and
//! distance-weighted attraction reach.
//!
//! Attractions are ad-hoc points (or polygon outlines sampled into points)
//! attached to the graph at analysis time. Origins iterate the entity class
//! selected by the caller: graph points, junctions, lines or point groups.

use crate::arena::ArenaContext;
use crate::traversal::{AxialExplorer, OriginSpec, StateRef, TraversalConfig};
use axial_core::geometry::Vec2;
use axial_core::{
    check_cancel, DepthVector, DistanceMode, EngineError, EngineResult, GroupId, JunctionId,
    LineId, OriginType, PointId, ProgressSink, RadiusMask,
};
use axial_graph::{sample_polygon_points, AxialGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Distance weighting applied to attraction values in reach scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightFunc {
    /// Every reachable attraction counts fully.
    Constant,
    /// `1 - (d/R)^C` with R the active radius limit for the metric.
    Pow { constant: f64 },
    /// Symmetric ease curve over `x = d/R`.
    Curve { constant: f64 },
    /// `(d+1)^-C` on the raw depth.
    Divide { constant: f64 },
}

impl WeightFunc {
    pub fn from_raw(kind: u8, constant: f64) -> Option<Self> {
        match kind {
            0 => Some(Self::Constant),
            1 => Some(Self::Pow { constant }),
            2 => Some(Self::Curve { constant }),
            3 => Some(Self::Divide { constant }),
            _ => None,
        }
    }

    fn apply(&self, depth: f64, limit: Option<f64>) -> f64 {
        match *self {
            WeightFunc::Constant => 1.0,
            WeightFunc::Pow { constant } => {
                let x = normalized(depth, limit);
                (1.0 - x.powf(constant)).max(0.0)
            }
            WeightFunc::Curve { constant } => {
                let x = normalized(depth, limit);
                let scale = 2.0f64.powf(constant - 1.0);
                if x <= 0.5 {
                    1.0 - scale * x.powf(constant)
                } else {
                    scale * (1.0 - x).powf(constant)
                }
            }
            WeightFunc::Divide { constant } => (depth + 1.0).powf(-constant),
        }
    }
}

fn normalized(depth: f64, limit: Option<f64>) -> f64 {
    match limit {
        Some(r) if r > 0.0 => (depth / r).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// How a polygon's value spreads over its sampled points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DistributionFunc {
    /// The full value counts once, at the nearest reachable sample.
    Copy = 0,
    /// The value splits evenly over the samples.
    Divide = 1,
}

impl DistributionFunc {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Copy),
            1 => Some(Self::Divide),
            _ => None,
        }
    }
}

/// How point-group member scores collapse to one value per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CollectionFunc {
    Average = 0,
    Sum = 1,
    Min = 2,
    Max = 3,
}

impl CollectionFunc {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Average),
            1 => Some(Self::Sum),
            2 => Some(Self::Min),
            3 => Some(Self::Max),
            _ => None,
        }
    }
}

/// Attraction input: raw points, or polygon corners with per-polygon corner
/// counts sampled at `interval`.
#[derive(Debug, Clone, Copy)]
pub struct AttractionSet<'a> {
    pub points: &'a [Vec2],
    pub points_per_polygon: Option<&'a [u32]>,
    pub polygon_point_interval: f64,
}

struct AttachedAttraction {
    position: Vec2,
    t: f64,
    offset: f64,
    /// Output entity: polygon index when sampled, point index otherwise.
    dest_index: u32,
}

/// Attractions attached to the graph, bucketed per line.
struct AttractionField {
    /// Per line: indices into `attached`.
    per_line: Vec<Vec<u32>>,
    attached: Vec<AttachedAttraction>,
    /// Sample count per destination entity (1 for plain points).
    samples_per_dest: Vec<u32>,
}

fn attach_attractions(graph: &AxialGraph, set: &AttractionSet) -> EngineResult<AttractionField> {
    let (positions, groups) = match set.points_per_polygon {
        Some(counts) => {
            let (pts, ranges) =
                sample_polygon_points(set.points, counts, set.polygon_point_interval)?;
            (pts, Some(ranges))
        }
        None => (set.points.to_vec(), None),
    };

    let mut per_line = vec![Vec::new(); graph.line_count()];
    let mut attached = Vec::with_capacity(positions.len());
    for (i, &p) in positions.iter().enumerate() {
        let (line, t, offset) = graph
            .attach(p)
            .ok_or_else(|| EngineError::BadInput("attraction point has no line".into()))?;
        let dest_index = match &groups {
            Some(ranges) => ranges
                .iter()
                .position(|r| r.contains(&(i as u32)))
                .unwrap_or(0) as u32,
            None => i as u32,
        };
        per_line[line.index()].push(attached.len() as u32);
        attached.push(AttachedAttraction {
            position: p,
            t,
            offset,
            dest_index,
        });
    }
    let samples_per_dest = match &groups {
        Some(ranges) => ranges.iter().map(|r| r.end - r.start).collect(),
        None => vec![1; positions.len()],
    };
    Ok(AttractionField {
        per_line,
        attached,
        samples_per_dest,
    })
}

/// Origin entities of the requested type, with their traversal spec and
/// physical position.
fn collect_origins(
    graph: &AxialGraph,
    origin_type: OriginType,
) -> Vec<(OriginSpec, Vec2)> {
    match origin_type {
        OriginType::Lines => (0..graph.line_count())
            .map(|i| {
                let line = LineId::new(i as u32);
                (
                    OriginSpec::Line(line),
                    graph.line(line).midpoint(),
                )
            })
            .collect(),
        OriginType::Junctions => (0..graph.junction_count())
            .map(|i| {
                let junction = JunctionId::new(i as u32);
                (
                    OriginSpec::Junction(junction),
                    graph.junction(junction).position,
                )
            })
            .collect(),
        // Point groups iterate the raw points; grouping happens at
        // aggregation time.
        OriginType::Points | OriginType::PointGroups => (0..graph.point_count())
            .map(|i| {
                let point = graph.point(PointId::new(i as u32));
                (
                    OriginSpec::PointOn {
                        line: point.line,
                        t: point.t,
                        offset: point.offset,
                    },
                    point.position,
                )
            })
            .collect(),
    }
}

/// Minimum admitted depth per attraction sample from one origin, by the
/// configured metric. `None` where the sample is out of reach.
fn scan_attractions(
    explorer: &AxialExplorer,
    field: &AttractionField,
    origin: OriginSpec,
    origin_pos: Vec2,
    cfg: &TraversalConfig,
    scratch: &ArenaContext,
    progress: &dyn ProgressSink,
) -> EngineResult<Vec<Option<DepthVector>>> {
    let graph = explorer.graph;
    let mut best: Vec<Option<DepthVector>> = vec![None; field.attached.len()];
    let mut consider = |slot: usize, mut score: DepthVector, radius: &RadiusMask, mode| {
        score.straight = origin_pos.distance(field.attached[slot].position);
        if !radius.admits(&score) {
            return;
        }
        let entry = &mut best[slot];
        if entry
            .as_ref()
            .map_or(true, |b| score.metric(mode) < b.metric(mode))
        {
            *entry = Some(score);
        }
    };

    // Attractions on the origin's own line are walkable directly.
    let local: Option<(LineId, f64, f64)> = match origin {
        OriginSpec::Line(line) => Some((line, 0.5, 0.0)),
        OriginSpec::PointOn { line, t, offset } => Some((line, t, offset)),
        OriginSpec::Junction(_) => None,
    };
    if let Some((line, t_from, base_offset)) = local {
        let geom = graph.line(line);
        for &slot in &field.per_line[line.index()] {
            let a = &field.attached[slot as usize];
            let fraction = (a.t - t_from).abs();
            let d_len = fraction * geom.length;
            let score = DepthVector {
                straight: 0.0,
                walking: base_offset + d_len + a.offset,
                steps: 0,
                angular: 0.0,
                axmeter: 0.0,
                weight: (base_offset + a.offset) * cfg.weight_per_meter_point_edges
                    + cfg
                        .line_weights
                        .and_then(|w| w.get(line.index()))
                        .copied()
                        .unwrap_or(0.0) as f64
                        * fraction,
            };
            consider(slot as usize, score, &cfg.radius, cfg.mode);
        }
    }

    explorer.explore(
        origin,
        origin_pos,
        cfg,
        progress,
        scratch,
        &mut |st: &StateRef, depth: &DepthVector| {
            for &slot in &field.per_line[st.line.index()] {
                let a = &field.attached[slot as usize];
                if let Some(score) = explorer.along_line_score(st, depth, cfg, a.t, a.offset) {
                    consider(slot as usize, score, &cfg.radius, cfg.mode);
                }
            }
        },
    )?;
    Ok(best)
}

/// Depth in the metric's natural unit (angular in degrees).
fn metric_value(mode: DistanceMode, depth: &DepthVector) -> f64 {
    depth.metric(mode)
}

/// Per-origin minimum distance to any attraction, with the index of the
/// attraction entity that provided it. Unreachable origins yield `(-1, -1)`.
pub fn attraction_distance(
    graph: &AxialGraph,
    origin_type: OriginType,
    mode: DistanceMode,
    radius: RadiusMask,
    attractions: AttractionSet<'_>,
    line_weights: Option<&[f32]>,
    weight_per_meter_point_edges: f64,
    progress: &dyn ProgressSink,
) -> EngineResult<(Vec<f32>, Vec<i32>)> {
    let field = attach_attractions(graph, &attractions)?;
    let origins = collect_origins(graph, origin_type);
    let explorer = AxialExplorer::new(graph);
    let done = AtomicUsize::new(0);

    let per_origin: Vec<(f32, i32)> = origins
        .par_iter()
        .map_init(ArenaContext::new, |scratch, &(origin, origin_pos)| -> EngineResult<(f32, i32)> {
            scratch.reset();
            // Straight distances ignore the network entirely.
            if mode == DistanceMode::Straight {
                let mut best = f32::INFINITY;
                let mut dest = -1i32;
                for a in &field.attached {
                    let d = origin_pos.distance(a.position);
                    if radius.straight_limit().is_some_and(|r| d > r + 1e-9) {
                        continue;
                    }
                    if (d as f32) < best {
                        best = d as f32;
                        dest = a.dest_index as i32;
                    }
                }
                return Ok(if dest >= 0 { (best, dest) } else { (-1.0, -1) });
            }

            let cfg = TraversalConfig {
                mode,
                radius,
                line_weights,
                weight_per_meter_point_edges,
            };
            let best =
                scan_attractions(&explorer, &field, origin, origin_pos, &cfg, scratch, progress)?;
            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 256 == 0 {
                check_cancel(
                    progress,
                    Some("Attraction distance"),
                    count as f32 / origins.len() as f32,
                )?;
            }
            let mut min = f64::INFINITY;
            let mut dest = -1i32;
            for (slot, depth) in best.iter().enumerate() {
                if let Some(depth) = depth {
                    let d = metric_value(mode, depth);
                    if d < min {
                        min = d;
                        dest = field.attached[slot].dest_index as i32;
                    }
                }
            }
            Ok(if dest >= 0 { (min as f32, dest) } else { (-1.0, -1) })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let (mut distances, mut dest_indices): (Vec<f32>, Vec<i32>) =
        per_origin.into_iter().unzip();

    // Point-group origins collapse to the nearest member.
    if origin_type == OriginType::PointGroups {
        let mut grouped = vec![-1.0f32; graph.group_count()];
        let mut grouped_dest = vec![-1i32; graph.group_count()];
        for g in 0..graph.group_count() {
            let range = graph.group_points(GroupId::new(g as u32));
            for p in range {
                let d = distances[p as usize];
                if d >= 0.0 && (grouped[g] < 0.0 || d < grouped[g]) {
                    grouped[g] = d;
                    grouped_dest[g] = dest_indices[p as usize];
                }
            }
        }
        distances = grouped;
        dest_indices = grouped_dest;
    }
    Ok((distances, dest_indices))
}

/// Per-origin attraction reach score.
#[allow(clippy::too_many_arguments)]
pub fn attraction_reach(
    graph: &AxialGraph,
    origin_type: OriginType,
    mode: DistanceMode,
    radius: RadiusMask,
    weight_func: WeightFunc,
    attractions: AttractionSet<'_>,
    attraction_values: Option<&[f32]>,
    distribution: DistributionFunc,
    collection: CollectionFunc,
    progress: &dyn ProgressSink,
) -> EngineResult<Vec<f32>> {
    let field = attach_attractions(graph, &attractions)?;
    if let Some(values) = attraction_values {
        if values.len() != field.samples_per_dest.len() {
            return Err(EngineError::BadInput(format!(
                "{} attraction values for {} attraction entities",
                values.len(),
                field.samples_per_dest.len()
            )));
        }
    }
    if mode == DistanceMode::Undefined && !matches!(weight_func, WeightFunc::Constant) {
        return Err(EngineError::BadInput(
            "distance-weighted reach requires a distance type".into(),
        ));
    }

    let origins = collect_origins(graph, origin_type);
    let explorer = AxialExplorer::new(graph);
    let limit = radius.limit_for(mode);
    let done = AtomicUsize::new(0);

    let per_origin: Vec<f32> = origins
        .par_iter()
        .map_init(ArenaContext::new, |scratch, &(origin, origin_pos)| -> EngineResult<f32> {
            scratch.reset();
            let cfg = TraversalConfig {
                mode: if mode == DistanceMode::Undefined {
                    DistanceMode::Steps
                } else {
                    mode
                },
                radius,
                ..Default::default()
            };
            let best =
                scan_attractions(&explorer, &field, origin, origin_pos, &cfg, scratch, progress)?;
            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 256 == 0 {
                check_cancel(
                    progress,
                    Some("Attraction reach"),
                    count as f32 / origins.len() as f32,
                )?;
            }

            let value_of = |dest: usize| -> f64 {
                attraction_values.map_or(1.0, |v| v[dest] as f64)
            };

            let mut score = 0.0f64;
            match distribution {
                DistributionFunc::Divide => {
                    for (slot, depth) in best.iter().enumerate() {
                        let Some(depth) = depth else { continue };
                        let a = &field.attached[slot];
                        let dest = a.dest_index as usize;
                        let share = value_of(dest) / field.samples_per_dest[dest].max(1) as f64;
                        score +=
                            share * weight_func.apply(metric_value(mode, depth), limit);
                    }
                }
                DistributionFunc::Copy => {
                    // Full value once, at the nearest reachable sample.
                    let mut nearest: Vec<Option<f64>> =
                        vec![None; field.samples_per_dest.len()];
                    for (slot, depth) in best.iter().enumerate() {
                        let Some(depth) = depth else { continue };
                        let dest = field.attached[slot].dest_index as usize;
                        let d = metric_value(mode, depth);
                        let entry = &mut nearest[dest];
                        if entry.map_or(true, |b| d < b) {
                            *entry = Some(d);
                        }
                    }
                    for (dest, d) in nearest.into_iter().enumerate() {
                        if let Some(d) = d {
                            score += value_of(dest) * weight_func.apply(d, limit);
                        }
                    }
                }
            }
            Ok(score as f32)
        })
        .collect::<EngineResult<Vec<_>>>()?;

    // Point-group origins collapse via the collection function.
    if origin_type == OriginType::PointGroups {
        let mut out = vec![0.0f32; graph.group_count()];
        for g in 0..graph.group_count() {
            let range = graph.group_points(GroupId::new(g as u32));
            let members: Vec<f32> = range.map(|p| per_origin[p as usize]).collect();
            out[g] = if members.is_empty() {
                0.0
            } else {
                match collection {
                    CollectionFunc::Average => {
                        members.iter().sum::<f32>() / members.len() as f32
                    }
                    CollectionFunc::Sum => members.iter().sum(),
                    CollectionFunc::Min => members.iter().copied().fold(f32::INFINITY, f32::min),
                    CollectionFunc::Max => {
                        members.iter().copied().fold(f32::NEG_INFINITY, f32::max)
                    }
                }
            };
        }
        return Ok(out);
    }
    Ok(per_origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axial_core::NullProgress;
    use axial_graph::AxialBuildConfig;

    /// Chain of `n` lines with one point hovering above each line.
    fn chain_with_points(n: u32, length: f64) -> AxialGraph {
        let pts: Vec<Vec2> = (0..=n)
            .map(|i| Vec2::new(i as f64 * length, 0.0))
            .collect();
        let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
        let points: Vec<Vec2> = (0..n)
            .map(|i| Vec2::new((0.5 + i as f64) * length, 1.0))
            .collect();
        AxialGraph::build(
            &pts,
            &pairs,
            &[],
            &points,
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap()
    }

    fn attractions(points: &[Vec2]) -> AttractionSet<'_> {
        AttractionSet {
            points,
            points_per_polygon: None,
            polygon_point_interval: 0.0,
        }
    }

    fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(actual.len(), expected.len());
        for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
            if e == 0.0 {
                assert!(a.abs() < tol, "index {i}: {a} != 0");
            } else {
                assert!(((a - e) / e).abs() < tol, "index {i}: {a} != {e}");
            }
        }
    }

    #[test]
    fn test_distance_walking_from_points() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0)];
        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[3.5, 6.5, 9.5, 12.5, 15.5], 1e-4);
    }

    #[test]
    fn test_distance_radius_masks() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0)];
        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none().with_walking(10.0),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[3.5, 6.5, 9.5, -1.0, -1.0], 1e-4);

        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none().with_steps(3),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[3.5, 6.5, 9.5, 12.5, -1.0], 1e-4);
    }

    #[test]
    fn test_distance_from_lines_and_junctions() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0)];
        let (d, _) = attraction_distance(
            &g,
            OriginType::Lines,
            DistanceMode::Walking,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[2.5, 5.5, 8.5, 11.5, 14.5], 1e-4);

        let (d, _) = attraction_distance(
            &g,
            OriginType::Junctions,
            DistanceMode::Walking,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[4.0, 7.0, 10.0, 13.0], 1e-4);
    }

    #[test]
    fn test_distance_straight() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0)];
        let (d, _) = attraction_distance(
            &g,
            OriginType::Lines,
            DistanceMode::Straight,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[2.5, 5.5, 8.5, 11.5, 14.5], 1e-4);

        let (d, _) = attraction_distance(
            &g,
            OriginType::Lines,
            DistanceMode::Straight,
            RadiusMask::none().with_straight(7.0),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[2.5, 5.5, -1.0, -1.0, -1.0], 1e-4);

        let expected: Vec<f32> = [2.5f64, 5.5, 8.5, 11.5, 14.5]
            .iter()
            .map(|&x| ((x * x + 1.0).sqrt()) as f32)
            .collect();
        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Straight,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &expected, 1e-4);
    }

    #[test]
    fn test_distance_custom_weights() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0)];
        let weights = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Weights,
            RadiusMask::none(),
            attractions(&attr),
            Some(&weights),
            1.5,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[3.5, 5.0, 7.5, 11.0, 15.5], 1e-4);
    }

    #[test]
    fn test_distance_polygon_attractions() {
        let g = chain_with_points(3, 3.0);
        let corners = [
            Vec2::new(-1.1, 0.5),
            Vec2::new(-0.1, 0.5),
            Vec2::new(-0.1, -0.5),
            Vec2::new(-1.1, -0.5),
            Vec2::new(10.0, 0.5),
            Vec2::new(11.0, 0.5),
            Vec2::new(11.0, -0.5),
            Vec2::new(10.0, -0.5),
        ];
        let set = AttractionSet {
            points: &corners,
            points_per_polygon: Some(&[4, 4]),
            polygon_point_interval: 0.5,
        };
        let (d, dest) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none(),
            set,
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[2.6, 5.6, 3.5], 1e-3);
        assert_eq!(dest, vec![0, 0, 1]);
    }

    /// Five unit lines meeting at 30° bends, with one graph point past the
    /// right end and index pairs partially reversed.
    fn wave_graph() -> AxialGraph {
        let rise = 0.75f64.sqrt();
        let mut x = 0.0;
        let mut pts = vec![Vec2::new(0.0, 0.0)];
        x += 1.0;
        pts.push(Vec2::new(x, 0.0));
        x += rise;
        pts.push(Vec2::new(x, 0.5));
        x += 1.0;
        pts.push(Vec2::new(x, 0.5));
        x += rise;
        pts.push(Vec2::new(x, 0.0));
        x += 1.0;
        pts.push(Vec2::new(x, 0.0));
        let pairs = [(0u32, 1u32), (2, 1), (3, 2), (3, 4), (4, 5)];
        let points = [Vec2::new(x + 1.0, 0.0)];
        AxialGraph::build(
            &pts,
            &pairs,
            &[],
            &points,
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap()
    }

    #[test]
    fn test_distance_wave_angular() {
        let g = wave_graph();
        let attr = [Vec2::new(-1.0, 0.0)];

        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[7.0], 1e-4);

        let (d, _) = attraction_distance(
            &g,
            OriginType::Lines,
            DistanceMode::Angular,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[0.0, 30.0, 60.0, 90.0, 120.0], 1e-3);

        let (d, _) = attraction_distance(
            &g,
            OriginType::Junctions,
            DistanceMode::Angular,
            RadiusMask::none(),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[0.0, 30.0, 60.0, 90.0], 1e-3);

        // Multi-limit AND semantics around the 120°/4-step/7m path.
        for (radius, expected) in [
            (RadiusMask::none().with_angular(121.0), 120.0),
            (RadiusMask::none().with_angular(119.0), -1.0),
            (RadiusMask::none().with_steps(4).with_angular(121.0), 120.0),
            (RadiusMask::none().with_steps(3).with_angular(121.0), -1.0),
            (
                RadiusMask::none()
                    .with_steps(4)
                    .with_angular(121.0)
                    .with_walking(7.1),
                120.0,
            ),
            (
                RadiusMask::none()
                    .with_steps(4)
                    .with_angular(121.0)
                    .with_walking(6.9),
                -1.0,
            ),
        ] {
            let (d, _) = attraction_distance(
                &g,
                OriginType::Points,
                DistanceMode::Angular,
                radius,
                attractions(&attr),
                None,
                0.0,
                &NullProgress,
            )
            .unwrap();
            assert_close(&d, &[expected], 1e-3);
        }

        // The walking value is radius-insensitive while inside the mask.
        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none().with_angular(121.0),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[7.0], 1e-4);
        let (d, _) = attraction_distance(
            &g,
            OriginType::Points,
            DistanceMode::Walking,
            RadiusMask::none().with_angular(90.0),
            attractions(&attr),
            None,
            0.0,
            &NullProgress,
        )
        .unwrap();
        assert_close(&d, &[-1.0], 1e-4);
    }

    #[test]
    fn test_reach_constant() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0), Vec2::new(16.0, 0.0)];
        let values = [4.0f32, 3.0];
        let scores = attraction_reach(
            &g,
            OriginType::Points,
            DistanceMode::Undefined,
            RadiusMask::none(),
            WeightFunc::Constant,
            attractions(&attr),
            Some(&values),
            DistributionFunc::Divide,
            CollectionFunc::Average,
            &NullProgress,
        )
        .unwrap();
        assert_close(&scores, &[7.0; 5], 1e-4);

        let scores = attraction_reach(
            &g,
            OriginType::Lines,
            DistanceMode::Undefined,
            RadiusMask::none(),
            WeightFunc::Constant,
            attractions(&attr),
            Some(&values),
            DistributionFunc::Divide,
            CollectionFunc::Average,
            &NullProgress,
        )
        .unwrap();
        assert_close(&scores, &[7.0; 5], 1e-4);

        let scores = attraction_reach(
            &g,
            OriginType::Junctions,
            DistanceMode::Undefined,
            RadiusMask::none(),
            WeightFunc::Constant,
            attractions(&attr),
            Some(&values),
            DistributionFunc::Divide,
            CollectionFunc::Average,
            &NullProgress,
        )
        .unwrap();
        assert_close(&scores, &[7.0; 4], 1e-4);
    }

    #[test]
    fn test_reach_steps_radius_and_divide() {
        let g = chain_with_points(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0), Vec2::new(16.0, 0.0)];
        let values = [4.0f32, 3.0];
        let scores = attraction_reach(
            &g,
            OriginType::Points,
            DistanceMode::Undefined,
            RadiusMask::none().with_steps(2),
            WeightFunc::Constant,
            attractions(&attr),
            Some(&values),
            DistributionFunc::Divide,
            CollectionFunc::Average,
            &NullProgress,
        )
        .unwrap();
        assert_close(&scores, &[4.0, 4.0, 7.0, 3.0, 3.0], 1e-4);

        let scores = attraction_reach(
            &g,
            OriginType::Points,
            DistanceMode::Steps,
            RadiusMask::none().with_steps(2),
            WeightFunc::Divide { constant: 1.0 },
            attractions(&attr),
            Some(&values),
            DistributionFunc::Divide,
            CollectionFunc::Average,
            &NullProgress,
        )
        .unwrap();
        assert_close(&scores, &[4.0, 2.0, 4.0 / 3.0 + 1.0, 1.5, 3.0], 1e-4);
    }

    /// Region origins: one square polygon above each line, sampled along its
    /// outline.
    fn region_chain(n: u32, length: f64) -> AxialGraph {
        let pts: Vec<Vec2> = (0..=n)
            .map(|i| Vec2::new(i as f64 * length, 0.0))
            .collect();
        let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
        let half = length / 4.0;
        let mut corners: Vec<Vec2> = Vec::new();
        for i in 0..n {
            let c = (0.5 + i as f64) * length;
            corners.push(Vec2::new(c - half, 1.0 + half * 2.0));
            corners.push(Vec2::new(c + half, 1.0 + half * 2.0));
            corners.push(Vec2::new(c + half, 1.0));
            corners.push(Vec2::new(c - half, 1.0));
        }
        let counts = vec![4u32; n as usize];
        AxialGraph::build(
            &pts,
            &pairs,
            &[],
            &corners,
            Some(&counts),
            half / 2.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap()
    }

    #[test]
    fn test_reach_point_group_origins() {
        let g = region_chain(5, 3.0);
        let attr = [Vec2::new(-1.0, 0.0), Vec2::new(16.0, 0.0)];
        let values = [4.0f32, 3.0];
        let scores = attraction_reach(
            &g,
            OriginType::PointGroups,
            DistanceMode::Undefined,
            RadiusMask::none(),
            WeightFunc::Constant,
            attractions(&attr),
            Some(&values),
            DistributionFunc::Divide,
            CollectionFunc::Average,
            &NullProgress,
        )
        .unwrap();
        assert_close(&scores, &[7.0; 5], 1e-4);
    }

    #[test]
    fn test_reach_polygon_attraction_distributions() {
        let g = region_chain(5, 3.0);
        let corners = [
            Vec2::new(-2.0, 0.0),
            Vec2::new(-1.0, 0.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(-2.0, -1.0),
            Vec2::new(16.0, 0.0),
            Vec2::new(17.0, 0.0),
            Vec2::new(17.0, -1.0),
            Vec2::new(16.0, -1.0),
        ];
        let set = AttractionSet {
            points: &corners,
            points_per_polygon: Some(&[4, 4]),
            polygon_point_interval: 0.5,
        };
        let values = [4.0f32, 3.0];
        for distribution in [DistributionFunc::Divide, DistributionFunc::Copy] {
            let scores = attraction_reach(
                &g,
                OriginType::PointGroups,
                DistanceMode::Undefined,
                RadiusMask::none(),
                WeightFunc::Constant,
                set,
                Some(&values),
                distribution,
                CollectionFunc::Average,
                &NullProgress,
            )
            .unwrap();
            assert_close(&scores, &[7.0; 5], 1e-4);
        }
    }

    #[test]
    fn test_weight_funcs() {
        assert_eq!(WeightFunc::Constant.apply(5.0, Some(10.0)), 1.0);
        let pow = WeightFunc::Pow { constant: 2.0 };
        assert!((pow.apply(5.0, Some(10.0)) - 0.75).abs() < 1e-12);
        let divide = WeightFunc::Divide { constant: 1.0 };
        assert!((divide.apply(1.0, None) - 0.5).abs() < 1e-12);
        let curve = WeightFunc::Curve { constant: 2.0 };
        assert!((curve.apply(0.0, Some(1.0)) - 1.0).abs() < 1e-12);
        assert!((curve.apply(0.5, Some(1.0)) - 0.5).abs() < 1e-12);
        assert!(curve.apply(1.0, Some(1.0)).abs() < 1e-12);
    }
}
