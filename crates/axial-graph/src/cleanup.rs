//! Segment-map cleanup: polyline soup to a clean segment table.
//!
//! Pipeline: snap coincident endpoints, split at interior crossings (axial
//! and segment inputs; road center lines already meet at endpoints), drop
//! short dangling tails, merge colinear pairs across degree-2 nodes, filter
//! the unlink list down to points that still coincide with a crossing.

use axial_core::geometry::{perpendicular_foot, segment_intersection, BoundingBox, Vec2};
use axial_core::{check_cancel, EngineError, EngineResult, GridIndex, Meters, ProgressSink};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// What the input lines represent; decides whether interior crossings are
/// split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoadNetworkKind {
    Unknown = 0,
    AxialOrSegment = 1,
    RoadCenterLines = 2,
}

impl RoadNetworkKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::AxialOrSegment),
            2 => Some(Self::RoadCenterLines),
            _ => None,
        }
    }
}

/// Cleanup tolerances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Endpoint merge distance.
    pub snap: Meters,
    /// Extra slack when snapping a dangling endpoint onto a nearby segment
    /// interior.
    pub extrude: Meters,
    /// Minimum kept tail length at degree-1 endpoints.
    pub tail: Meters,
    /// Maximum perpendicular of the middle node for a 3-node colinear merge.
    pub deviation: Meters,
    pub kind: RoadNetworkKind,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            snap: Meters(1.0),
            extrude: Meters(0.0),
            tail: Meters(10.0),
            deviation: Meters(1.0),
            kind: RoadNetworkKind::AxialOrSegment,
        }
    }
}

/// One output segment: two indices into the point pool plus the source
/// polyline it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub p0: u32,
    pub p1: u32,
    pub base: u32,
}

/// Cleaned segment map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMap {
    pub points: Vec<Vec2>,
    pub segments: Vec<SegmentRecord>,
    pub unlinks: Vec<Vec2>,
}

struct WorkSegment {
    p0: Vec2,
    p1: Vec2,
    base: u32,
}

impl WorkSegment {
    fn length(&self) -> f64 {
        self.p0.distance(self.p1)
    }
}

/// Run the cleanup pipeline over polyline sections.
///
/// `coords` holds every polyline vertex back to back; `sections[i]` is the
/// vertex count of polyline `i`.
pub fn build_segment_map(
    coords: &[Vec2],
    sections: &[u32],
    unlinks: &[Vec2],
    config: &CleanupConfig,
    progress: &dyn ProgressSink,
) -> EngineResult<SegmentMap> {
    let total: usize = sections.iter().map(|&n| n as usize).sum();
    if total != coords.len() {
        return Err(EngineError::BadInput(format!(
            "section sizes sum to {total} but {} coordinates were supplied",
            coords.len()
        )));
    }
    if sections.is_empty() {
        return Err(EngineError::BadInput("at least one polyline is required".into()));
    }

    // 1. Explode polylines into working segments.
    let mut segments: Vec<WorkSegment> = Vec::new();
    let mut offset = 0usize;
    for (base, &count) in sections.iter().enumerate() {
        let count = count as usize;
        if count < 2 {
            progress.log(
                axial_core::LogLevel::Warning,
                Some("segmentmap"),
                &format!("polyline {base} has fewer than two vertices; skipped"),
            );
            offset += count;
            continue;
        }
        for i in 0..count - 1 {
            let p0 = coords[offset + i];
            let p1 = coords[offset + i + 1];
            if p0.distance(p1) > f64::EPSILON {
                segments.push(WorkSegment {
                    p0,
                    p1,
                    base: base as u32,
                });
            }
        }
        offset += count;
    }
    if segments.is_empty() {
        return Err(EngineError::BadInput("no non-degenerate segments in input".into()));
    }
    check_cancel(progress, Some("Snapping"), 0.1)?;

    let snap = config.snap.value();
    let extrude = config.extrude.value();
    let tail = config.tail.value();
    let deviation = config.deviation.value();

    // 2. Snap coincident endpoints to a shared representative.
    snap_endpoints(&mut segments, snap);

    // 2b. Extrude: pull near-miss dangling endpoints onto segment interiors.
    if extrude > 0.0 {
        extrude_endpoints(&mut segments, snap + extrude);
    }
    check_cancel(progress, Some("Splitting"), 0.3)?;

    // 3. Split at interior crossings (not for plain road center lines).
    if config.kind != RoadNetworkKind::RoadCenterLines {
        split_at_intersections(&mut segments, unlinks, snap, progress)?;
    }
    check_cancel(progress, Some("Trimming"), 0.6)?;

    // 4. Drop short dangling tails; cascades until stable.
    trim_tails(&mut segments, tail, snap);
    check_cancel(progress, Some("Merging"), 0.8)?;

    // 5. Colinear merge across degree-2 nodes.
    merge_colinear(&mut segments, deviation, snap);
    check_cancel(progress, Some("Emitting"), 0.95)?;

    // 6. Emit point pool + segment table, filter unlinks.
    let mut key_to_index: HashMap<(i64, i64), u32> = HashMap::new();
    let mut points: Vec<Vec2> = Vec::new();
    let tol = snap.max(1e-9);
    let mut intern = |p: Vec2| -> u32 {
        let key = ((p.x / tol).round() as i64, (p.y / tol).round() as i64);
        *key_to_index.entry(key).or_insert_with(|| {
            points.push(p);
            (points.len() - 1) as u32
        })
    };
    let records: Vec<SegmentRecord> = segments
        .iter()
        .map(|s| SegmentRecord {
            p0: intern(s.p0),
            p1: intern(s.p1),
            base: s.base,
        })
        .collect();

    let kept_unlinks = filter_unlinks(&segments, unlinks, snap);

    Ok(SegmentMap {
        points,
        segments: records,
        unlinks: kept_unlinks,
    })
}

fn snap_endpoints(segments: &mut [WorkSegment], snap: f64) {
    let tol = snap.max(1e-9);
    let mut representative: HashMap<(i64, i64), Vec2> = HashMap::new();
    let mut snap_point = |p: Vec2| -> Vec2 {
        let key = ((p.x / tol).round() as i64, (p.y / tol).round() as i64);
        *representative.entry(key).or_insert(p)
    };
    for seg in segments.iter_mut() {
        seg.p0 = snap_point(seg.p0);
        seg.p1 = snap_point(seg.p1);
    }
}

/// Endpoint degrees under exact position equality (valid after snapping).
fn endpoint_degrees(segments: &[WorkSegment]) -> HashMap<(u64, u64), u32> {
    let mut degrees: HashMap<(u64, u64), u32> = HashMap::new();
    for seg in segments {
        for p in [seg.p0, seg.p1] {
            *degrees.entry(exact_key(p)).or_insert(0) += 1;
        }
    }
    degrees
}

#[inline]
fn exact_key(p: Vec2) -> (u64, u64) {
    (p.x.to_bits(), p.y.to_bits())
}

/// Move degree-1 endpoints onto a nearby segment interior within `reach`.
fn extrude_endpoints(segments: &mut Vec<WorkSegment>, reach: f64) {
    let degrees = endpoint_degrees(segments);
    let candidates: Vec<(usize, bool)> = segments
        .iter()
        .enumerate()
        .flat_map(|(i, seg)| {
            [(i, true, seg.p0), (i, false, seg.p1)]
                .into_iter()
                .filter(|&(_, _, p)| degrees.get(&exact_key(p)) == Some(&1))
                .map(|(i, start, _)| (i, start))
                .collect::<Vec<_>>()
        })
        .collect();
    for (i, start) in candidates {
        let p = if start { segments[i].p0 } else { segments[i].p1 };
        let mut best: Option<(f64, Vec2)> = None;
        for (j, other) in segments.iter().enumerate() {
            if j == i {
                continue;
            }
            let (_, foot, dist) = perpendicular_foot(p, other.p0, other.p1);
            if dist <= reach && dist > f64::EPSILON && best.as_ref().map_or(true, |b| dist < b.0) {
                best = Some((dist, foot));
            }
        }
        if let Some((_, foot)) = best {
            if start {
                segments[i].p0 = foot;
            } else {
                segments[i].p1 = foot;
            }
        }
    }
}

fn split_at_intersections(
    segments: &mut Vec<WorkSegment>,
    unlinks: &[Vec2],
    snap: f64,
    progress: &dyn ProgressSink,
) -> EngineResult<()> {
    let mut bounds = BoundingBox::empty();
    let mut total_len = 0.0;
    for seg in segments.iter() {
        bounds.grow(seg.p0);
        bounds.grow(seg.p1);
        total_len += seg.length();
    }
    let cell = (total_len / segments.len() as f64).max(snap.max(1e-3));
    let mut grid = GridIndex::new(bounds, cell);
    for (i, seg) in segments.iter().enumerate() {
        grid.insert(i as u32, &BoundingBox::from_points([seg.p0, seg.p1]));
    }

    let mut cut_params: Vec<Vec<f64>> = vec![Vec::new(); segments.len()];
    let t_margin = |seg: &WorkSegment| {
        let len = seg.length();
        if len > f64::EPSILON {
            snap / len
        } else {
            0.5
        }
    };
    for i in 0..segments.len() {
        let bb = BoundingBox::from_points([segments[i].p0, segments[i].p1]);
        for j in grid.query_dedup(&bb) {
            let j = j as usize;
            if j <= i {
                continue;
            }
            let (a, b) = (&segments[i], &segments[j]);
            if let Some((ta, tb)) = segment_intersection(a.p0, a.p1, b.p0, b.p1) {
                let p = axial_core::geometry::point_on_segment(a.p0, a.p1, ta);
                if unlinks.iter().any(|u| u.distance(p) <= snap) {
                    continue;
                }
                let (ma, mb) = (t_margin(a), t_margin(b));
                if ta > ma && ta < 1.0 - ma {
                    cut_params[i].push(ta);
                }
                if tb > mb && tb < 1.0 - mb {
                    cut_params[j].push(tb);
                }
            }
        }
        if i % 1024 == 0 {
            check_cancel(progress, Some("Splitting"), 0.4)?;
        }
    }

    let mut out: Vec<WorkSegment> = Vec::with_capacity(segments.len());
    for (i, mut params) in cut_params.into_iter().enumerate() {
        let seg = &segments[i];
        if params.is_empty() {
            out.push(WorkSegment {
                p0: seg.p0,
                p1: seg.p1,
                base: seg.base,
            });
            continue;
        }
        params.sort_by(f64::total_cmp);
        params.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        let mut prev = seg.p0;
        for &t in &params {
            let p = axial_core::geometry::point_on_segment(seg.p0, seg.p1, t);
            out.push(WorkSegment {
                p0: prev,
                p1: p,
                base: seg.base,
            });
            prev = p;
        }
        out.push(WorkSegment {
            p0: prev,
            p1: seg.p1,
            base: seg.base,
        });
    }
    *segments = out;
    Ok(())
}

fn trim_tails(segments: &mut Vec<WorkSegment>, tail: f64, snap: f64) {
    if tail <= 0.0 {
        return;
    }
    loop {
        let degrees = endpoint_degrees(segments);
        let before = segments.len();
        segments.retain(|seg| {
            let dangling = degrees.get(&exact_key(seg.p0)) == Some(&1)
                || degrees.get(&exact_key(seg.p1)) == Some(&1);
            // A lone segment (both ends free) is kept; only true tails go.
            let lone = degrees.get(&exact_key(seg.p0)) == Some(&1)
                && degrees.get(&exact_key(seg.p1)) == Some(&1);
            !(dangling && !lone && seg.length() < tail.max(snap))
        });
        if segments.len() == before {
            break;
        }
    }
}

fn merge_colinear(segments: &mut Vec<WorkSegment>, deviation: f64, _snap: f64) {
    if deviation <= 0.0 {
        return;
    }
    loop {
        let degrees = endpoint_degrees(segments);
        // Node -> indices of the two incident segments, for degree-2 nodes.
        let mut at_node: HashMap<(u64, u64), Vec<usize>> = HashMap::new();
        for (i, seg) in segments.iter().enumerate() {
            for p in [seg.p0, seg.p1] {
                if degrees.get(&exact_key(p)) == Some(&2) {
                    at_node.entry(exact_key(p)).or_default().push(i);
                }
            }
        }

        // Competing merges resolve by lowest segment index first.
        let mut nodes: Vec<((u64, u64), Vec<usize>)> = at_node.into_iter().collect();
        nodes.sort_by_key(|(_, incident)| incident.iter().copied().min());

        let mut merged_away: Vec<bool> = vec![false; segments.len()];
        let mut merged_any = false;
        let mut additions: Vec<WorkSegment> = Vec::new();
        for (_, incident) in nodes {
            if incident.len() != 2 {
                continue;
            }
            let (i, j) = (incident[0], incident[1]);
            if i == j || merged_away[i] || merged_away[j] {
                continue;
            }
            let (a, b) = (&segments[i], &segments[j]);
            // Identify the shared middle node and the two outer endpoints.
            let (outer_a, middle) = if exact_key(a.p0) == exact_key(b.p0)
                || exact_key(a.p0) == exact_key(b.p1)
            {
                (a.p1, a.p0)
            } else {
                (a.p0, a.p1)
            };
            let outer_b = if exact_key(b.p0) == exact_key(middle) {
                b.p1
            } else if exact_key(b.p1) == exact_key(middle) {
                b.p0
            } else {
                continue;
            };
            if exact_key(outer_a) == exact_key(outer_b) {
                continue;
            }
            let (_, _, dist) = perpendicular_foot(middle, outer_a, outer_b);
            if dist <= deviation {
                merged_away[i] = true;
                merged_away[j] = true;
                merged_any = true;
                additions.push(WorkSegment {
                    p0: outer_a,
                    p1: outer_b,
                    // The longer piece decides the provenance of the merge.
                    base: if a.length() >= b.length() { a.base } else { b.base },
                });
            }
        }
        if !merged_any {
            break;
        }
        let mut out: Vec<WorkSegment> = Vec::with_capacity(segments.len());
        for (i, seg) in segments.drain(..).enumerate() {
            if !merged_away[i] {
                out.push(seg);
            }
        }
        out.extend(additions);
        *segments = out;
    }
}

/// Keep only unlink points that still coincide with a crossing between two
/// output segments.
fn filter_unlinks(segments: &[WorkSegment], unlinks: &[Vec2], snap: f64) -> Vec<Vec2> {
    unlinks
        .iter()
        .copied()
        .filter(|u| {
            let mut touching = 0;
            for seg in segments {
                let (_, _, dist) = perpendicular_foot(*u, seg.p0, seg.p1);
                if dist <= snap {
                    touching += 1;
                    if touching >= 2 {
                        return true;
                    }
                }
            }
            false
        })
        .collect()
}
