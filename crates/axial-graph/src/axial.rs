//! Axial graph model and builder.
//!
//! The axial graph is the union of lines, junctions and optional attached
//! points. Junctions are implicit: one is created wherever at least two
//! lines share a common point after coordinate snapping, whether the shared
//! point is a clustered endpoint or an interior crossing (axial lines cross
//! mid-line). An unlink point coinciding with a junction consumes it: the
//! lines continue but no transition exists there.

use axial_core::geometry::{perpendicular_foot, segment_intersection, BoundingBox, Vec2};
use axial_core::{
    check_cancel, checked_entity_count, EngineError, EngineResult, GridIndex, GroupId, JunctionId,
    LineId, Meters, PointId, ProgressSink,
};
use hashbrown::HashMap;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One input line with its precomputed length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxialLine {
    pub p0: Vec2,
    pub p1: Vec2,
    pub length: f64,
}

impl AxialLine {
    #[inline]
    pub fn midpoint(&self) -> Vec2 {
        Vec2::new((self.p0.x + self.p1.x) * 0.5, (self.p0.y + self.p1.y) * 0.5)
    }

    #[inline]
    pub fn direction(&self) -> Vec2 {
        self.p1.sub(self.p0)
    }

    #[inline]
    pub fn point_at(&self, t: f64) -> Vec2 {
        axial_core::geometry::point_on_segment(self.p0, self.p1, t)
    }
}

/// A junction: a position plus the lines incident to it, each with the
/// parameter of the junction along that line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crossing {
    pub position: Vec2,
    pub lines: Vec<(LineId, f64)>,
}

/// An exogenous point attached to its nearest line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedPoint {
    pub position: Vec2,
    pub line: LineId,
    /// Foot parameter along the attached line.
    pub t: f64,
    /// Perpendicular walking distance from the point to the foot.
    pub offset: f64,
    pub group: Option<GroupId>,
}

/// Entity counts reported through the FFI info call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub line_count: u32,
    pub crossing_count: u32,
    pub point_count: u32,
    pub point_group_count: u32,
}

/// Build tolerances. Defaults match the engine's historical behavior on
/// metric data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxialBuildConfig {
    /// Endpoint/crossing clustering tolerance.
    pub snap_tolerance: Meters,
    /// Unlink-to-junction matching tolerance.
    pub unlink_tolerance: Meters,
}

impl Default for AxialBuildConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: Meters(1e-3),
            unlink_tolerance: Meters(1e-3),
        }
    }
}

/// Immutable axial graph handle.
#[derive(Debug, Clone)]
pub struct AxialGraph {
    lines: Vec<AxialLine>,
    degenerate: Vec<bool>,
    junctions: Vec<Crossing>,
    /// Per line: `(t, junction)` sorted by `t`.
    line_crossings: Vec<Vec<(f64, JunctionId)>>,
    points: Vec<AttachedPoint>,
    /// Per line: attached point ids.
    line_points: Vec<Vec<PointId>>,
    /// Point-id ranges per group, contiguous by construction.
    groups: Vec<Range<u32>>,
    /// Broad-phase index over the lines, kept for analysis-time attachment
    /// of attraction and origin points.
    line_grid: GridIndex,
}

impl AxialGraph {
    /// Build the graph from raw coordinate soup.
    ///
    /// `line_coords` holds the distinct coordinates, `line_pairs` indexes
    /// pairs of them (`[a0, b0, a1, b1, ...]`). Points may be raw, or
    /// polygon corners together with `points_per_polygon`, in which case the
    /// actual graph points are sampled along the polygon perimeters every
    /// `polygon_point_interval` and tagged with their polygon group.
    pub fn build(
        line_coords: &[Vec2],
        line_pairs: &[(u32, u32)],
        unlinks: &[Vec2],
        points: &[Vec2],
        points_per_polygon: Option<&[u32]>,
        polygon_point_interval: f64,
        config: AxialBuildConfig,
        progress: &dyn ProgressSink,
    ) -> EngineResult<Self> {
        if line_pairs.is_empty() {
            return Err(EngineError::BadInput("at least one line is required".into()));
        }
        checked_entity_count(line_pairs.len(), "line")?;

        let mut lines = Vec::with_capacity(line_pairs.len());
        let mut degenerate = vec![false; line_pairs.len()];
        for (i, &(a, b)) in line_pairs.iter().enumerate() {
            let p0 = *line_coords.get(a as usize).ok_or_else(|| {
                EngineError::BadInput(format!("line {i} references coordinate {a} out of range"))
            })?;
            let p1 = *line_coords.get(b as usize).ok_or_else(|| {
                EngineError::BadInput(format!("line {i} references coordinate {b} out of range"))
            })?;
            let length = p0.distance(p1);
            if length <= config.snap_tolerance.value() {
                // Zero-length line: kept so indices stay contiguous, but it
                // takes no part in junction detection.
                progress.log(
                    axial_core::LogLevel::Warning,
                    Some("graph"),
                    &format!("dropping zero-length line {i} from junction detection"),
                );
                degenerate[i] = true;
            }
            lines.push(AxialLine { p0, p1, length });
        }
        check_cancel(progress, Some("Indexing lines"), 0.1)?;

        let (junctions, line_crossings) =
            detect_junctions(&lines, &degenerate, unlinks, &config, progress)?;
        check_cancel(progress, Some("Attaching points"), 0.6)?;

        // Polygon-sampled points are emitted first, tagged per polygon.
        let (expanded_points, groups) = match points_per_polygon {
            Some(counts) => sample_polygon_points(points, counts, polygon_point_interval)?,
            None => (points.to_vec(), Vec::new()),
        };
        checked_entity_count(expanded_points.len(), "point")?;

        let mut attached = Vec::with_capacity(expanded_points.len());
        let mut line_points = vec![Vec::new(); lines.len()];
        let index = line_index(&lines, &degenerate);
        if !expanded_points.is_empty() {
            for (i, &p) in expanded_points.iter().enumerate() {
                let (line, t, offset) = attach_point(&lines, &index, p).ok_or_else(|| {
                    EngineError::BadInput(format!("point {i} has no line to attach to"))
                })?;
                line_points[line.index()].push(PointId::new(i as u32));
                attached.push(AttachedPoint {
                    position: p,
                    line,
                    t,
                    offset,
                    group: group_of(&groups, i as u32),
                });
                if i % 1024 == 0 {
                    check_cancel(
                        progress,
                        Some("Attaching points"),
                        0.6 + 0.4 * (i as f32 / expanded_points.len().max(1) as f32),
                    )?;
                }
            }
        }

        Ok(Self {
            lines,
            degenerate,
            junctions,
            line_crossings,
            points: attached,
            line_points,
            groups,
            line_grid: index,
        })
    }

    /// Attach an arbitrary position to its nearest line, the same way build
    /// time points are attached. Returns `(line, foot parameter,
    /// perpendicular distance)`.
    pub fn attach(&self, p: Vec2) -> Option<(LineId, f64, f64)> {
        attach_point(&self.lines, &self.line_grid, p)
    }

    pub fn info(&self) -> GraphInfo {
        GraphInfo {
            line_count: self.lines.len() as u32,
            crossing_count: self.junctions.len() as u32,
            point_count: self.points.len() as u32,
            point_group_count: self.groups.len() as u32,
        }
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn line(&self, id: LineId) -> &AxialLine {
        &self.lines[id.index()]
    }

    #[inline]
    pub fn lines(&self) -> &[AxialLine] {
        &self.lines
    }

    #[inline]
    pub fn is_degenerate(&self, id: LineId) -> bool {
        self.degenerate[id.index()]
    }

    #[inline]
    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    #[inline]
    pub fn junction(&self, id: JunctionId) -> &Crossing {
        &self.junctions[id.index()]
    }

    #[inline]
    pub fn junctions(&self) -> &[Crossing] {
        &self.junctions
    }

    /// Crossings on a line, sorted by parameter.
    #[inline]
    pub fn crossings_of(&self, line: LineId) -> &[(f64, JunctionId)] {
        &self.line_crossings[line.index()]
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn point(&self, id: PointId) -> &AttachedPoint {
        &self.points[id.index()]
    }

    #[inline]
    pub fn points(&self) -> &[AttachedPoint] {
        &self.points
    }

    #[inline]
    pub fn points_on(&self, line: LineId) -> &[PointId] {
        &self.line_points[line.index()]
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Point-id range of a group.
    pub fn group_points(&self, group: GroupId) -> Range<u32> {
        self.groups[group.index()].clone()
    }

    pub fn line_lengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.lines.iter().map(|l| l.length)
    }

    pub fn junction_positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.junctions.iter().map(|j| j.position)
    }
}

fn group_of(groups: &[Range<u32>], point: u32) -> Option<GroupId> {
    groups
        .iter()
        .position(|r| r.contains(&point))
        .map(|g| GroupId::new(g as u32))
}

/// Sample polygon perimeters into points, one contiguous id range per
/// polygon. The walk starts at vertex 0 (included) and emits a point every
/// `interval` of arc length along the closed outline.
pub fn sample_polygon_points(
    corners: &[Vec2],
    points_per_polygon: &[u32],
    interval: f64,
) -> EngineResult<(Vec<Vec2>, Vec<Range<u32>>)> {
    if interval <= 0.0 {
        return Err(EngineError::BadInput(
            "polygon point interval must be positive".into(),
        ));
    }
    let total: usize = points_per_polygon.iter().map(|&c| c as usize).sum();
    if total != corners.len() {
        return Err(EngineError::BadInput(format!(
            "polygon corner counts sum to {total} but {} coordinates were supplied",
            corners.len()
        )));
    }

    let mut points = Vec::new();
    let mut groups = Vec::with_capacity(points_per_polygon.len());
    let mut offset = 0usize;
    for &count in points_per_polygon {
        let count = count as usize;
        let ring = &corners[offset..offset + count];
        offset += count;
        let start = points.len() as u32;
        if count >= 2 {
            // Distance left until the next emission; starts at zero so the
            // first vertex is always emitted.
            let mut until_next = 0.0;
            for i in 0..count {
                let a = ring[i];
                let b = ring[(i + 1) % count];
                let edge_len = a.distance(b);
                if edge_len <= f64::EPSILON {
                    continue;
                }
                let dir = b.sub(a).scale(1.0 / edge_len);
                let mut travelled = 0.0;
                // Strict bound: an emission landing exactly on the edge end
                // belongs to the next edge (and never duplicates the ring
                // start on close).
                while until_next < edge_len - travelled {
                    travelled += until_next;
                    points.push(a.add(dir.scale(travelled)));
                    until_next = interval;
                }
                until_next -= edge_len - travelled;
            }
        } else if count == 1 {
            points.push(ring[0]);
        }
        groups.push(start..points.len() as u32);
    }
    Ok((points, groups))
}

/// Broad-phase index over non-degenerate lines, sized to the mean line
/// length.
fn line_index(lines: &[AxialLine], degenerate: &[bool]) -> GridIndex {
    let mut bounds = BoundingBox::empty();
    let mut total_len = 0.0;
    let mut counted = 0usize;
    for (line, &skip) in lines.iter().zip(degenerate) {
        bounds.grow(line.p0);
        bounds.grow(line.p1);
        if !skip {
            total_len += line.length;
            counted += 1;
        }
    }
    let cell = if counted > 0 {
        (total_len / counted as f64).max(1e-3)
    } else {
        1.0
    };
    let mut grid = GridIndex::new(bounds, cell);
    for (i, (line, &skip)) in lines.iter().zip(degenerate).enumerate() {
        if skip {
            continue;
        }
        let bb = BoundingBox::from_points([line.p0, line.p1]);
        grid.insert(i as u32, &bb);
    }
    grid
}

/// Nearest line for a point: broad phase through the grid with a growing
/// search radius, exact phase by perpendicular-foot distance.
fn attach_point(
    lines: &[AxialLine],
    index: &GridIndex,
    p: Vec2,
) -> Option<(LineId, f64, f64)> {
    let mut radius = index.cell_size();
    for _ in 0..32 {
        let candidates = index.query_around(p, radius);
        let mut best: Option<(LineId, f64, f64)> = None;
        for id in candidates {
            let line = &lines[id as usize];
            let (t, _foot, dist) = perpendicular_foot(p, line.p0, line.p1);
            if best.as_ref().map_or(true, |b| dist < b.2) {
                best = Some((LineId::new(id), t, dist));
            }
        }
        match best {
            // A hit further out than the query radius may hide a closer line
            // in an unvisited cell; widen and retry.
            Some(hit) if hit.2 <= radius => return Some(hit),
            _ => radius *= 2.0,
        }
    }
    // Fall back to a full scan for pathological layouts.
    let mut best: Option<(LineId, f64, f64)> = None;
    for (i, line) in lines.iter().enumerate() {
        if line.length <= 0.0 {
            continue;
        }
        let (t, _foot, dist) = perpendicular_foot(p, line.p0, line.p1);
        if best.as_ref().map_or(true, |b| dist < b.2) {
            best = Some((LineId::new(i as u32), t, dist));
        }
    }
    best
}

/// Cluster key for snapped positions.
#[inline]
fn snap_key(p: Vec2, tolerance: f64) -> (i64, i64) {
    (
        (p.x / tolerance).round() as i64,
        (p.y / tolerance).round() as i64,
    )
}

/// Junction detection: endpoint clusters plus interior crossings, then
/// unlink consumption.
fn detect_junctions(
    lines: &[AxialLine],
    degenerate: &[bool],
    unlinks: &[Vec2],
    config: &AxialBuildConfig,
    progress: &dyn ProgressSink,
) -> EngineResult<(Vec<Crossing>, Vec<Vec<(f64, JunctionId)>>)> {
    // Incidence record: a line touches a position at parameter t. Records
    // are clustered by snapped position; a cluster touching ≥2 distinct
    // lines becomes a junction. Neighboring snap cells are merged through a
    // union-find so points straddling a cell boundary still cluster.
    struct Record {
        line: u32,
        t: f64,
        position: Vec2,
    }

    let snap_tolerance = config.snap_tolerance.value();
    let unlink_tolerance = config.unlink_tolerance.value();
    let mut records: Vec<Record> = Vec::with_capacity(lines.len() * 2);
    for (i, (line, &skip)) in lines.iter().zip(degenerate).enumerate() {
        if skip {
            continue;
        }
        records.push(Record {
            line: i as u32,
            t: 0.0,
            position: line.p0,
        });
        records.push(Record {
            line: i as u32,
            t: 1.0,
            position: line.p1,
        });
    }

    // Interior crossings via grid broad phase over line pairs.
    let grid = line_index(lines, degenerate);
    for (i, line) in lines.iter().enumerate() {
        if degenerate[i] {
            continue;
        }
        let bb = BoundingBox::from_points([line.p0, line.p1]);
        for j in grid.query_dedup(&bb) {
            let j = j as usize;
            if j <= i {
                continue;
            }
            let other = &lines[j];
            if let Some((ta, tb)) = segment_intersection(line.p0, line.p1, other.p0, other.p1) {
                let position = line.point_at(ta);
                records.push(Record {
                    line: i as u32,
                    t: ta,
                    position,
                });
                records.push(Record {
                    line: j as u32,
                    t: tb,
                    position,
                });
            }
        }
        if i % 1024 == 0 {
            check_cancel(
                progress,
                Some("Detecting junctions"),
                0.1 + 0.4 * (i as f32 / lines.len() as f32),
            )?;
        }
    }

    // Snap-cell clustering with neighbor merging.
    let mut cell_of: HashMap<(i64, i64), usize> = HashMap::new();
    for record in &records {
        let key = snap_key(record.position, snap_tolerance);
        let next = cell_of.len();
        cell_of.entry(key).or_insert(next);
    }
    let mut uf: UnionFind<usize> = UnionFind::new(cell_of.len());
    for (&(kx, ky), &cell) in &cell_of {
        for (dx, dy) in [(1i64, 0i64), (0, 1), (1, 1), (1, -1)] {
            if let Some(&other) = cell_of.get(&(kx + dx, ky + dy)) {
                uf.union(cell, other);
            }
        }
    }

    let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        let key = snap_key(record.position, snap_tolerance);
        let root = uf.find(cell_of[&key]);
        clusters.entry(root).or_default().push(idx);
    }

    // Deterministic junction order: by first record index in the cluster.
    let mut ordered: Vec<Vec<usize>> = clusters.into_values().collect();
    ordered.sort_by_key(|members| members.iter().copied().min());

    let mut junctions: Vec<Crossing> = Vec::new();
    let mut line_crossings: Vec<Vec<(f64, JunctionId)>> = vec![Vec::new(); lines.len()];
    'clusters: for members in ordered {
        let mut incident: Vec<(LineId, f64)> = Vec::new();
        let mut position = Vec2::default();
        for &idx in &members {
            let record = &records[idx];
            position = record.position;
            if !incident.iter().any(|(l, _)| l.value() == record.line) {
                incident.push((LineId::new(record.line), record.t));
            }
        }
        if incident.len() < 2 {
            continue;
        }
        // Unlink consumption: both lines continue, no transition here.
        for unlink in unlinks {
            if unlink.distance(position) <= unlink_tolerance {
                continue 'clusters;
            }
        }
        incident.sort_by_key(|(l, _)| l.value());
        let id = JunctionId::new(junctions.len() as u32);
        for &(line, t) in &incident {
            line_crossings[line.index()].push((t, id));
        }
        junctions.push(Crossing {
            position,
            lines: incident,
        });
    }

    for crossing_list in &mut line_crossings {
        crossing_list.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    Ok((junctions, line_crossings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axial_core::NullProgress;

    fn coords(values: &[(f64, f64)]) -> Vec<Vec2> {
        values.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
    }

    /// Chain of `n` lines of the given length along the x axis.
    pub(crate) fn chain_graph(n: u32, length: f64) -> AxialGraph {
        let pts: Vec<Vec2> = (0..=n)
            .map(|i| Vec2::new(i as f64 * length, 0.0))
            .collect();
        let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
        AxialGraph::build(
            &pts,
            &pairs,
            &[],
            &[],
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap()
    }

    #[test]
    fn test_chain_counts() {
        let g = chain_graph(5, 3.0);
        let info = g.info();
        assert_eq!(info.line_count, 5);
        assert_eq!(info.crossing_count, 4);
        assert_eq!(info.point_count, 0);
        assert!((g.line(LineId::new(0)).length - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_interior_crossing_and_unlink() {
        //   |
        // --|--
        //   |__
        let pts = coords(&[(0.0, 0.0), (2.0, 0.0), (1.0, 1.0), (1.0, -1.0), (2.0, -1.0)]);
        let pairs = [(0, 1), (2, 3), (3, 4)];

        let linked = AxialGraph::build(
            &pts,
            &pairs,
            &[],
            &[],
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap();
        // Interior crossing at (1,0) plus shared endpoint at (1,-1).
        assert_eq!(linked.info().crossing_count, 2);

        let unlinked = AxialGraph::build(
            &pts,
            &pairs,
            &[Vec2::new(1.0, 0.0)],
            &[Vec2::new(-1.0, 0.0)],
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap();
        let info = unlinked.info();
        assert_eq!(info.line_count, 3);
        assert_eq!(info.crossing_count, 1);
        assert_eq!(info.point_count, 1);
        let positions: Vec<Vec2> = unlinked.junction_positions().collect();
        assert_eq!(positions, vec![Vec2::new(1.0, -1.0)]);
    }

    #[test]
    fn test_unlink_consumes_exactly_matching_junction() {
        let g = chain_graph(3, 3.0);
        assert_eq!(g.info().crossing_count, 2);

        let pts: Vec<Vec2> = (0..=3).map(|i| Vec2::new(i as f64 * 3.0, 0.0)).collect();
        let pairs: Vec<(u32, u32)> = (0..3).map(|i| (i, i + 1)).collect();
        let g2 = AxialGraph::build(
            &pts,
            &pairs,
            &[Vec2::new(3.0, 0.0)],
            &[],
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(g2.info().crossing_count, 1);
    }

    #[test]
    fn test_point_attachment() {
        let g = AxialGraph::build(
            &coords(&[(0.0, 0.0), (3.0, 0.0)]),
            &[(0, 1)],
            &[],
            &coords(&[(1.5, 1.0), (-1.0, 0.0)]),
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap();
        let mid = g.point(PointId::new(0));
        assert_eq!(mid.line, LineId::new(0));
        assert!((mid.t - 0.5).abs() < 1e-9);
        assert!((mid.offset - 1.0).abs() < 1e-9);
        let clamped = g.point(PointId::new(1));
        assert_eq!(clamped.t, 0.0);
        assert!((clamped.offset - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_sampling_starts_at_first_vertex() {
        let ring = coords(&[(-1.1, 0.5), (-0.1, 0.5), (-0.1, -0.5), (-1.1, -0.5)]);
        let (points, groups) = sample_polygon_points(&ring, &[4], 0.5).unwrap();
        assert_eq!(groups.len(), 1);
        // Perimeter 4.0 sampled every 0.5 -> 8 points, first at vertex 0.
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], Vec2::new(-1.1, 0.5));
        assert!(points
            .iter()
            .any(|p| p.distance(Vec2::new(-0.1, 0.0)) < 1e-9));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = AxialGraph::build(
            &[],
            &[],
            &[],
            &[],
            None,
            0.0,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::BadInput(_)));
    }

    #[test]
    fn test_point_groups() {
        let ring = coords(&[(0.0, 2.0), (1.0, 2.0), (1.0, 3.0), (0.0, 3.0)]);
        let g = AxialGraph::build(
            &coords(&[(0.0, 0.0), (3.0, 0.0)]),
            &[(0, 1)],
            &[],
            &ring,
            Some(&[4]),
            0.5,
            AxialBuildConfig::default(),
            &NullProgress,
        )
        .unwrap();
        let info = g.info();
        assert_eq!(info.point_group_count, 1);
        assert_eq!(info.point_count, 8);
        assert_eq!(g.group_points(GroupId::new(0)), 0..8);
        assert_eq!(g.point(PointId::new(3)).group, Some(GroupId::new(0)));
    }
}
