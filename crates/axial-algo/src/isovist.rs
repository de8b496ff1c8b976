//! Isovist engine: visibility polygons in a polygon obstacle field.
//!
//! The context indexes obstacle edges and attraction geometry once; each
//! query casts a ray fan from the origin. The free boundary is a regular
//! polygonal arc whose radius is enlarged so its area equals the true
//! view-distance disc.

use axial_core::geometry::{polygon_contains, polygon_signed_area, BoundingBox, Vec2};
use axial_core::{check_cancel, Degrees, EngineError, EngineResult, GridIndex, Meters, ProgressSink};
use serde::{Deserialize, Serialize};

/// Polygons grouped by source layer: `polygon_count_per_group` splits the
/// polygon list, `point_count_per_polygon` splits `coords`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolygonSet {
    pub polygon_count_per_group: Vec<u32>,
    pub point_count_per_polygon: Vec<u32>,
    pub coords: Vec<Vec2>,
}

impl PolygonSet {
    fn validate(&self, what: &str) -> EngineResult<()> {
        let polygons: usize = self.polygon_count_per_group.iter().map(|&c| c as usize).sum();
        if polygons != self.point_count_per_polygon.len() {
            return Err(EngineError::BadInput(format!(
                "{what}: group counts sum to {polygons} but {} polygons are described",
                self.point_count_per_polygon.len()
            )));
        }
        let points: usize = self.point_count_per_polygon.iter().map(|&c| c as usize).sum();
        if points != self.coords.len() {
            return Err(EngineError::BadInput(format!(
                "{what}: polygon sizes sum to {points} but {} coordinates were supplied",
                self.coords.len()
            )));
        }
        Ok(())
    }
}

/// Points grouped by source layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointSet {
    pub point_count_per_group: Vec<u32>,
    pub coords: Vec<Vec2>,
}

impl PointSet {
    fn validate(&self, what: &str) -> EngineResult<()> {
        let points: usize = self.point_count_per_group.iter().map(|&c| c as usize).sum();
        if points != self.coords.len() {
            return Err(EngineError::BadInput(format!(
                "{what}: group counts sum to {points} but {} coordinates were supplied",
                self.coords.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ObstacleEdge {
    a: Vec2,
    b: Vec2,
    /// Global polygon index within the obstacle set.
    polygon: u32,
}

/// Precomputed obstacle/attraction acceleration for isovist queries.
///
/// Read-only after construction; usable from concurrent queries.
pub struct IsovistContext {
    edges: Vec<ObstacleEdge>,
    edge_grid: Option<GridIndex>,
    /// Per obstacle polygon: owning group.
    obstacle_groups: Vec<u32>,
    obstacle_group_count: usize,
    attraction_points: PointSet,
    attraction_polygons: PolygonSet,
    /// Centroid per attraction polygon.
    attraction_centroids: Vec<Vec2>,
}

/// Split a polygon set into per-polygon coordinate slices.
fn polygon_slices(set: &PolygonSet) -> Vec<(u32, std::ops::Range<usize>)> {
    let mut out = Vec::with_capacity(set.point_count_per_polygon.len());
    let mut polygon = 0usize;
    let mut offset = 0usize;
    for (group, &count) in set.polygon_count_per_group.iter().enumerate() {
        for _ in 0..count {
            let size = set.point_count_per_polygon[polygon] as usize;
            out.push((group as u32, offset..offset + size));
            polygon += 1;
            offset += size;
        }
    }
    out
}

impl IsovistContext {
    pub fn new(
        obstacles: PolygonSet,
        attraction_points: PointSet,
        attraction_polygons: PolygonSet,
        progress: &dyn ProgressSink,
    ) -> EngineResult<Self> {
        obstacles.validate("obstacle polygons")?;
        attraction_points.validate("attraction points")?;
        attraction_polygons.validate("attraction polygons")?;

        let mut edges = Vec::new();
        let mut obstacle_groups = Vec::new();
        let mut bounds = BoundingBox::empty();
        for (polygon_index, (group, range)) in polygon_slices(&obstacles).iter().enumerate() {
            obstacle_groups.push(*group);
            let ring = &obstacles.coords[range.clone()];
            for i in 0..ring.len() {
                let a = ring[i];
                let b = ring[(i + 1) % ring.len()];
                if a.distance(b) <= f64::EPSILON {
                    continue;
                }
                bounds.grow(a);
                bounds.grow(b);
                edges.push(ObstacleEdge {
                    a,
                    b,
                    polygon: polygon_index as u32,
                });
            }
        }
        check_cancel(progress, Some("Indexing obstacles"), 0.5)?;

        let edge_grid = if bounds.is_valid() && !edges.is_empty() {
            let extent = bounds.width().max(bounds.height()).max(1.0);
            let mut grid = GridIndex::new(bounds, extent / 64.0);
            for (i, edge) in edges.iter().enumerate() {
                grid.insert(i as u32, &BoundingBox::from_points([edge.a, edge.b]));
            }
            Some(grid)
        } else {
            None
        };

        let attraction_centroids = polygon_slices(&attraction_polygons)
            .iter()
            .map(|(_, range)| {
                let ring = &attraction_polygons.coords[range.clone()];
                let n = ring.len().max(1) as f64;
                let sum = ring
                    .iter()
                    .fold(Vec2::default(), |acc, &p| acc.add(p));
                sum.scale(1.0 / n)
            })
            .collect();

        Ok(Self {
            edges,
            edge_grid,
            obstacle_groups,
            obstacle_group_count: obstacles.polygon_count_per_group.len(),
            attraction_points,
            attraction_polygons,
            attraction_centroids,
        })
    }

    pub fn obstacle_group_count(&self) -> usize {
        self.obstacle_group_count
    }
}

/// Query parameters for one isovist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IsovistQuery {
    pub origin: Vec2,
    pub max_view_distance: Meters,
    /// Field of view, (0°, 360°].
    pub field_of_view: Degrees,
    /// Look direction, counter-clockwise from +x.
    pub direction: Degrees,
    /// Free-boundary resolution: evenly spaced perimeter rays per full
    /// circle.
    pub perimeter_segment_count: u32,
}

/// One isovist result: the boundary polygon plus the visible entities per
/// group of each indexed class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Isovist {
    /// Boundary vertices in clockwise order.
    pub polygon: Vec<Vec2>,
    pub area: f64,
    pub visible_obstacles: Vec<Vec<u32>>,
    pub visible_attraction_points: Vec<Vec<u32>>,
    pub visible_attraction_polygons: Vec<Vec<u32>>,
}

/// Perimeter radius multiplier that makes the S-gon arc area equal the true
/// disc.
pub fn perimeter_enlargement(segment_count: u32) -> f64 {
    let s = segment_count.max(3) as f64;
    let half = std::f64::consts::PI / s;
    (std::f64::consts::PI / (s * half.sin() * half.cos())).sqrt()
}

/// Nearest forward intersection of the ray `origin + t·dir` with an edge.
fn ray_edge_hit(origin: Vec2, dir: Vec2, edge: &ObstacleEdge) -> Option<f64> {
    let seg = edge.b.sub(edge.a);
    let denom = dir.cross(seg);
    if denom.abs() <= f64::EPSILON {
        return None;
    }
    let diff = edge.a.sub(origin);
    let t = diff.cross(seg) / denom;
    let s = diff.cross(dir) / denom;
    const S_EPS: f64 = 1e-12;
    if t >= 1e-9 && (-S_EPS..=1.0 + S_EPS).contains(&s) {
        Some(t)
    } else {
        None
    }
}

pub fn calculate_isovist(
    ctx: &IsovistContext,
    query: &IsovistQuery,
    progress: &dyn ProgressSink,
) -> EngineResult<Isovist> {
    let radius = query.max_view_distance.value();
    if radius <= 0.0 {
        return Err(EngineError::BadInput("max view distance must be positive".into()));
    }
    let fov = query.field_of_view.value();
    if !(fov > 0.0 && fov <= 360.0) {
        return Err(EngineError::BadInput(
            "field of view must be in (0, 360] degrees".into(),
        ));
    }
    let full_circle = fov >= 360.0 - 1e-9;
    let look = query.direction.value();
    let enlarged = radius * perimeter_enlargement(query.perimeter_segment_count);
    let origin = query.origin;

    // Broad phase: obstacle edges within the view distance.
    let candidates: Vec<u32> = match &ctx.edge_grid {
        Some(grid) => grid.query_around(origin, radius),
        None => Vec::new(),
    };
    check_cancel(progress, Some("Casting rays"), 0.2)?;

    // Ray set: evenly spaced perimeter angles plus one ray per candidate
    // edge endpoint (with hair rays either side to catch silhouettes).
    let mut angles: Vec<f64> = Vec::new();
    let step = 360.0 / query.perimeter_segment_count.max(3) as f64;
    if full_circle {
        let mut a = look;
        for _ in 0..query.perimeter_segment_count.max(3) {
            angles.push(normalize_relative(a - look));
            a += step;
        }
    } else {
        let half = fov * 0.5;
        let count = ((fov / step).ceil() as u32).max(1);
        for k in 0..=count {
            angles.push(-half + fov * k as f64 / count as f64);
        }
    }
    const HAIR: f64 = 1e-4;
    for &ei in &candidates {
        let edge = &ctx.edges[ei as usize];
        for p in [edge.a, edge.b] {
            let rel = normalize_relative(p.sub(origin).angle_degrees() - look);
            for offset in [-HAIR, 0.0, HAIR] {
                let a = rel + offset;
                if full_circle || a.abs() <= fov * 0.5 {
                    angles.push(normalize_relative(a));
                }
            }
        }
    }
    // Clockwise boundary: descending relative angle.
    angles.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    angles.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let mut polygon: Vec<Vec2> = Vec::new();
    let mut hit_polygons: Vec<bool> = vec![false; ctx.obstacle_groups.len()];
    if !full_circle {
        polygon.push(origin);
    }
    for &rel in &angles {
        let angle = (look + rel).to_radians();
        let dir = Vec2::new(angle.cos(), angle.sin());
        let mut nearest: Option<(f64, u32)> = None;
        for &ei in &candidates {
            let edge = &ctx.edges[ei as usize];
            if let Some(t) = ray_edge_hit(origin, dir, edge) {
                if t <= radius && nearest.map_or(true, |(best, _)| t < best) {
                    nearest = Some((t, edge.polygon));
                }
            }
        }
        match nearest {
            Some((t, polygon_index)) => {
                hit_polygons[polygon_index as usize] = true;
                polygon.push(origin.add(dir.scale(t)));
            }
            // Free boundary: the enlarged perimeter arc.
            None => polygon.push(origin.add(dir.scale(enlarged))),
        }
    }
    check_cancel(progress, Some("Collecting visibility"), 0.8)?;

    let area = polygon_signed_area(&polygon).abs();

    // Visible entity enumeration per class, grouped.
    let mut visible_obstacles: Vec<Vec<u32>> =
        vec![Vec::new(); ctx.obstacle_group_count()];
    for (polygon_index, &hit) in hit_polygons.iter().enumerate() {
        if hit {
            let group = ctx.obstacle_groups[polygon_index] as usize;
            visible_obstacles[group].push(polygon_index as u32);
        }
    }

    let mut visible_attraction_points: Vec<Vec<u32>> =
        vec![Vec::new(); ctx.attraction_points.point_count_per_group.len()];
    let mut point_index = 0usize;
    for (group, &count) in ctx
        .attraction_points
        .point_count_per_group
        .iter()
        .enumerate()
    {
        for _ in 0..count {
            let p = ctx.attraction_points.coords[point_index];
            if p.distance(origin) <= enlarged && polygon_contains(&polygon, p) {
                visible_attraction_points[group].push(point_index as u32);
            }
            point_index += 1;
        }
    }

    let mut visible_attraction_polygons: Vec<Vec<u32>> =
        vec![Vec::new(); ctx.attraction_polygons.polygon_count_per_group.len()];
    for (polygon_index, (group, _)) in polygon_slices(&ctx.attraction_polygons)
        .iter()
        .enumerate()
    {
        let centroid = ctx.attraction_centroids[polygon_index];
        if centroid.distance(origin) <= enlarged && polygon_contains(&polygon, centroid) {
            visible_attraction_polygons[*group as usize].push(polygon_index as u32);
        }
    }

    Ok(Isovist {
        polygon,
        area,
        visible_obstacles,
        visible_attraction_points,
        visible_attraction_polygons,
    })
}

/// Normalize an angle to (-180, 180].
fn normalize_relative(mut degrees: f64) -> f64 {
    while degrees > 180.0 {
        degrees -= 360.0;
    }
    while degrees <= -180.0 {
        degrees += 360.0;
    }
    degrees
}
