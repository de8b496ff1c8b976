//! 2-D geometry primitives.
//!
//! Pure functions over `f64` coordinates: segment/segment intersection with
//! parametric positions, perpendicular feet, signed polygon area, convex
//! hulls and axis-aligned bounding boxes. Everything here is allocation-free
//! except the hull, which returns its vertex list.

use serde::{Deserialize, Serialize};

/// A point or direction in the planar metric coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    #[inline]
    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    #[inline]
    pub fn scale(self, s: f64) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product (signed parallelogram area).
    #[inline]
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f64 {
        self.sub(other).length()
    }

    /// Unit direction, or zero for a degenerate vector.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f64::EPSILON {
            Vec2::default()
        } else {
            self.scale(1.0 / len)
        }
    }

    /// Angle of this direction in degrees, counter-clockwise from +x.
    #[inline]
    pub fn angle_degrees(self) -> f64 {
        self.y.atan2(self.x).to_degrees()
    }
}

/// Unsigned angle between two directions, degrees in [0, 180].
pub fn angle_between_degrees(a: Vec2, b: Vec2) -> f64 {
    let la = a.length();
    let lb = b.length();
    if la <= f64::EPSILON || lb <= f64::EPSILON {
        return 0.0;
    }
    let cos = (a.dot(b) / (la * lb)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Acute crossing angle between two undirected lines, degrees in [0, 90].
pub fn line_crossing_angle_degrees(a: Vec2, b: Vec2) -> f64 {
    let angle = angle_between_degrees(a, b);
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

/// Intersection of segments `a0-a1` and `b0-b1`.
///
/// Returns the parametric positions `(ta, tb)` with both in [0, 1] when the
/// closed segments intersect in a single point. Parallel and colinear pairs
/// return `None`; overlap handling belongs to the cleanup pipeline, which
/// snaps endpoints first.
pub fn segment_intersection(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> Option<(f64, f64)> {
    let da = a1.sub(a0);
    let db = b1.sub(b0);
    let denom = da.cross(db);
    if denom.abs() <= f64::EPSILON {
        return None;
    }
    let diff = b0.sub(a0);
    let ta = diff.cross(db) / denom;
    let tb = diff.cross(da) / denom;
    const T_EPS: f64 = 1e-12;
    if (-T_EPS..=1.0 + T_EPS).contains(&ta) && (-T_EPS..=1.0 + T_EPS).contains(&tb) {
        Some((ta.clamp(0.0, 1.0), tb.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Point on segment `p0-p1` at parameter `t`.
#[inline]
pub fn point_on_segment(p0: Vec2, p1: Vec2, t: f64) -> Vec2 {
    p0.add(p1.sub(p0).scale(t))
}

/// Perpendicular foot of `p` on segment `p0-p1`, clamped to the segment.
///
/// Returns `(t, foot, distance)` where `t` is the clamped parameter.
pub fn perpendicular_foot(p: Vec2, p0: Vec2, p1: Vec2) -> (f64, Vec2, f64) {
    let d = p1.sub(p0);
    let len_sq = d.dot(d);
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (p.sub(p0).dot(d) / len_sq).clamp(0.0, 1.0)
    };
    let foot = point_on_segment(p0, p1, t);
    (t, foot, p.distance(foot))
}

/// Signed area of a polygon (positive for counter-clockwise winding).
pub fn polygon_signed_area(points: &[Vec2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.cross(b);
    }
    sum * 0.5
}

/// Is `p` inside (or on the boundary of) the polygon? Even-odd rule.
pub fn polygon_contains(points: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let pi = points[i];
        let pj = points[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Convex hull (Andrew monotone chain), counter-clockwise, no repeated
/// endpoint. Degenerate inputs return fewer than 3 vertices.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    let n = pts.len();
    if n < 3 {
        return pts;
    }

    fn sweep<'a>(iter: impl Iterator<Item = &'a Vec2>) -> Vec<Vec2> {
        let mut chain: Vec<Vec2> = Vec::new();
        for &p in iter {
            while chain.len() >= 2 {
                let a = chain[chain.len() - 2];
                let b = chain[chain.len() - 1];
                if b.sub(a).cross(p.sub(a)) <= 0.0 {
                    chain.pop();
                } else {
                    break;
                }
            }
            chain.push(p);
        }
        chain
    }

    let mut lower = sweep(pts.iter());
    let mut upper = sweep(pts.iter().rev());
    // The chain endpoints duplicate each other's first vertex.
    lower.pop();
    upper.pop();
    lower.append(&mut upper);
    lower
}

/// Area of the convex hull of a point set.
pub fn convex_hull_area(points: &[Vec2]) -> f64 {
    let hull = convex_hull(points);
    polygon_signed_area(&hull).abs()
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    /// Inverted box; growing it with any point makes it valid.
    pub fn empty() -> Self {
        Self {
            min: Vec2::new(f64::INFINITY, f64::INFINITY),
            max: Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.grow(p);
        }
        bb
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn grow(&mut self, p: Vec2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn expand(&mut self, margin: f64) {
        self.min.x -= margin;
        self.min.y -= margin;
        self.max.x += margin;
        self.max.y += margin;
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_intersection_crossing() {
        let hit = segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, -1.0),
        )
        .unwrap();
        assert!((hit.0 - 0.5).abs() < 1e-12);
        assert!((hit.1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_segment_intersection_disjoint() {
        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(2.0, -1.0),
        )
        .is_none());
    }

    #[test]
    fn test_segment_intersection_parallel() {
        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn test_perpendicular_foot_interior() {
        let (t, foot, dist) = perpendicular_foot(
            Vec2::new(1.5, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
        );
        assert!((t - 0.5).abs() < 1e-12);
        assert!((foot.x - 1.5).abs() < 1e-12);
        assert!((dist - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perpendicular_foot_clamped() {
        let (t, foot, dist) = perpendicular_foot(
            Vec2::new(-1.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
        );
        assert_eq!(t, 0.0);
        assert_eq!(foot, Vec2::new(0.0, 0.0));
        assert!((dist - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_polygon_area_square() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert!((polygon_signed_area(&square) - 4.0).abs() < 1e-12);
        let clockwise: Vec<Vec2> = square.iter().rev().copied().collect();
        assert!((polygon_signed_area(&clockwise) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_convex_hull_square_with_interior() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(0.0, 3.0),
            Vec2::new(1.0, 1.0),
        ];
        assert!((convex_hull_area(&pts) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_convex_hull_collinear() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        ];
        assert_eq!(convex_hull_area(&pts), 0.0);
    }

    #[test]
    fn test_angle_conventions() {
        let east = Vec2::new(1.0, 0.0);
        let north = Vec2::new(0.0, 1.0);
        let west = Vec2::new(-1.0, 0.0);
        assert!((angle_between_degrees(east, north) - 90.0).abs() < 1e-9);
        assert!((angle_between_degrees(east, west) - 180.0).abs() < 1e-9);
        assert!((line_crossing_angle_degrees(east, west)).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert!(polygon_contains(&square, Vec2::new(1.0, 1.0)));
        assert!(!polygon_contains(&square, Vec2::new(3.0, 1.0)));
    }

    #[test]
    fn test_bounding_box() {
        let mut bb = BoundingBox::empty();
        assert!(!bb.is_valid());
        bb.grow(Vec2::new(1.0, 2.0));
        bb.grow(Vec2::new(-1.0, 0.0));
        assert!(bb.is_valid());
        assert_eq!(bb.width(), 2.0);
        assert_eq!(bb.height(), 2.0);
        assert!(bb.contains(Vec2::new(0.0, 1.0)));
    }
}
