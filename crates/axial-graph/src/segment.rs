//! Segment graph: one vertex per input line, edges at shared endpoints.
//!
//! Each edge stores the turn angle between travel directions through the
//! shared endpoint: 0° is a straight continuation, 180° a fold-back. The
//! angle is symmetric under direction reversal, so one value per edge
//! suffices for both traversal directions.

use axial_core::geometry::{angle_between_degrees, Vec2};
use axial_core::{
    check_cancel, checked_entity_count, EngineError, EngineResult, LineId, ProgressSink,
};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// A straight segment vertex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub p0: Vec2,
    pub p1: Vec2,
    pub length: f64,
}

impl Segment {
    #[inline]
    pub fn midpoint(&self) -> Vec2 {
        Vec2::new((self.p0.x + self.p1.x) * 0.5, (self.p0.y + self.p1.y) * 0.5)
    }
}

/// Connection between two segments at a shared endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEdge {
    pub a: LineId,
    pub b: LineId,
    /// Snapped shared endpoint.
    pub position: Vec2,
    /// Turn angle between travel directions, degrees in [0, 180].
    pub angle_degrees: f64,
    /// Walking cost between the two midpoints.
    pub walking: f64,
}

impl SegmentEdge {
    #[inline]
    pub fn other(&self, from: LineId) -> LineId {
        if self.a == from {
            self.b
        } else {
            self.a
        }
    }
}

/// An endpoint cluster where two or more segment ends meet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentJunction {
    pub position: Vec2,
    /// Incident `(segment, connects at p0)` pairs.
    pub members: Vec<(LineId, bool)>,
}

/// Immutable segment graph handle.
#[derive(Debug, Clone)]
pub struct SegmentGraph {
    segments: Vec<Segment>,
    edges: Vec<SegmentEdge>,
    /// Per segment: indices into `edges`.
    adjacency: Vec<Vec<u32>>,
    /// Junction ids (endpoint clusters with ≥2 incident segments) per
    /// segment edge, used by grouping's junction-split rule.
    edge_junction_degree: Vec<u32>,
    junctions: Vec<SegmentJunction>,
}

impl SegmentGraph {
    pub fn build(
        line_coords: &[Vec2],
        line_pairs: &[(u32, u32)],
        snap_tolerance: f64,
        progress: &dyn ProgressSink,
    ) -> EngineResult<Self> {
        if line_pairs.is_empty() {
            return Err(EngineError::BadInput("at least one line is required".into()));
        }
        checked_entity_count(line_pairs.len(), "segment")?;

        let mut segments = Vec::with_capacity(line_pairs.len());
        for (i, &(a, b)) in line_pairs.iter().enumerate() {
            let p0 = *line_coords.get(a as usize).ok_or_else(|| {
                EngineError::BadInput(format!("segment {i} references coordinate {a} out of range"))
            })?;
            let p1 = *line_coords.get(b as usize).ok_or_else(|| {
                EngineError::BadInput(format!("segment {i} references coordinate {b} out of range"))
            })?;
            segments.push(Segment {
                p0,
                p1,
                length: p0.distance(p1),
            });
        }
        check_cancel(progress, Some("Connecting segments"), 0.2)?;

        // Cluster endpoints by snapped position. (Ends of a segment graph
        // only meet at endpoints; interior crossings carry no connection.)
        let tol = snap_tolerance.max(1e-9);
        let mut clusters: HashMap<(i64, i64), Vec<(u32, bool)>> = HashMap::new();
        for (i, seg) in segments.iter().enumerate() {
            for (p, is_start) in [(seg.p0, true), (seg.p1, false)] {
                let key = ((p.x / tol).round() as i64, (p.y / tol).round() as i64);
                clusters.entry(key).or_default().push((i as u32, is_start));
            }
        }

        let mut keys: Vec<(i64, i64)> = clusters.keys().copied().collect();
        keys.sort_unstable();

        let mut edges: Vec<SegmentEdge> = Vec::new();
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); segments.len()];
        let mut edge_junction_degree: Vec<u32> = Vec::new();
        let mut junctions: Vec<SegmentJunction> = Vec::new();
        for key in keys {
            let members = &clusters[&key];
            if members.len() < 2 {
                continue;
            }
            let degree = members.len() as u32;
            junctions.push(SegmentJunction {
                position: {
                    let (seg, is_start) = members[0];
                    let s = &segments[seg as usize];
                    if is_start {
                        s.p0
                    } else {
                        s.p1
                    }
                },
                members: members
                    .iter()
                    .map(|&(seg, is_start)| (LineId::new(seg), is_start))
                    .collect(),
            });
            for mi in 0..members.len() {
                for mj in mi + 1..members.len() {
                    let (sa, sa_start) = members[mi];
                    let (sb, sb_start) = members[mj];
                    if sa == sb {
                        continue;
                    }
                    let a = &segments[sa as usize];
                    let b = &segments[sb as usize];
                    // Arrival direction on `a` toward the shared point,
                    // departure direction on `b` away from it.
                    let arrive = if sa_start {
                        a.p0.sub(a.p1)
                    } else {
                        a.p1.sub(a.p0)
                    };
                    let depart = if sb_start {
                        b.p1.sub(b.p0)
                    } else {
                        b.p0.sub(b.p1)
                    };
                    let angle = angle_between_degrees(arrive, depart);
                    let position = if sa_start { a.p0 } else { a.p1 };
                    let edge_index = edges.len() as u32;
                    edges.push(SegmentEdge {
                        a: LineId::new(sa),
                        b: LineId::new(sb),
                        position,
                        angle_degrees: angle,
                        walking: (a.length + b.length) * 0.5,
                    });
                    edge_junction_degree.push(degree);
                    adjacency[sa as usize].push(edge_index);
                    adjacency[sb as usize].push(edge_index);
                }
            }
        }
        check_cancel(progress, Some("Connecting segments"), 1.0)?;

        Ok(Self {
            segments,
            edges,
            adjacency,
            edge_junction_degree,
            junctions,
        })
    }

    /// Endpoint clusters with at least two incident segment ends.
    #[inline]
    pub fn junctions(&self) -> &[SegmentJunction] {
        &self.junctions
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn segment(&self, id: LineId) -> &Segment {
        &self.segments[id.index()]
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn edges(&self) -> &[SegmentEdge] {
        &self.edges
    }

    #[inline]
    pub fn edge(&self, index: u32) -> &SegmentEdge {
        &self.edges[index as usize]
    }

    /// Edge indices incident to a segment.
    #[inline]
    pub fn edges_of(&self, id: LineId) -> &[u32] {
        &self.adjacency[id.index()]
    }

    /// Number of segment ends meeting at the edge's shared endpoint.
    #[inline]
    pub fn edge_junction_degree(&self, index: u32) -> u32 {
        self.edge_junction_degree[index as usize]
    }
}
