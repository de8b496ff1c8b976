//! Segment-group graph: quotient of a segment graph under a grouping.
//!
//! Group-to-group edges exist iff any member pair was connected; each edge
//! keeps the minimum-angle connection. Walking depth over this graph counts
//! the summed member length of the *intermediate* groups on a path, so
//! adjacent groups sit at walking depth zero.

use axial_core::{checked_entity_count, EngineError, EngineResult, GroupId, ProgressSink};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::segment::SegmentGraph;

/// Connection between two groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEdge {
    pub a: GroupId,
    pub b: GroupId,
    /// Smallest turn angle among member connections, degrees.
    pub min_angle_degrees: f64,
}

impl GroupEdge {
    #[inline]
    pub fn other(&self, from: GroupId) -> GroupId {
        if self.a == from {
            self.b
        } else {
            self.a
        }
    }
}

/// Immutable segment-group graph handle.
#[derive(Debug, Clone)]
pub struct SegmentGroupGraph {
    group_count: u32,
    group_of_segment: Vec<u32>,
    /// Total member length per group.
    group_length: Vec<f64>,
    edges: Vec<GroupEdge>,
    adjacency: Vec<Vec<u32>>,
}

impl SegmentGroupGraph {
    /// Build from a segment graph and a per-segment group index array.
    pub fn build(
        segment_graph: &SegmentGraph,
        group_of_segment: &[u32],
        group_count: u32,
        _progress: &dyn ProgressSink,
    ) -> EngineResult<Self> {
        if group_of_segment.len() != segment_graph.segment_count() {
            return Err(EngineError::BadInput(format!(
                "group map covers {} segments but the graph has {}",
                group_of_segment.len(),
                segment_graph.segment_count()
            )));
        }
        checked_entity_count(group_count as usize, "group")?;
        if let Some(&bad) = group_of_segment.iter().find(|&&g| g >= group_count) {
            return Err(EngineError::BadInput(format!(
                "group index {bad} out of range (group count {group_count})"
            )));
        }

        let mut group_length = vec![0.0f64; group_count as usize];
        for (i, &g) in group_of_segment.iter().enumerate() {
            group_length[g as usize] += segment_graph.segments()[i].length;
        }

        // Scan segment edges, dedup by unordered group pair, keep min angle.
        let mut pair_min: HashMap<(u32, u32), f64> = HashMap::new();
        for edge in segment_graph.edges() {
            let ga = group_of_segment[edge.a.index()];
            let gb = group_of_segment[edge.b.index()];
            if ga == gb {
                continue;
            }
            let key = (ga.min(gb), ga.max(gb));
            pair_min
                .entry(key)
                .and_modify(|angle| *angle = angle.min(edge.angle_degrees))
                .or_insert(edge.angle_degrees);
        }

        let mut pairs: Vec<((u32, u32), f64)> = pair_min.into_iter().collect();
        pairs.sort_by_key(|&((a, b), _)| (a, b));

        let mut edges = Vec::with_capacity(pairs.len());
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); group_count as usize];
        for ((a, b), angle) in pairs {
            let index = edges.len() as u32;
            edges.push(GroupEdge {
                a: GroupId::new(a),
                b: GroupId::new(b),
                min_angle_degrees: angle,
            });
            adjacency[a as usize].push(index);
            adjacency[b as usize].push(index);
        }

        Ok(Self {
            group_count,
            group_of_segment: group_of_segment.to_vec(),
            group_length,
            edges,
            adjacency,
        })
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.group_count as usize
    }

    #[inline]
    pub fn group_of_segment(&self) -> &[u32] {
        &self.group_of_segment
    }

    /// Total member length of a group.
    #[inline]
    pub fn group_length(&self, id: GroupId) -> f64 {
        self.group_length[id.index()]
    }

    #[inline]
    pub fn edges(&self) -> &[GroupEdge] {
        &self.edges
    }

    #[inline]
    pub fn edge(&self, index: u32) -> &GroupEdge {
        &self.edges[index as usize]
    }

    #[inline]
    pub fn edges_of(&self, id: GroupId) -> &[u32] {
        &self.adjacency[id.index()]
    }
}
