//! Segment grouping: merge segments into continuation chains, optionally
//! color the groups.
//!
//! At every junction each arriving segment end picks its straightest
//! continuation; two segments merge only when they pick each other and the
//! turn between them is within the threshold. With the junction-split flag
//! set, no merge happens at a junction where three or more segment ends
//! meet. Groups are numbered by first member appearance; the optional
//! coloring is greedy over groups in order of descending adjacency degree,
//! so that touching groups never share a color.

use axial_core::geometry::{angle_between_degrees, Vec2};
use axial_core::{check_cancel, Degrees, EngineResult, LineId, ProgressSink};
use axial_graph::SegmentGraph;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

/// Grouping outputs: per-segment group ids and optional coloring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingResult {
    pub group_per_segment: Vec<u32>,
    pub group_count: u32,
    pub color_per_segment: Vec<u32>,
    pub color_count: u32,
}

/// Travel direction into the junction along `seg` when it connects with
/// `at_start`.
fn arrival_direction(graph: &SegmentGraph, seg: LineId, at_start: bool) -> Vec2 {
    let s = graph.segment(seg);
    if at_start {
        s.p0.sub(s.p1)
    } else {
        s.p1.sub(s.p0)
    }
}

/// Compute group ids and a group coloring.
pub fn segment_grouping(
    graph: &SegmentGraph,
    angle_threshold: Degrees,
    split_at_junctions: bool,
    progress: &dyn ProgressSink,
) -> EngineResult<GroupingResult> {
    let threshold = angle_threshold.value();
    let n = graph.segment_count();
    let mut uf: UnionFind<usize> = UnionFind::new(n);

    for (ji, junction) in graph.junctions().iter().enumerate() {
        if split_at_junctions && junction.members.len() >= 3 {
            continue;
        }
        // Straightest continuation per arriving end.
        let best: Vec<Option<usize>> = junction
            .members
            .iter()
            .map(|&(seg, at_start)| {
                let arrive = arrival_direction(graph, seg, at_start);
                let mut best: Option<(usize, f64)> = None;
                for (mi, &(other, other_start)) in junction.members.iter().enumerate() {
                    if other == seg {
                        continue;
                    }
                    // Departure direction away from the junction.
                    let depart = arrival_direction(graph, other, other_start).scale(-1.0);
                    let turn = angle_between_degrees(arrive, depart);
                    if turn > threshold + 1e-9 {
                        continue;
                    }
                    if best.map_or(true, |(_, b)| turn < b - 1e-9) {
                        best = Some((mi, turn));
                    }
                }
                best.map(|(mi, _)| mi)
            })
            .collect();

        // Merge mutual picks only.
        for (mi, &pick) in best.iter().enumerate() {
            let Some(pick) = pick else { continue };
            if pick > mi && best[pick] == Some(mi) {
                uf.union(
                    junction.members[mi].0.index(),
                    junction.members[pick].0.index(),
                );
            }
        }
        if ji % 4096 == 0 {
            check_cancel(
                progress,
                Some("Grouping"),
                ji as f32 / graph.junctions().len().max(1) as f32,
            )?;
        }
    }

    // Number groups by first member appearance.
    let mut group_per_segment = vec![u32::MAX; n];
    let mut group_count = 0u32;
    let mut group_of_root: hashbrown::HashMap<usize, u32> = hashbrown::HashMap::new();
    for seg in 0..n {
        let root = uf.find(seg);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            let g = group_count;
            group_count += 1;
            g
        });
        group_per_segment[seg] = group;
    }

    // Group adjacency: any segment edge between different groups.
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); group_count as usize];
    for edge in graph.edges() {
        let ga = group_per_segment[edge.a.index()];
        let gb = group_per_segment[edge.b.index()];
        if ga == gb {
            continue;
        }
        if !adjacency[ga as usize].contains(&gb) {
            adjacency[ga as usize].push(gb);
            adjacency[gb as usize].push(ga);
        }
    }

    // Greedy coloring, highest-degree groups first.
    let mut order: Vec<u32> = (0..group_count).collect();
    order.sort_by_key(|&g| (usize::MAX - adjacency[g as usize].len(), g));
    let mut group_color = vec![u32::MAX; group_count as usize];
    let mut color_count = 0u32;
    for g in order {
        let mut used: Vec<u32> = adjacency[g as usize]
            .iter()
            .map(|&o| group_color[o as usize])
            .filter(|&c| c != u32::MAX)
            .collect();
        used.sort_unstable();
        let mut color = 0u32;
        for c in used {
            if c == color {
                color += 1;
            } else if c > color {
                break;
            }
        }
        group_color[g as usize] = color;
        color_count = color_count.max(color + 1);
    }

    let color_per_segment: Vec<u32> = group_per_segment
        .iter()
        .map(|&g| group_color[g as usize])
        .collect();

    Ok(GroupingResult {
        group_per_segment,
        group_count,
        color_per_segment,
        color_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axial_core::NullProgress;

    fn segments(coords: &[(f64, f64)], pairs: &[(u32, u32)]) -> SegmentGraph {
        let pts: Vec<Vec2> = coords.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        SegmentGraph::build(&pts, pairs, 1e-3, &NullProgress).unwrap()
    }

    fn chain(n: u32, length: f64) -> SegmentGraph {
        let coords: Vec<(f64, f64)> = (0..=n).map(|i| (i as f64 * length, 0.0)).collect();
        let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
        segments(&coords, &pairs)
    }

    fn square(length: f64) -> SegmentGraph {
        segments(
            &[(0.0, 0.0), (length, 0.0), (length, length), (0.0, length)],
            &[(0, 1), (1, 2), (2, 3), (3, 0)],
        )
    }

    fn crosshair() -> SegmentGraph {
        segments(
            &[
                (-1.0, -1.0),
                (0.0, -1.0),
                (1.0, -1.0),
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (-1.0, 1.0),
                (-1.0, 0.0),
                (0.0, 0.0),
            ],
            &[
                (0, 1),
                (1, 2),
                (2, 3),
                (3, 4),
                (4, 5),
                (5, 6),
                (6, 7),
                (7, 0),
                (3, 8),
                (8, 7),
                (1, 8),
                (8, 5),
            ],
        )
    }

    fn run(graph: &SegmentGraph, threshold: f64, split: bool) -> (Vec<u32>, Vec<u32>) {
        let r = segment_grouping(graph, Degrees(threshold), split, &NullProgress).unwrap();
        (r.group_per_segment, r.color_per_segment)
    }

    #[test]
    fn test_chain_single_group() {
        let g = chain(5, 3.0);
        for split in [false, true] {
            let (groups, colors) = run(&g, 1.0, split);
            assert_eq!(groups, vec![0; 5]);
            assert_eq!(colors, vec![0; 5]);
        }
    }

    #[test]
    fn test_square_threshold_boundary() {
        let g = square(3.0);
        for split in [false, true] {
            let (groups, colors) = run(&g, 89.0, split);
            assert_eq!(groups, vec![0, 1, 2, 3]);
            assert_eq!(colors, vec![0, 1, 0, 1]);
            let (groups, colors) = run(&g, 90.0, split);
            assert_eq!(groups, vec![0; 4]);
            assert_eq!(colors, vec![0; 4]);
        }
    }

    #[test]
    fn test_crosshair() {
        let g = crosshair();
        let (groups, colors) = run(&g, 89.0, false);
        assert_eq!(groups, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
        assert_eq!(colors, vec![0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1]);

        let (groups, colors) = run(&g, 89.0, true);
        assert_eq!(groups, (0..12).collect::<Vec<u32>>());
        assert_eq!(colors, vec![0, 1, 2, 1, 0, 1, 0, 2, 0, 1, 2, 3]);

        let (groups, colors) = run(&g, 90.0, false);
        assert_eq!(groups, vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 2, 2]);
        assert_eq!(colors, vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_fold_back_not_grouped() {
        // Nearly parallel overlapping segments: the continuation is a near
        // 180° turn, grouped only with a permissive threshold.
        let g = segments(&[(0.0, 0.0), (-1.0, 0.0), (-1.0, 0.01)], &[(0, 1), (2, 0)]);
        for split in [false, true] {
            let (groups, _) = run(&g, 100.0, split);
            assert_eq!(groups, vec![0, 1]);
            let (groups, _) = run(&g, 180.0, split);
            assert_eq!(groups, vec![0, 0]);
        }
    }

    #[test]
    fn test_mutual_best_required() {
        // A third segment at 45° captures the straight one's continuation;
        // the fold-back segment is left alone even though its own best turn
        // is within the threshold.
        let g = segments(
            &[(0.0, 0.0), (-1.0, 0.0), (-1.0, 0.01), (1.0, 1.0)],
            &[(0, 1), (2, 0), (0, 3)],
        );
        let (groups, colors) = run(&g, 90.0, false);
        assert_eq!(groups, vec![0, 1, 0]);
        assert_eq!(colors, vec![0, 1, 0]);
    }
}
