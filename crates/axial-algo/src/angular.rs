//! Angular analyses on the segment graph: integration and choice.
//!
//! Both run one search per segment under the angular metric (turn angles
//! quantized by the caller's precision). Integration aggregates reached
//! counts and depths; choice is Brandes' betweenness over ordered pairs,
//! with an extra half-pair credited to both endpoints in length-weighted
//! mode.

use crate::arena::ArenaContext;
use crate::traversal::{segment_search, SegmentConfig, SegmentSearch};
use axial_core::{
    check_cancel, Degrees, DistanceMode, EngineResult, LineId, ProgressSink, RadiusMask,
};
use axial_graph::SegmentGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Settings shared by the angular analyses.
#[derive(Debug, Clone, Copy)]
pub struct AngularOptions {
    pub radius: RadiusMask,
    pub weigh_by_length: bool,
    /// Turns at or below this threshold cost nothing.
    pub angle_threshold: Degrees,
    /// Angle quantization bin.
    pub angle_precision: Degrees,
}

impl Default for AngularOptions {
    fn default() -> Self {
        Self {
            radius: RadiusMask::none(),
            weigh_by_length: false,
            angle_threshold: Degrees(0.0),
            angle_precision: Degrees(1.0),
        }
    }
}

impl AngularOptions {
    fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            mode: DistanceMode::Angular,
            radius: self.radius,
            angle_threshold: self.angle_threshold.value(),
            angle_precision: self.angle_precision.value(),
        }
    }
}

/// Per-segment outputs of angular integration.
///
/// `total_weights` excludes the origin's own weight; depths are reported in
/// 90°-units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngularIntegrationResult {
    pub node_counts: Vec<u32>,
    pub total_depths: Vec<f32>,
    pub total_weights: Vec<f32>,
    pub total_depth_weights: Vec<f32>,
}

pub fn angular_integration(
    graph: &SegmentGraph,
    options: &AngularOptions,
    progress: &dyn ProgressSink,
) -> EngineResult<AngularIntegrationResult> {
    let n = graph.segment_count();
    let cfg = options.segment_config();
    let done = AtomicUsize::new(0);

    let rows: Vec<(u32, f32, f32, f32)> = (0..n)
        .into_par_iter()
        .map_init(
            SegmentSearch::default,
            |search, s| -> EngineResult<(u32, f32, f32, f32)> {
                segment_search(graph, LineId::new(s as u32), &cfg, progress, search)?;
                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 256 == 0 {
                    check_cancel(
                        progress,
                        Some("Angular integration"),
                        count as f32 / n as f32,
                    )?;
                }
                let mut node_count = 0u32;
                let mut td = 0.0f64;
                let mut tw = 0.0f64;
                let mut tdw = 0.0f64;
                for v in 0..n {
                    if !search.reached[v] {
                        continue;
                    }
                    node_count += 1;
                    if v == s {
                        continue;
                    }
                    let depth90 = Degrees(search.depth[v].angular).quarter_turns();
                    let weight = if options.weigh_by_length {
                        graph.segments()[v].length
                    } else {
                        1.0
                    };
                    td += depth90;
                    tw += weight;
                    tdw += depth90 * weight;
                }
                Ok((node_count, td as f32, tw as f32, tdw as f32))
            },
        )
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(AngularIntegrationResult {
        node_counts: rows.iter().map(|r| r.0).collect(),
        total_depths: rows.iter().map(|r| r.1).collect(),
        total_weights: rows.iter().map(|r| r.2).collect(),
        total_depth_weights: rows.iter().map(|r| r.3).collect(),
    })
}

/// Per-segment outputs of angular choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngularChoiceResult {
    pub choice: Vec<f32>,
    pub node_counts: Vec<u32>,
    pub total_depths: Vec<f32>,
    pub total_depth_weights: Vec<f32>,
}

pub fn angular_choice(
    graph: &SegmentGraph,
    options: &AngularOptions,
    progress: &dyn ProgressSink,
) -> EngineResult<AngularChoiceResult> {
    let n = graph.segment_count();
    let cfg = options.segment_config();
    let done = AtomicUsize::new(0);

    let weight = |seg: usize| -> f64 {
        if options.weigh_by_length {
            graph.segments()[seg].length
        } else {
            1.0
        }
    };

    let rows: Vec<(Vec<f64>, u32, f32, f32)> = (0..n)
        .into_par_iter()
        .map_init(
            || (SegmentSearch::default(), ArenaContext::new()),
            |worker, s| -> EngineResult<(Vec<f64>, u32, f32, f32)> {
                let (search, scratch) = worker;
                scratch.reset();
                segment_search(graph, LineId::new(s as u32), &cfg, progress, search)?;
                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 128 == 0 {
                    check_cancel(progress, Some("Angular choice"), count as f32 / n as f32)?;
                }

                let w_s = weight(s);
                let mut node_count = 0u32;
                let mut td = 0.0f64;
                let mut tdw = 0.0f64;
                let mut local = vec![0.0f64; n];
                let mut delta = scratch.alloc_vec_filled(n, 0.0f64);
                let mut endpoint_credit = 0.0f64;
                for v in 0..n {
                    if !search.reached[v] {
                        continue;
                    }
                    node_count += 1;
                    if v == s {
                        continue;
                    }
                    let depth90 = Degrees(search.depth[v].angular).quarter_turns();
                    td += depth90;
                    tdw += depth90 * weight(v);
                }

                // Backward dependency accumulation; each target injects the
                // pair mass.
                for &seg in search.order.iter().rev() {
                    let w = seg as usize;
                    let inject = if w == s { 0.0 } else { w_s * weight(w) };
                    let flow = inject + delta[w];
                    if flow != 0.0 {
                        let sigma_w = search.sigma[w];
                        for &p in &search.preds[w] {
                            delta[p as usize] += search.sigma[p as usize] / sigma_w * flow;
                        }
                    }
                    if w != s {
                        local[w] += delta[w];
                        if options.weigh_by_length {
                            // Both pair endpoints take half a pair each.
                            let half = w_s * weight(w) * 0.5;
                            local[w] += half;
                            endpoint_credit += half;
                        }
                    }
                }
                local[s] += endpoint_credit;
                Ok((local, node_count, td as f32, tdw as f32))
            },
        )
        .collect::<EngineResult<Vec<_>>>()?;

    let mut choice = vec![0.0f64; n];
    let mut node_counts = vec![0u32; n];
    let mut total_depths = vec![0.0f32; n];
    let mut total_depth_weights = vec![0.0f32; n];
    for (s, (local, count, td, tdw)) in rows.into_iter().enumerate() {
        for (c, l) in choice.iter_mut().zip(local) {
            *c += l;
        }
        node_counts[s] = count;
        total_depths[s] = td;
        total_depth_weights[s] = tdw;
    }
    Ok(AngularChoiceResult {
        choice: choice.into_iter().map(|c| c as f32).collect(),
        node_counts,
        total_depths,
        total_depth_weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axial_core::geometry::Vec2;
    use axial_core::NullProgress;

    fn chain(n: u32, length: f64) -> SegmentGraph {
        let pts: Vec<Vec2> = (0..=n)
            .map(|i| Vec2::new(i as f64 * length, 0.0))
            .collect();
        let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
        SegmentGraph::build(&pts, &pairs, 1e-3, &NullProgress).unwrap()
    }

    fn square(length: f64) -> SegmentGraph {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(length, 0.0),
            Vec2::new(length, length),
            Vec2::new(0.0, length),
        ];
        SegmentGraph::build(&pts, &[(0, 1), (1, 2), (2, 3), (3, 0)], 1e-3, &NullProgress)
            .unwrap()
    }

    fn options(radius: RadiusMask, weigh: bool) -> AngularOptions {
        AngularOptions {
            radius,
            weigh_by_length: weigh,
            ..Default::default()
        }
    }

    fn assert_scores(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
            if e == 0.0 {
                assert!(a.abs() < 1e-4, "index {i}: {a} != 0");
            } else {
                assert!(((a - e) / e).abs() < 1e-4, "index {i}: {a} != {e}");
            }
        }
    }

    #[test]
    fn test_choice_five_chain() {
        let g = chain(5, 3.0);
        let r = angular_choice(&g, &options(RadiusMask::none(), false), &NullProgress).unwrap();
        assert_scores(&r.choice, &[0.0, 6.0, 8.0, 6.0, 0.0]);
        assert_eq!(r.node_counts, vec![5; 5]);
        assert_scores(&r.total_depths, &[0.0; 5]);

        let r = angular_choice(&g, &options(RadiusMask::none(), true), &NullProgress).unwrap();
        assert_scores(&r.choice, &[36.0, 90.0, 108.0, 90.0, 36.0]);
        assert_scores(&r.total_depth_weights, &[0.0; 5]);
    }

    #[test]
    fn test_choice_five_chain_radii() {
        let g = chain(5, 3.0);
        for (radius, expected_n) in [
            (RadiusMask::none().with_straight(0.0), vec![1u32; 5]),
            (RadiusMask::none().with_straight(1.0), vec![1; 5]),
            (RadiusMask::none().with_straight(3.0), vec![2, 3, 3, 3, 2]),
            (RadiusMask::none().with_walking(0.0), vec![1; 5]),
            (RadiusMask::none().with_walking(1.0), vec![1; 5]),
            (RadiusMask::none().with_walking(3.0), vec![2, 3, 3, 3, 2]),
            (RadiusMask::none().with_steps(0), vec![1; 5]),
            (RadiusMask::none().with_steps(1), vec![2, 3, 3, 3, 2]),
            (RadiusMask::none().with_steps(2), vec![3, 4, 5, 4, 3]),
            (RadiusMask::none().with_angular(1.0), vec![5; 5]),
        ] {
            let r = angular_choice(&g, &options(radius, false), &NullProgress).unwrap();
            assert_eq!(r.node_counts, expected_n, "radius {radius:?}");
        }
    }

    #[test]
    fn test_choice_square() {
        let g = square(3.0);
        let r = angular_choice(&g, &options(RadiusMask::none(), false), &NullProgress).unwrap();
        assert_scores(&r.choice, &[1.0; 4]);
        assert_eq!(r.node_counts, vec![4; 4]);
        assert_scores(&r.total_depths, &[4.0; 4]);

        let r = angular_choice(
            &g,
            &options(RadiusMask::none().with_angular(80.0), false),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(r.node_counts, vec![1; 4]);
        let r = angular_choice(
            &g,
            &options(RadiusMask::none().with_angular(100.0), false),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(r.node_counts, vec![3; 4]);
        assert_scores(&r.total_depths, &[2.0; 4]);

        let r = angular_choice(&g, &options(RadiusMask::none(), true), &NullProgress).unwrap();
        assert_scores(&r.choice, &[36.0; 4]);
        assert_scores(&r.total_depths, &[4.0; 4]);
        assert_scores(&r.total_depth_weights, &[12.0; 4]);
    }

    #[test]
    fn test_integration_five_chain() {
        let g = chain(5, 3.0);
        let r =
            angular_integration(&g, &options(RadiusMask::none(), false), &NullProgress).unwrap();
        assert_eq!(r.node_counts, vec![5; 5]);
        assert_scores(&r.total_depths, &[0.0; 5]);

        for (radius, expected_n) in [
            (RadiusMask::none().with_straight(3.0), vec![2u32, 3, 3, 3, 2]),
            (RadiusMask::none().with_walking(3.0), vec![2, 3, 3, 3, 2]),
            (RadiusMask::none().with_steps(2), vec![3, 4, 5, 4, 3]),
            (RadiusMask::none().with_angular(1.0), vec![5; 5]),
        ] {
            let r = angular_integration(&g, &options(radius, false), &NullProgress).unwrap();
            assert_eq!(r.node_counts, expected_n, "radius {radius:?}");
        }
    }

    #[test]
    fn test_integration_square() {
        let g = square(3.0);
        let r =
            angular_integration(&g, &options(RadiusMask::none(), false), &NullProgress).unwrap();
        assert_eq!(r.node_counts, vec![4; 4]);
        assert_scores(&r.total_depths, &[4.0; 4]);
        assert_scores(&r.total_weights, &[3.0; 4]);

        // Length weighted: TW excludes the origin segment.
        let r =
            angular_integration(&g, &options(RadiusMask::none(), true), &NullProgress).unwrap();
        assert_scores(&r.total_weights, &[9.0; 4]);
        assert_scores(&r.total_depth_weights, &[12.0; 4]);

        let r = angular_integration(
            &g,
            &options(RadiusMask::none().with_angular(80.0), false),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(r.node_counts, vec![1; 4]);
        assert_scores(&r.total_depths, &[0.0; 4]);
        let r = angular_integration(
            &g,
            &options(RadiusMask::none().with_angular(100.0), false),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(r.node_counts, vec![3; 4]);
        assert_scores(&r.total_depths, &[2.0; 4]);
    }
}
