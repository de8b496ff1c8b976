//! End-to-end scenarios over small reference networks, plus the quantified
//! invariants every analysis must hold (radius monotonicity, determinism,
//! grouping symmetry, isovist containment, normalization bounds).

use axial_algo::{
    angular_choice, angular_integration, attraction_distance, attraction_reach,
    calculate_isovist, fast_segment_betweenness, network_integration, normalize, od_betweenness,
    reach, segment_grouping, AngularOptions, AttractionSet, CollectionFunc, DestinationMode,
    DistributionFunc, IsovistContext, IsovistQuery, PointSet, PolygonSet, WeightFunc,
};
use axial_core::geometry::{polygon_contains, Vec2};
use axial_core::{Degrees, DistanceMode, Meters, NullProgress, OriginType, RadiusMask};
use axial_graph::{AxialBuildConfig, AxialGraph, SegmentGraph};

fn chain_axial(n: u32, length: f64) -> AxialGraph {
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

fn chain_segments(n: u32, length: f64) -> SegmentGraph {
    let pts: Vec<Vec2> = (0..=n)
        .map(|i| Vec2::new(i as f64 * length, 0.0))
        .collect();
    let pairs: Vec<(u32, u32)> = (0..n).map(|i| (i, i + 1)).collect();
    SegmentGraph::build(&pts, &pairs, 1e-3, &NullProgress).unwrap()
}

fn square_segments(length: f64) -> SegmentGraph {
    let pts = [
        Vec2::new(0.0, 0.0),
        Vec2::new(length, 0.0),
        Vec2::new(length, length),
        Vec2::new(0.0, length),
    ];
    SegmentGraph::build(&pts, &[(0, 1), (1, 2), (2, 3), (3, 0)], 1e-3, &NullProgress).unwrap()
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        if e == 0.0 {
            assert!(a.abs() < 1e-4, "index {i}: {a} != 0");
        } else {
            assert!(((a - e) / e).abs() < 1e-4, "index {i}: {a} != {e}");
        }
    }
}

/// Scenario 1: five-chain angular choice.
#[test]
fn scenario_five_chain_angular_choice() {
    let g = chain_segments(5, 3.0);
    let r = angular_choice(&g, &AngularOptions::default(), &NullProgress).unwrap();
    assert_close(&r.choice, &[0.0, 6.0, 8.0, 6.0, 0.0]);
    assert_eq!(r.node_counts, vec![5; 5]);
    assert_close(&r.total_depths, &[0.0; 5]);
}

/// Scenario 2: square angular integration with length weighting.
#[test]
fn scenario_square_angular_integration() {
    let g = square_segments(3.0);
    let options = AngularOptions {
        weigh_by_length: true,
        ..Default::default()
    };
    let r = angular_integration(&g, &options, &NullProgress).unwrap();
    assert_eq!(r.node_counts, vec![4; 4]);
    assert_close(&r.total_depths, &[4.0; 4]);
    let mut scores = vec![0.0f32; 4];
    normalize::angular_integration_normalize_weight(
        &r.total_weights,
        &r.total_depth_weights,
        &mut scores,
    );
    assert_close(&scores, &[9.0 / 13.0; 4]);
}

/// Scenario 3: reach on a 3-chain with a one-step radius.
#[test]
fn scenario_reach_three_chain() {
    let g = chain_axial(3, 3.0);
    let r = reach(&g, RadiusMask::none().with_steps(1), &[], &NullProgress).unwrap();
    assert_eq!(r.reached_count, vec![2, 3, 2]);
    assert_eq!(r.reached_length, vec![6.0, 9.0, 6.0]);
    assert_close(&r.reached_area, &[0.0, 0.0, 0.0]);
}

/// Scenario 4: attraction distance on a five-chain with point origins.
#[test]
fn scenario_attraction_distance_five_chain() {
    let pts: Vec<Vec2> = (0..=5).map(|i| Vec2::new(i as f64 * 3.0, 0.0)).collect();
    let pairs: Vec<(u32, u32)> = (0..5).map(|i| (i, i + 1)).collect();
    let origins: Vec<Vec2> = (0..5)
        .map(|i| Vec2::new((0.5 + i as f64) * 3.0, 1.0))
        .collect();
    let g = AxialGraph::build(
        &pts,
        &pairs,
        &[],
        &origins,
        None,
        0.0,
        AxialBuildConfig::default(),
        &NullProgress,
    )
    .unwrap();
    let attr = [Vec2::new(-1.0, 0.0)];
    let (d, _) = attraction_distance(
        &g,
        OriginType::Points,
        DistanceMode::Walking,
        RadiusMask::none(),
        AttractionSet {
            points: &attr,
            points_per_polygon: None,
            polygon_point_interval: 0.0,
        },
        None,
        0.0,
        &NullProgress,
    )
    .unwrap();
    assert_close(&d, &[3.5, 6.5, 9.5, 12.5, 15.5]);
}

/// Scenario 5: closest-only OD betweenness.
#[test]
fn scenario_od_betweenness_closest() {
    let pts: Vec<Vec2> = (0..=3).map(|i| Vec2::new(i as f64, 0.0)).collect();
    let pairs: Vec<(u32, u32)> = (0..3).map(|i| (i, i + 1)).collect();
    let dests = [Vec2::new(1.5, 0.5), Vec2::new(3.5, 0.0)];
    let g = AxialGraph::build(
        &pts,
        &pairs,
        &[],
        &dests,
        None,
        0.0,
        AxialBuildConfig::default(),
        &NullProgress,
    )
    .unwrap();
    let scores = od_betweenness(
        &g,
        &[Vec2::new(-0.5, 0.0)],
        Some(&[1.0]),
        None,
        DestinationMode::ClosestOnly,
        DistanceMode::Walking,
        RadiusMask::none(),
        &NullProgress,
    )
    .unwrap();
    assert_close(&scores, &[1.0, 1.0, 0.0]);
}

/// Scenario 6: isovist in an empty room.
#[test]
fn scenario_isovist_empty_room() {
    let ctx = IsovistContext::new(
        PolygonSet::default(),
        PointSet::default(),
        PolygonSet::default(),
        &NullProgress,
    )
    .unwrap();
    let iso = calculate_isovist(
        &ctx,
        &IsovistQuery {
            origin: Vec2::new(0.0, 0.0),
            max_view_distance: Meters(5.0),
            field_of_view: Degrees(360.0),
            direction: Degrees(0.0),
            perimeter_segment_count: 4,
        },
        &NullProgress,
    )
    .unwrap();
    assert_eq!(iso.polygon.len(), 4);
    for p in &iso.polygon {
        // Every vertex sits on an axis of the enlarged circle.
        assert!(p.x.abs() < 1e-9 || p.y.abs() < 1e-9);
    }
    let disc = std::f64::consts::PI * 25.0;
    assert!(((iso.area - disc) / disc).abs() < 1e-9);
    assert!(polygon_contains(&iso.polygon, Vec2::new(0.0, 0.0)));
}

/// Radius monotonicity: tightening any limit never grows an accumulator.
#[test]
fn invariant_radius_monotonicity() {
    let g = chain_axial(5, 3.0);
    let masks = [
        RadiusMask::none().with_steps(1),
        RadiusMask::none().with_steps(2),
        RadiusMask::none().with_steps(4),
        RadiusMask::none(),
    ];
    let mut previous: Option<Vec<u32>> = None;
    for mask in masks {
        let r = reach(&g, mask, &[], &NullProgress).unwrap();
        if let Some(prev) = &previous {
            for (tight, loose) in prev.iter().zip(&r.reached_count) {
                assert!(tight <= loose);
            }
        }
        previous = Some(r.reached_count);
    }

    let tight = network_integration(
        &g,
        RadiusMask::none().with_steps(1).with_walking(3.0),
        &NullProgress,
    )
    .unwrap();
    let loose = network_integration(&g, RadiusMask::none().with_steps(3), &NullProgress).unwrap();
    for (t, l) in tight.node_counts.iter().zip(&loose.node_counts) {
        assert!(t <= l);
    }
}

/// Determinism: repeated runs produce byte-identical outputs.
#[test]
fn invariant_determinism() {
    let g = chain_axial(5, 3.0);
    let a = reach(&g, RadiusMask::none().with_walking(7.5), &[], &NullProgress).unwrap();
    let b = reach(&g, RadiusMask::none().with_walking(7.5), &[], &NullProgress).unwrap();
    assert_eq!(a.reached_length, b.reached_length);
    assert_eq!(a.reached_area, b.reached_area);

    let sg = chain_segments(5, 3.0);
    let c1 = angular_choice(&sg, &AngularOptions::default(), &NullProgress).unwrap();
    let c2 = angular_choice(&sg, &AngularOptions::default(), &NullProgress).unwrap();
    assert_eq!(c1.choice, c2.choice);

    let f1 = fast_segment_betweenness(
        &sg,
        DistanceMode::Angular,
        true,
        RadiusMask::none(),
        &NullProgress,
    )
    .unwrap();
    let f2 = fast_segment_betweenness(
        &sg,
        DistanceMode::Angular,
        true,
        RadiusMask::none(),
        &NullProgress,
    )
    .unwrap();
    assert_eq!(f1.betweenness, f2.betweenness);
}

/// Grouping is an equivalence relation: shared group membership is mutual
/// and transitive by construction; ids are stable over repeated runs.
#[test]
fn invariant_grouping_symmetry() {
    let sg = square_segments(3.0);
    let a = segment_grouping(&sg, Degrees(90.0), false, &NullProgress).unwrap();
    let b = segment_grouping(&sg, Degrees(90.0), false, &NullProgress).unwrap();
    assert_eq!(a.group_per_segment, b.group_per_segment);
    for i in 0..a.group_per_segment.len() {
        for j in 0..a.group_per_segment.len() {
            assert_eq!(
                a.group_per_segment[i] == a.group_per_segment[j],
                a.group_per_segment[j] == a.group_per_segment[i],
            );
        }
    }
}

/// Isovist containment: origin inside, polygon inside the enlarged disc.
#[test]
fn invariant_isovist_containment() {
    let obstacles = PolygonSet {
        polygon_count_per_group: vec![2],
        point_count_per_polygon: vec![4, 3],
        coords: vec![
            Vec2::new(3.0, -1.0),
            Vec2::new(4.0, -1.0),
            Vec2::new(4.0, 1.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(-2.0, 2.0),
            Vec2::new(-1.0, 3.0),
            Vec2::new(-3.0, 3.0),
        ],
    };
    let ctx = IsovistContext::new(
        obstacles,
        PointSet::default(),
        PolygonSet::default(),
        &NullProgress,
    )
    .unwrap();
    let query = IsovistQuery {
        origin: Vec2::new(0.0, 0.0),
        max_view_distance: Meters(6.0),
        field_of_view: Degrees(360.0),
        direction: Degrees(30.0),
        perimeter_segment_count: 32,
    };
    let iso = calculate_isovist(&ctx, &query, &NullProgress).unwrap();
    assert!(polygon_contains(&iso.polygon, query.origin));
    let bound = 6.0 * axial_algo::isovist::perimeter_enlargement(32) + 1e-9;
    assert!(iso
        .polygon
        .iter()
        .all(|p| p.distance(query.origin) <= bound));
}

/// Standard normalization lands exactly on [0, 1].
#[test]
fn invariant_normalization_bounds() {
    let values = [3.0f32, -1.0, 7.0, 2.0];
    let mut out = [0.0f32; 4];
    normalize::standard_normalize(&values, &mut out);
    let min = out.iter().copied().fold(f32::INFINITY, f32::min);
    let max = out.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    assert_eq!(min, 0.0);
    assert_eq!(max, 1.0);
}

/// Attraction reach over point groups with every collection function.
#[test]
fn attraction_reach_collection_functions() {
    let pts: Vec<Vec2> = (0..=3).map(|i| Vec2::new(i as f64 * 3.0, 0.0)).collect();
    let pairs: Vec<(u32, u32)> = (0..3).map(|i| (i, i + 1)).collect();
    // One polygon origin spanning the first line.
    let corners = [
        Vec2::new(0.5, 1.0),
        Vec2::new(2.5, 1.0),
        Vec2::new(2.5, 2.0),
        Vec2::new(0.5, 2.0),
    ];
    let g = AxialGraph::build(
        &pts,
        &pairs,
        &[],
        &corners,
        Some(&[4]),
        1.0,
        AxialBuildConfig::default(),
        &NullProgress,
    )
    .unwrap();
    let attr = [Vec2::new(-1.0, 0.0)];
    let set = AttractionSet {
        points: &attr,
        points_per_polygon: None,
        polygon_point_interval: 0.0,
    };
    for (collection, check) in [
        (CollectionFunc::Average, 4.0f32),
        (CollectionFunc::Sum, 4.0 * g.group_points(axial_core::GroupId::new(0)).len() as f32),
        (CollectionFunc::Min, 4.0),
        (CollectionFunc::Max, 4.0),
    ] {
        let scores = attraction_reach(
            &g,
            OriginType::PointGroups,
            DistanceMode::Undefined,
            RadiusMask::none(),
            WeightFunc::Constant,
            set,
            Some(&[4.0]),
            DistributionFunc::Divide,
            collection,
            &NullProgress,
        )
        .unwrap();
        assert_eq!(scores.len(), 1);
        assert!(((scores[0] - check) / check).abs() < 1e-4, "{collection:?}");
    }
}
