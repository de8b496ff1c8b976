//! Analysis entry points across the C boundary.
//!
//! Output pointers are optional: null skips that output. Array sizes are
//! fixed by the graph entity counts (one element per line, segment,
//! junction, point or group, depending on the call).

use crate::callback::{FfiProgress, ProgressCallback};
use crate::graphs::{AxialGraphHandle, SegmentGraphHandle, SegmentGroupGraphHandle};
use crate::{expect_version, fence, in_coords, in_slice, out_copy, CRadii};
use axial_algo::{
    angular_choice, angular_integration, attraction_distance, attraction_reach,
    fast_segment_betweenness, network_integration, od_betweenness, reach, segment_betweenness,
    segment_group_integration, segment_grouping, AngularOptions, AttractionSet,
    BetweennessSources, CollectionFunc, DestinationMode, DistributionFunc, WeightFunc,
};
use axial_core::{Degrees, DistanceMode, EngineError, OriginType};
use std::ffi::{c_uint, c_void};

fn distance_mode(raw: u8) -> Result<DistanceMode, EngineError> {
    DistanceMode::from_u8(raw)
        .ok_or_else(|| EngineError::BadInput(format!("unknown distance type {raw}")))
}

fn origin_type(raw: u8) -> Result<OriginType, EngineError> {
    OriginType::from_u8(raw)
        .ok_or_else(|| EngineError::BadInput(format!("unknown origin type {raw}")))
}

/// Reach analysis descriptor.
#[repr(C)]
pub struct ReachDesc {
    pub version: c_uint,
    pub graph: *const AxialGraphHandle,
    pub radius: CRadii,

    // Origin points (optional; lines are the origins otherwise)
    pub origin_point_coords: *const f64,
    pub origin_point_count: c_uint,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // Outputs (optional), one element per origin
    pub out_reached_count: *mut u32,
    pub out_reached_length: *mut f32,
    pub out_reached_area: *mut f32,
}

pub const REACH_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_reach(desc: *const ReachDesc) -> bool {
    fence("reach", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, REACH_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let origins = in_coords(desc.origin_point_coords, desc.origin_point_count as usize)?;
        let result = reach(&graph.graph, desc.radius.to_mask()?, &origins, &progress)?;
        out_copy(desc.out_reached_count, &result.reached_count);
        out_copy(desc.out_reached_length, &result.reached_length);
        out_copy(desc.out_reached_area, &result.reached_area);
        Ok(())
    })
}

/// Network integration descriptor.
#[repr(C)]
pub struct NetworkIntegrationDesc {
    pub version: c_uint,
    pub graph: *const AxialGraphHandle,
    pub radius: CRadii,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // Output per junction (optional)
    pub out_junction_coords: *mut f64,
    pub out_junction_scores: *mut f32,
    pub out_junction_count: c_uint,

    // Output per line (optional)
    pub out_line_integration: *mut f32,
    pub out_line_node_count: *mut u32,
    pub out_line_total_depth: *mut f32,
}

pub const NETWORK_INTEGRATION_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_network_integration(desc: *const NetworkIntegrationDesc) -> bool {
    fence("network_integration", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, NETWORK_INTEGRATION_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let result = network_integration(&graph.graph, desc.radius.to_mask()?, &progress)?;

        if !desc.out_junction_coords.is_null() || !desc.out_junction_scores.is_null() {
            if (desc.out_junction_count as usize) < result.junction_coords.len() {
                return Err(EngineError::BadInput(format!(
                    "junction output holds {} entries but the graph has {} junctions",
                    desc.out_junction_count,
                    result.junction_coords.len()
                )));
            }
            if !desc.out_junction_coords.is_null() {
                for (i, p) in result.junction_coords.iter().enumerate() {
                    *desc.out_junction_coords.add(i * 2) = p.x;
                    *desc.out_junction_coords.add(i * 2 + 1) = p.y;
                }
            }
            out_copy(desc.out_junction_scores, &result.junction_scores);
        }
        out_copy(desc.out_line_integration, &result.integration);
        out_copy(desc.out_line_node_count, &result.node_counts);
        out_copy(desc.out_line_total_depth, &result.total_depths);
        Ok(())
    })
}

/// Shared descriptor for the angular analyses.
#[repr(C)]
pub struct AngularDesc {
    pub version: c_uint,
    pub graph: *const SegmentGraphHandle,
    pub radius: CRadii,

    pub weigh_by_length: bool,
    pub angle_threshold: f32,
    pub angle_precision: c_uint,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // Choice output (ignored by integration)
    pub out_choice: *mut f32,
    // Shared outputs
    pub out_node_counts: *mut u32,
    pub out_total_depths: *mut f32,
    pub out_total_weights: *mut f32,
    pub out_total_depth_weights: *mut f32,
}

pub const ANGULAR_VERSION: u32 = 2;

unsafe fn angular_common(
    desc: *const AngularDesc,
) -> Result<(&'static SegmentGraphHandle, AngularOptions, FfiProgress), EngineError> {
    let desc = desc
        .as_ref()
        .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
    expect_version(desc.version, ANGULAR_VERSION)?;
    let graph = desc
        .graph
        .as_ref()
        .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
    let options = AngularOptions {
        radius: desc.radius.to_mask()?,
        weigh_by_length: desc.weigh_by_length,
        angle_threshold: Degrees(desc.angle_threshold as f64),
        angle_precision: Degrees(desc.angle_precision as f64),
    };
    Ok((
        graph,
        options,
        FfiProgress::new(desc.progress_callback, desc.progress_callback_user),
    ))
}

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_angular_integration(desc: *const AngularDesc) -> bool {
    fence("angular_integration", || {
        let (graph, options, progress) = angular_common(desc)?;
        let result = angular_integration(&graph.graph, &options, &progress)?;
        let desc = &*desc;
        out_copy(desc.out_node_counts, &result.node_counts);
        out_copy(desc.out_total_depths, &result.total_depths);
        out_copy(desc.out_total_weights, &result.total_weights);
        out_copy(desc.out_total_depth_weights, &result.total_depth_weights);
        Ok(())
    })
}

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_angular_choice(desc: *const AngularDesc) -> bool {
    fence("angular_choice", || {
        let (graph, options, progress) = angular_common(desc)?;
        let result = angular_choice(&graph.graph, &options, &progress)?;
        let desc = &*desc;
        out_copy(desc.out_choice, &result.choice);
        out_copy(desc.out_node_counts, &result.node_counts);
        out_copy(desc.out_total_depths, &result.total_depths);
        out_copy(desc.out_total_depth_weights, &result.total_depth_weights);
        Ok(())
    })
}

/// Brandes betweenness descriptor (axial graph).
#[repr(C)]
pub struct SegmentBetweennessDesc {
    pub version: c_uint,
    pub graph: *const AxialGraphHandle,
    pub distance_type: u8,
    pub radius: CRadii,

    // Optional weights: per line, or per attraction point when attraction
    // points are supplied.
    pub weights: *const f32,
    pub weight_count: c_uint,

    // Optional attraction points replacing the line sources.
    pub attraction_point_coords: *const f64,
    pub attraction_point_count: c_uint,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    pub out_betweenness: *mut f32,
    pub out_node_count: *mut u32,
    pub out_total_depth: *mut f32,
}

pub const SEGMENT_BETWEENNESS_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_segment_betweenness(desc: *const SegmentBetweennessDesc) -> bool {
    fence("segment_betweenness", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, SEGMENT_BETWEENNESS_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let weights = if desc.weights.is_null() {
            None
        } else {
            Some(in_slice(desc.weights, desc.weight_count as usize)?)
        };
        let attraction_points = in_coords(
            desc.attraction_point_coords,
            desc.attraction_point_count as usize,
        )?;
        let sources = if attraction_points.is_empty() {
            BetweennessSources::Lines { weights }
        } else {
            BetweennessSources::Attractions {
                points: &attraction_points,
                weights,
            }
        };
        let result = segment_betweenness(
            &graph.graph,
            distance_mode(desc.distance_type)?,
            desc.radius.to_mask()?,
            sources,
            &progress,
        )?;
        out_copy(desc.out_betweenness, &result.betweenness);
        out_copy(desc.out_node_count, &result.node_counts);
        out_copy(desc.out_total_depth, &result.total_depths);
        Ok(())
    })
}

/// Tree betweenness descriptor (segment graph).
#[repr(C)]
pub struct FastSegmentBetweennessDesc {
    pub version: c_uint,
    pub graph: *const SegmentGraphHandle,
    pub distance_type: u8,
    pub weigh_by_length: bool,
    /// Only the walking limit applies.
    pub radius: CRadii,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    pub out_betweenness: *mut f32,
    pub out_node_count: *mut u32,
    pub out_total_depth: *mut f32,
}

pub const FAST_SEGMENT_BETWEENNESS_VERSION: u32 = 2;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_fast_segment_betweenness(
    desc: *const FastSegmentBetweennessDesc,
) -> bool {
    fence("fast_segment_betweenness", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, FAST_SEGMENT_BETWEENNESS_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let result = fast_segment_betweenness(
            &graph.graph,
            distance_mode(desc.distance_type)?,
            desc.weigh_by_length,
            desc.radius.to_mask()?,
            &progress,
        )?;
        out_copy(desc.out_betweenness, &result.betweenness);
        out_copy(desc.out_node_count, &result.node_counts);
        out_copy(desc.out_total_depth, &result.total_depths);
        Ok(())
    })
}

/// OD betweenness descriptor.
#[repr(C)]
pub struct OdBetweennessDesc {
    pub version: c_uint,
    pub graph: *const AxialGraphHandle,

    pub origin_points: *const f64,
    pub origin_weights: *const f32,
    pub origin_count: c_uint,

    // Destination weights match the graph's attached points.
    pub destination_weights: *const f32,
    pub destination_count: c_uint,

    pub destination_mode: u8,
    pub distance_type: u8,
    pub radius: CRadii,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    pub out_scores: *mut f32,
    /// For output size verification only.
    pub output_count: c_uint,
}

pub const OD_BETWEENNESS_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_od_betweenness(desc: *const OdBetweennessDesc) -> bool {
    fence("od_betweenness", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, OD_BETWEENNESS_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let origins = in_coords(desc.origin_points, desc.origin_count as usize)?;
        let origin_weights = if desc.origin_weights.is_null() {
            None
        } else {
            Some(in_slice(desc.origin_weights, desc.origin_count as usize)?)
        };
        let destination_weights = if desc.destination_weights.is_null() {
            None
        } else {
            Some(in_slice(
                desc.destination_weights,
                desc.destination_count as usize,
            )?)
        };
        let mode = DestinationMode::from_u8(desc.destination_mode).ok_or_else(|| {
            EngineError::BadInput(format!("unknown destination mode {}", desc.destination_mode))
        })?;
        let scores = od_betweenness(
            &graph.graph,
            &origins,
            origin_weights,
            destination_weights,
            mode,
            distance_mode(desc.distance_type)?,
            desc.radius.to_mask()?,
            &progress,
        )?;
        if !desc.out_scores.is_null() && (desc.output_count as usize) < scores.len() {
            return Err(EngineError::BadInput(format!(
                "score output holds {} entries but the graph has {} lines",
                desc.output_count,
                scores.len()
            )));
        }
        out_copy(desc.out_scores, &scores);
        Ok(())
    })
}

/// Attraction distance descriptor.
#[repr(C)]
pub struct AttractionDistanceDesc {
    pub version: c_uint,
    pub graph: *const AxialGraphHandle,
    pub origin_type: u8,
    pub distance_type: u8,
    pub radius: CRadii,

    pub attraction_points: *const f64,
    pub attraction_point_count: c_uint,

    // Attraction polygons (optional): when set, `attraction_points` holds
    // polygon corners sampled at the interval.
    pub points_per_attraction_polygon: *const u32,
    pub attraction_polygon_count: c_uint,
    pub attraction_polygon_point_interval: f32,

    // Custom distance weights (optional)
    pub line_weights: *const f32,
    pub line_weight_count: c_uint,
    pub weight_per_meter_for_point_edges: f32,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // One element per origin entity
    pub out_min_distances: *mut f32,
    pub out_destination_indices: *mut i32,
    /// For output size verification only.
    pub output_count: c_uint,
}

pub const ATTRACTION_DISTANCE_VERSION: u32 = 2;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_attraction_distance(desc: *const AttractionDistanceDesc) -> bool {
    fence("attraction_distance", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, ATTRACTION_DISTANCE_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let points = in_coords(desc.attraction_points, desc.attraction_point_count as usize)?;
        let polygons = if desc.attraction_polygon_count > 0 {
            Some(in_slice(
                desc.points_per_attraction_polygon,
                desc.attraction_polygon_count as usize,
            )?)
        } else {
            None
        };
        let line_weights = if desc.line_weights.is_null() {
            None
        } else {
            Some(in_slice(desc.line_weights, desc.line_weight_count as usize)?)
        };
        let (distances, destinations) = attraction_distance(
            &graph.graph,
            origin_type(desc.origin_type)?,
            distance_mode(desc.distance_type)?,
            desc.radius.to_mask()?,
            AttractionSet {
                points: &points,
                points_per_polygon: polygons,
                polygon_point_interval: desc.attraction_polygon_point_interval as f64,
            },
            line_weights,
            desc.weight_per_meter_for_point_edges as f64,
            &progress,
        )?;
        if !desc.out_min_distances.is_null() && (desc.output_count as usize) < distances.len() {
            return Err(EngineError::BadInput(format!(
                "distance output holds {} entries but {} origins were analyzed",
                desc.output_count,
                distances.len()
            )));
        }
        out_copy(desc.out_min_distances, &distances);
        out_copy(desc.out_destination_indices, &destinations);
        Ok(())
    })
}

/// Attraction reach descriptor.
#[repr(C)]
pub struct AttractionReachDesc {
    pub version: c_uint,
    pub graph: *const AxialGraphHandle,
    pub origin_type: u8,
    pub distance_type: u8,
    pub radius: CRadii,

    pub weight_func: u8,
    pub weight_func_constant: f32,

    /// Deprecated; only the summing mode (0) is accepted.
    pub score_accumulation_mode: u8,

    pub attraction_points: *const f64,
    pub attraction_point_count: c_uint,

    pub points_per_attraction_polygon: *const u32,
    pub attraction_polygon_count: c_uint,
    pub attraction_polygon_point_interval: f32,

    /// Per polygon when polygons are given, per point otherwise.
    pub attraction_values: *const f32,

    pub attraction_distribution_func: u8,
    pub attraction_collection_func: u8,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    pub out_scores: *mut f32,
    /// For output size verification only.
    pub output_count: c_uint,
}

pub const ATTRACTION_REACH_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_attraction_reach(desc: *const AttractionReachDesc) -> bool {
    fence("attraction_reach", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, ATTRACTION_REACH_VERSION)?;
        if desc.score_accumulation_mode != 0 {
            return Err(EngineError::BadInput(
                "unsupported score accumulation mode".into(),
            ));
        }
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let points = in_coords(desc.attraction_points, desc.attraction_point_count as usize)?;
        let polygons = if desc.attraction_polygon_count > 0 {
            Some(in_slice(
                desc.points_per_attraction_polygon,
                desc.attraction_polygon_count as usize,
            )?)
        } else {
            None
        };
        let value_count = polygons.map_or(points.len(), |p| p.len());
        let values = if desc.attraction_values.is_null() {
            None
        } else {
            Some(in_slice(desc.attraction_values, value_count)?)
        };
        let weight_func = WeightFunc::from_raw(
            desc.weight_func,
            desc.weight_func_constant as f64,
        )
        .ok_or_else(|| {
            EngineError::BadInput(format!("unknown weight function {}", desc.weight_func))
        })?;
        let distribution = DistributionFunc::from_u8(desc.attraction_distribution_func)
            .ok_or_else(|| {
                EngineError::BadInput(format!(
                    "unknown distribution function {}",
                    desc.attraction_distribution_func
                ))
            })?;
        let collection = CollectionFunc::from_u8(desc.attraction_collection_func)
            .ok_or_else(|| {
                EngineError::BadInput(format!(
                    "unknown collection function {}",
                    desc.attraction_collection_func
                ))
            })?;
        let scores = attraction_reach(
            &graph.graph,
            origin_type(desc.origin_type)?,
            distance_mode(desc.distance_type)?,
            desc.radius.to_mask()?,
            weight_func,
            AttractionSet {
                points: &points,
                points_per_polygon: polygons,
                polygon_point_interval: desc.attraction_polygon_point_interval as f64,
            },
            values,
            distribution,
            collection,
            &progress,
        )?;
        if !desc.out_scores.is_null() && (desc.output_count as usize) < scores.len() {
            return Err(EngineError::BadInput(format!(
                "score output holds {} entries but {} origins were analyzed",
                desc.output_count,
                scores.len()
            )));
        }
        out_copy(desc.out_scores, &scores);
        Ok(())
    })
}

/// Segment grouping descriptor.
#[repr(C)]
pub struct SegmentGroupingDesc {
    pub version: c_uint,
    pub segment_graph: *const SegmentGraphHandle,

    pub angle_threshold_degrees: f32,
    pub split_groups_at_junctions: bool,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    /// For output size verification only.
    pub line_count: c_uint,
    pub out_group_id_per_line: *mut u32,
    pub out_group_count: c_uint,
    pub out_color_per_line: *mut u32,
    pub out_color_count: c_uint,
}

pub const SEGMENT_GROUPING_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid; the
/// group/color count fields are written back.
#[no_mangle]
pub unsafe extern "C" fn axial_segment_grouping(desc: *mut SegmentGroupingDesc) -> bool {
    fence("segment_grouping", || {
        let desc = desc
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, SEGMENT_GROUPING_VERSION)?;
        let graph = desc
            .segment_graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        if (!desc.out_group_id_per_line.is_null() || !desc.out_color_per_line.is_null())
            && (desc.line_count as usize) < graph.graph.segment_count()
        {
            return Err(EngineError::BadInput(format!(
                "output holds {} entries but the graph has {} segments",
                desc.line_count,
                graph.graph.segment_count()
            )));
        }
        let result = segment_grouping(
            &graph.graph,
            Degrees(desc.angle_threshold_degrees as f64),
            desc.split_groups_at_junctions,
            &progress,
        )?;
        out_copy(desc.out_group_id_per_line, &result.group_per_segment);
        out_copy(desc.out_color_per_line, &result.color_per_segment);
        desc.out_group_count = result.group_count;
        desc.out_color_count = result.color_count;
        Ok(())
    })
}

/// Segment-group integration descriptor.
#[repr(C)]
pub struct SegmentGroupIntegrationDesc {
    pub version: c_uint,
    pub graph: *const SegmentGroupGraphHandle,
    pub radius: CRadii,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // Output per group (optional)
    pub out_integration: *mut f32,
    pub out_node_count: *mut u32,
    pub out_total_depth: *mut f32,
}

pub const SEGMENT_GROUP_INTEGRATION_VERSION: u32 = 1;

/// # Safety
/// `desc`, the graph handle and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_segment_group_integration(
    desc: *const SegmentGroupIntegrationDesc,
) -> bool {
    fence("segment_group_integration", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, SEGMENT_GROUP_INTEGRATION_VERSION)?;
        let graph = desc
            .graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let result =
            segment_group_integration(&graph.graph, desc.radius.to_mask()?, &progress)?;
        out_copy(desc.out_integration, &result.integration);
        out_copy(desc.out_node_count, &result.node_counts);
        out_copy(desc.out_total_depth, &result.total_depths);
        Ok(())
    })
}
