//! Graph lifecycle across the C boundary.

use crate::callback::{FfiProgress, ProgressCallback};
use crate::{expect_version, fence, fence_handle, in_coords, in_pairs, in_slice};
use axial_core::EngineError;
use axial_graph::{AxialBuildConfig, AxialGraph, SegmentGraph, SegmentGroupGraph};
use std::ffi::{c_uint, c_void};

/// Opaque axial graph handle.
pub struct AxialGraphHandle {
    pub(crate) graph: AxialGraph,
}

/// Opaque segment graph handle.
pub struct SegmentGraphHandle {
    pub(crate) graph: SegmentGraph,
}

/// Opaque segment-group graph handle.
pub struct SegmentGroupGraphHandle {
    pub(crate) graph: SegmentGroupGraph,
}

/// Axial graph construction descriptor.
#[repr(C)]
pub struct CreateGraphDesc {
    pub version: c_uint,

    // Lines
    pub line_coords: *const f64,
    pub lines: *const u32,
    pub line_coord_count: c_uint,
    pub line_count: c_uint,

    // Unlinks (optional)
    pub unlink_coords: *const f64,
    pub unlink_count: c_uint,

    // Points (optional)
    pub point_coords: *const f64,
    pub point_count: c_uint,

    // Polygons (optional): when set, `point_coords` holds polygon corners
    // and graph points are sampled along the outlines at the interval.
    pub points_per_polygon: *const u32,
    pub polygon_count: c_uint,
    pub polygon_point_interval: f32,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

pub const CREATE_GRAPH_VERSION: u32 = 1;

/// Build an axial graph; returns a handle or null.
///
/// # Safety
/// `desc` and all non-null array pointers must be valid for the declared
/// counts.
#[no_mangle]
pub unsafe extern "C" fn axial_create_graph(desc: *const CreateGraphDesc) -> *mut AxialGraphHandle {
    fence_handle("create_graph", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, CREATE_GRAPH_VERSION)?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);

        let coords = in_coords(desc.line_coords, desc.line_coord_count as usize)?;
        let pairs: Vec<(u32, u32)> = if desc.lines.is_null() {
            // Without an index table the coordinates are taken pairwise.
            (0..desc.line_count).map(|i| (i * 2, i * 2 + 1)).collect()
        } else {
            in_pairs(desc.lines, desc.line_count as usize)?
        };
        let unlinks = in_coords(desc.unlink_coords, desc.unlink_count as usize)?;
        let points = in_coords(desc.point_coords, desc.point_count as usize)?;
        let polygons = if desc.polygon_count > 0 {
            Some(in_slice(desc.points_per_polygon, desc.polygon_count as usize)?)
        } else {
            None
        };

        let graph = AxialGraph::build(
            &coords,
            &pairs,
            &unlinks,
            &points,
            polygons,
            desc.polygon_point_interval as f64,
            AxialBuildConfig::default(),
            &progress,
        )?;
        Ok(Box::into_raw(Box::new(AxialGraphHandle { graph })))
    })
}

/// # Safety
/// `handle` must come from [`axial_create_graph`] and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn axial_free_graph(handle: *mut AxialGraphHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Entity counts of an axial graph.
#[repr(C)]
pub struct GraphInfoOut {
    pub version: c_uint,
    pub line_count: c_uint,
    pub crossing_count: c_uint,
    pub point_count: c_uint,
    pub point_group_count: c_uint,
}

pub const GRAPH_INFO_VERSION: u32 = 1;

/// # Safety
/// Both pointers must be valid; `info.version` must be set by the caller.
#[no_mangle]
pub unsafe extern "C" fn axial_get_graph_info(
    handle: *const AxialGraphHandle,
    info: *mut GraphInfoOut,
) -> bool {
    fence("get_graph_info", || {
        let handle = handle
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null graph handle".into()))?;
        let info = info
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null info pointer".into()))?;
        expect_version(info.version, GRAPH_INFO_VERSION)?;
        let counts = handle.graph.info();
        info.line_count = counts.line_count;
        info.crossing_count = counts.crossing_count;
        info.point_count = counts.point_count;
        info.point_group_count = counts.point_group_count;
        Ok(())
    })
}

/// Copy per-line lengths; returns the line count (pass null to query it).
///
/// # Safety
/// `out_lengths` must hold `count` floats when non-null.
#[no_mangle]
pub unsafe extern "C" fn axial_get_graph_line_lengths(
    handle: *const AxialGraphHandle,
    out_lengths: *mut f32,
    count: c_uint,
) -> c_uint {
    let Some(handle) = handle.as_ref() else { return 0 };
    let lengths: Vec<f32> = handle.graph.line_lengths().map(|l| l as f32).collect();
    if !out_lengths.is_null() && count as usize >= lengths.len() {
        std::ptr::copy_nonoverlapping(lengths.as_ptr(), out_lengths, lengths.len());
    }
    lengths.len() as c_uint
}

/// Copy junction coordinates; returns the junction count.
///
/// # Safety
/// `out_coords` must hold `count` xy pairs when non-null.
#[no_mangle]
pub unsafe extern "C" fn axial_get_graph_crossing_coords(
    handle: *const AxialGraphHandle,
    out_coords: *mut f64,
    count: c_uint,
) -> c_uint {
    let Some(handle) = handle.as_ref() else { return 0 };
    let n = handle.graph.junction_count();
    if !out_coords.is_null() && count as usize >= n {
        for (i, p) in handle.graph.junction_positions().enumerate() {
            *out_coords.add(i * 2) = p.x;
            *out_coords.add(i * 2 + 1) = p.y;
        }
    }
    n as c_uint
}

/// Segment graph construction descriptor.
#[repr(C)]
pub struct CreateSegmentGraphDesc {
    pub version: c_uint,
    pub line_coords: *const f64,
    pub lines: *const u32,
    pub line_coord_count: c_uint,
    pub line_count: c_uint,
    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

pub const CREATE_SEGMENT_GRAPH_VERSION: u32 = 1;

/// # Safety
/// `desc` and its arrays must be valid for the declared counts.
#[no_mangle]
pub unsafe extern "C" fn axial_create_segment_graph(
    desc: *const CreateSegmentGraphDesc,
) -> *mut SegmentGraphHandle {
    fence_handle("create_segment_graph", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, CREATE_SEGMENT_GRAPH_VERSION)?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let coords = in_coords(desc.line_coords, desc.line_coord_count as usize)?;
        let pairs: Vec<(u32, u32)> = if desc.lines.is_null() {
            (0..desc.line_count).map(|i| (i * 2, i * 2 + 1)).collect()
        } else {
            in_pairs(desc.lines, desc.line_count as usize)?
        };
        let graph = SegmentGraph::build(&coords, &pairs, 1e-3, &progress)?;
        Ok(Box::into_raw(Box::new(SegmentGraphHandle { graph })))
    })
}

/// # Safety
/// `handle` must come from [`axial_create_segment_graph`].
#[no_mangle]
pub unsafe extern "C" fn axial_free_segment_graph(handle: *mut SegmentGraphHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Segment-group graph construction descriptor.
#[repr(C)]
pub struct CreateSegmentGroupGraphDesc {
    pub version: c_uint,
    pub segment_graph: *const SegmentGraphHandle,
    pub group_index_per_segment: *const u32,
    /// For verification against the segment graph.
    pub segment_count: c_uint,
    pub group_count: c_uint,
    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

pub const CREATE_SEGMENT_GROUP_GRAPH_VERSION: u32 = 1;

/// # Safety
/// `desc`, the referenced segment graph and the group array must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_create_segment_group_graph(
    desc: *const CreateSegmentGroupGraphDesc,
) -> *mut SegmentGroupGraphHandle {
    fence_handle("create_segment_group_graph", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, CREATE_SEGMENT_GROUP_GRAPH_VERSION)?;
        let segment_graph = desc
            .segment_graph
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null segment graph".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let groups = in_slice(desc.group_index_per_segment, desc.segment_count as usize)?;
        let graph = SegmentGroupGraph::build(
            &segment_graph.graph,
            groups,
            desc.group_count,
            &progress,
        )?;
        Ok(Box::into_raw(Box::new(SegmentGroupGraphHandle { graph })))
    })
}

/// # Safety
/// `handle` must come from [`axial_create_segment_group_graph`].
#[no_mangle]
pub unsafe extern "C" fn axial_free_segment_group_graph(handle: *mut SegmentGroupGraphHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_desc(coords: &[f64], pairs: &[u32]) -> CreateGraphDesc {
        CreateGraphDesc {
            version: CREATE_GRAPH_VERSION,
            line_coords: coords.as_ptr(),
            lines: pairs.as_ptr(),
            line_coord_count: (coords.len() / 2) as u32,
            line_count: (pairs.len() / 2) as u32,
            unlink_coords: std::ptr::null(),
            unlink_count: 0,
            point_coords: std::ptr::null(),
            point_count: 0,
            points_per_polygon: std::ptr::null(),
            polygon_count: 0,
            polygon_point_interval: 0.0,
            progress_callback: None,
            progress_callback_user: std::ptr::null_mut(),
        }
    }

    #[test]
    fn test_create_graph_with_unlink_and_point() {
        let coords = [0.0, 0.0, 2.0, 0.0, 1.0, 1.0, 1.0, -1.0, 2.0, -1.0];
        let pairs = [0u32, 1, 2, 3, 3, 4];
        let unlinks = [1.0f64, 0.0];
        let points = [-1.0f64, 0.0];
        let mut desc = chain_desc(&coords, &pairs);
        desc.unlink_coords = unlinks.as_ptr();
        desc.unlink_count = 1;
        desc.point_coords = points.as_ptr();
        desc.point_count = 1;

        unsafe {
            let handle = axial_create_graph(&desc);
            assert!(!handle.is_null());

            let mut info = GraphInfoOut {
                version: GRAPH_INFO_VERSION,
                line_count: 0,
                crossing_count: 0,
                point_count: 0,
                point_group_count: 0,
            };
            assert!(axial_get_graph_info(handle, &mut info));
            assert_eq!(info.line_count, 3);
            assert_eq!(info.crossing_count, 1);
            assert_eq!(info.point_count, 1);

            let mut lengths = [0.0f32; 3];
            assert_eq!(
                axial_get_graph_line_lengths(handle, lengths.as_mut_ptr(), 3),
                3
            );
            assert!((lengths[0] - 2.0).abs() < 1e-5);

            let mut crossing = [0.0f64; 2];
            assert_eq!(
                axial_get_graph_crossing_coords(handle, crossing.as_mut_ptr(), 1),
                1
            );
            assert_eq!(crossing, [1.0, -1.0]);

            axial_free_graph(handle);
        }
    }

    #[test]
    fn test_version_mismatch_returns_null() {
        let coords = [0.0, 0.0, 1.0, 0.0];
        let pairs = [0u32, 1];
        let mut desc = chain_desc(&coords, &pairs);
        desc.version = 99;
        unsafe {
            assert!(axial_create_graph(&desc).is_null());
        }
    }

    #[test]
    fn test_segment_and_group_graph_roundtrip() {
        let coords = [0.0, 0.0, 1.0, 0.0, 2.0, 0.0];
        let pairs = [0u32, 1, 1, 2];
        let desc = CreateSegmentGraphDesc {
            version: CREATE_SEGMENT_GRAPH_VERSION,
            line_coords: coords.as_ptr(),
            lines: pairs.as_ptr(),
            line_coord_count: 3,
            line_count: 2,
            progress_callback: None,
            progress_callback_user: std::ptr::null_mut(),
        };
        unsafe {
            let seg = axial_create_segment_graph(&desc);
            assert!(!seg.is_null());

            let groups = [0u32, 1];
            let group_desc = CreateSegmentGroupGraphDesc {
                version: CREATE_SEGMENT_GROUP_GRAPH_VERSION,
                segment_graph: seg,
                group_index_per_segment: groups.as_ptr(),
                segment_count: 2,
                group_count: 2,
                progress_callback: None,
                progress_callback_user: std::ptr::null_mut(),
            };
            let group = axial_create_segment_group_graph(&group_desc);
            assert!(!group.is_null());

            axial_free_segment_group_graph(group);
            axial_free_segment_graph(seg);
        }
    }
}
