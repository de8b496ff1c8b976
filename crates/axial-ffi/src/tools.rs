//! Geometry tool entry points: segment-map cleanup, junction enumeration,
//! isovists, raster comparison and the normalization family.
//!
//! Tools that return arrays allocate them behind an opaque result handle;
//! the descriptor's result struct receives raw views into that storage.
//! `axial_free` releases any such handle.

use crate::callback::{FfiProgress, ProgressCallback};
use crate::{expect_version, fence, fence_handle, in_coords, in_pairs, in_slice, out_copy};
use axial_algo::{
    calculate_isovist, compare_results, normalize, raster_to_polygons, CompareMode,
    IsovistContext, IsovistQuery, PointSet, PolygonSet, Raster,
};
use axial_core::{Degrees, EngineError, Meters, Vec2};
use axial_graph::{cleanup, find_layer_junctions, JunctionLayer};
use std::ffi::{c_uint, c_void};

/// Owner of tool output arrays handed across the boundary.
pub enum ResultHandle {
    SegmentMap {
        coords: Vec<f64>,
        segments: Vec<u32>,
        unlinks: Vec<f64>,
    },
    Junctions {
        coords: Vec<f64>,
    },
    Isovist {
        coords: Vec<f64>,
        visibility: Vec<VisibleStorage>,
    },
    Raster(Raster),
    Polygons {
        polygon_count_per_range: Vec<u32>,
        point_count_per_polygon: Vec<u32>,
        coords: Vec<f64>,
    },
}

/// Per-class visible-object storage backing `CVisibleObjects`.
pub struct VisibleStorage {
    pub count_per_group: Vec<u32>,
    pub indices: Vec<u32>,
}

/// Release any tool result handle.
///
/// # Safety
/// `handle` must come from one of the tool calls and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn axial_free(handle: *mut ResultHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ---------------------------------------------------------------------------
// Segment map

#[repr(C)]
pub struct CreateSegmentMapDesc {
    pub version: c_uint,
    pub snap: f32,
    pub extrude_cut: f32,
    pub min_tail: f32,
    pub min_colinear_deviation: f32,
    pub road_network_type: u8,
    pub poly_coords: *const f64,
    pub poly_sections: *const i32,
    pub poly_coord_count: c_uint,
    pub poly_section_count: c_uint,
    pub unlink_coords: *const f64,
    pub unlink_count: c_uint,
    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

#[repr(C)]
pub struct CreateSegmentMapRes {
    pub version: c_uint,
    pub segment_coords: *const f64,
    /// `(p0, p1, base_index)` triplets.
    pub segments: *const u32,
    pub segment_count: c_uint,
    pub unlink_coords: *const f64,
    pub unlink_count: c_uint,
}

pub const CREATE_SEGMENT_MAP_VERSION: u32 = 2;

/// # Safety
/// `desc`, `res` and all non-null arrays must be valid for the declared
/// counts.
#[no_mangle]
pub unsafe extern "C" fn axial_create_segment_map(
    desc: *const CreateSegmentMapDesc,
    res: *mut CreateSegmentMapRes,
) -> *mut ResultHandle {
    fence_handle("create_segment_map", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        let res = res
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null result pointer".into()))?;
        expect_version(desc.version, CREATE_SEGMENT_MAP_VERSION)?;
        expect_version(res.version, CREATE_SEGMENT_MAP_VERSION)?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);

        let coords = in_coords(desc.poly_coords, desc.poly_coord_count as usize)?;
        let sections: Vec<u32> = in_slice(desc.poly_sections, desc.poly_section_count as usize)?
            .iter()
            .map(|&s| s.max(0) as u32)
            .collect();
        let unlinks = in_coords(desc.unlink_coords, desc.unlink_count as usize)?;
        let kind = cleanup::RoadNetworkKind::from_u8(desc.road_network_type).ok_or_else(|| {
            EngineError::BadInput(format!(
                "unknown road network type {}",
                desc.road_network_type
            ))
        })?;
        let config = cleanup::CleanupConfig {
            snap: Meters(desc.snap as f64),
            extrude: Meters(desc.extrude_cut as f64),
            tail: Meters(desc.min_tail as f64),
            deviation: Meters(desc.min_colinear_deviation as f64),
            kind,
        };
        let map = cleanup::build_segment_map(&coords, &sections, &unlinks, &config, &progress)?;

        let coords_out: Vec<f64> = map.points.iter().flat_map(|p| [p.x, p.y]).collect();
        let segments_out: Vec<u32> = map
            .segments
            .iter()
            .flat_map(|s| [s.p0, s.p1, s.base])
            .collect();
        let unlinks_out: Vec<f64> = map.unlinks.iter().flat_map(|p| [p.x, p.y]).collect();

        let handle = Box::new(ResultHandle::SegmentMap {
            coords: coords_out,
            segments: segments_out,
            unlinks: unlinks_out,
        });
        let ResultHandle::SegmentMap {
            coords,
            segments,
            unlinks,
        } = handle.as_ref()
        else {
            unreachable!()
        };
        res.segment_coords = coords.as_ptr();
        res.segments = segments.as_ptr();
        res.segment_count = map.segments.len() as c_uint;
        res.unlink_coords = unlinks.as_ptr();
        res.unlink_count = map.unlinks.len() as c_uint;
        Ok(Box::into_raw(handle))
    })
}

// ---------------------------------------------------------------------------
// Junctions

#[repr(C)]
pub struct CreateJunctionsDesc {
    pub version: c_uint,

    // Layer 0
    pub coords0: *const f64,
    pub lines0: *const u32,
    pub line_count0: c_uint,

    // Layer 1 (optional)
    pub coords1: *const f64,
    pub lines1: *const u32,
    pub line_count1: c_uint,

    pub unlink_coords: *const f64,
    pub unlink_count: c_uint,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

#[repr(C)]
pub struct CreateJunctionsRes {
    pub version: c_uint,
    pub point_coords: *const f64,
    pub point_count: c_uint,
}

pub const CREATE_JUNCTIONS_VERSION: u32 = 1;

/// # Safety
/// `desc`, `res` and all non-null arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_create_junctions(
    desc: *const CreateJunctionsDesc,
    res: *mut CreateJunctionsRes,
) -> *mut ResultHandle {
    fence_handle("create_junctions", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        let res = res
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null result pointer".into()))?;
        expect_version(desc.version, CREATE_JUNCTIONS_VERSION)?;
        expect_version(res.version, CREATE_JUNCTIONS_VERSION)?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);

        // Without an index table the coordinates are taken pairwise; with
        // one, the referenced range defines how many coordinates to read.
        unsafe fn read_layer(
            coords: *const f64,
            lines: *const u32,
            line_count: usize,
        ) -> Result<(Vec<Vec2>, Vec<(u32, u32)>), EngineError> {
            if lines.is_null() {
                let pts = in_coords(coords, line_count * 2)?;
                let pairs = (0..line_count as u32).map(|i| (i * 2, i * 2 + 1)).collect();
                Ok((pts, pairs))
            } else {
                let pairs = in_pairs(lines, line_count)?;
                let needed = pairs
                    .iter()
                    .map(|&(a, b)| a.max(b) as usize + 1)
                    .max()
                    .unwrap_or(0);
                Ok((in_coords(coords, needed)?, pairs))
            }
        }

        let (coords0, pairs0) = read_layer(desc.coords0, desc.lines0, desc.line_count0 as usize)?;
        let layer0 = JunctionLayer {
            coords: &coords0,
            pairs: &pairs0,
        };

        let storage1;
        let layer1 = if desc.line_count1 > 0 {
            storage1 = read_layer(desc.coords1, desc.lines1, desc.line_count1 as usize)?;
            Some(JunctionLayer {
                coords: &storage1.0,
                pairs: &storage1.1,
            })
        } else {
            None
        };
        let unlinks = in_coords(desc.unlink_coords, desc.unlink_count as usize)?;

        let junctions = find_layer_junctions(layer0, layer1, &unlinks, &progress)?;
        let coords: Vec<f64> = junctions.iter().flat_map(|p| [p.x, p.y]).collect();
        let handle = Box::new(ResultHandle::Junctions { coords });
        let ResultHandle::Junctions { coords } = handle.as_ref() else {
            unreachable!()
        };
        res.point_coords = coords.as_ptr();
        res.point_count = junctions.len() as c_uint;
        Ok(Box::into_raw(handle))
    })
}

// ---------------------------------------------------------------------------
// Isovists

#[repr(C)]
pub struct CPolygons {
    pub group_count: c_uint,
    pub polygon_count_per_group: *const u32,
    pub point_count_per_polygon: *const u32,
    pub coords: *const f64,
}

#[repr(C)]
pub struct CPoints {
    pub group_count: c_uint,
    pub point_count_per_group: *const u32,
    pub coords: *const f64,
}

#[repr(C)]
pub struct CVisibleObjects {
    pub object_count: c_uint,
    pub group_count: c_uint,
    pub count_per_group: *const u32,
    pub indices: *const u32,
}

impl Default for CVisibleObjects {
    fn default() -> Self {
        Self {
            object_count: 0,
            group_count: 0,
            count_per_group: std::ptr::null(),
            indices: std::ptr::null(),
        }
    }
}

unsafe fn read_polygons(c: &CPolygons) -> Result<PolygonSet, EngineError> {
    let polygon_count_per_group =
        in_slice(c.polygon_count_per_group, c.group_count as usize)?.to_vec();
    let polygon_total: usize = polygon_count_per_group.iter().map(|&n| n as usize).sum();
    let point_count_per_polygon = in_slice(c.point_count_per_polygon, polygon_total)?.to_vec();
    let point_total: usize = point_count_per_polygon.iter().map(|&n| n as usize).sum();
    let coords = in_coords(c.coords, point_total)?;
    Ok(PolygonSet {
        polygon_count_per_group,
        point_count_per_polygon,
        coords,
    })
}

unsafe fn read_points(c: &CPoints) -> Result<PointSet, EngineError> {
    let point_count_per_group = in_slice(c.point_count_per_group, c.group_count as usize)?.to_vec();
    let total: usize = point_count_per_group.iter().map(|&n| n as usize).sum();
    let coords = in_coords(c.coords, total)?;
    Ok(PointSet {
        point_count_per_group,
        coords,
    })
}

#[repr(C)]
pub struct CreateIsovistContextDesc {
    pub version: c_uint,
    pub obstacle_polygons: CPolygons,
    pub attraction_points: CPoints,
    pub attraction_polygons: CPolygons,
    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

pub const CREATE_ISOVIST_CONTEXT_VERSION: u32 = 2;

pub struct IsovistContextHandle {
    pub(crate) context: IsovistContext,
}

/// # Safety
/// `desc` and all non-null nested arrays must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_create_isovist_context(
    desc: *const CreateIsovistContextDesc,
) -> *mut IsovistContextHandle {
    fence_handle("create_isovist_context", || {
        let desc = desc
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, CREATE_ISOVIST_CONTEXT_VERSION)?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let context = IsovistContext::new(
            read_polygons(&desc.obstacle_polygons)?,
            read_points(&desc.attraction_points)?,
            read_polygons(&desc.attraction_polygons)?,
            &progress,
        )?;
        Ok(Box::into_raw(Box::new(IsovistContextHandle { context })))
    })
}

/// # Safety
/// `handle` must come from [`axial_create_isovist_context`].
#[no_mangle]
pub unsafe extern "C" fn axial_free_isovist_context(handle: *mut IsovistContextHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[repr(C)]
pub struct CalculateIsovistDesc {
    pub version: c_uint,
    pub isovist_context: *const IsovistContextHandle,
    pub origin_x: f64,
    pub origin_y: f64,
    pub max_view_distance: f32,
    pub field_of_view_degrees: f32,
    pub direction_degrees: f32,
    pub perimeter_segment_count: c_uint,

    // Outputs
    pub out_point_count: c_uint,
    pub out_points: *const f64,
    pub out_isovist_handle: *mut ResultHandle,
    pub out_area: f32,
    pub out_visible_obstacles: CVisibleObjects,
    pub out_visible_attraction_points: CVisibleObjects,
    pub out_visible_attraction_polygons: CVisibleObjects,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,
}

pub const CALCULATE_ISOVIST_VERSION: u32 = 4;

fn flatten_visibility(groups: &[Vec<u32>]) -> VisibleStorage {
    let count_per_group: Vec<u32> = groups.iter().map(|g| g.len() as u32).collect();
    let indices: Vec<u32> = groups.iter().flatten().copied().collect();
    VisibleStorage {
        count_per_group,
        indices,
    }
}

fn visible_view(storage: &VisibleStorage) -> CVisibleObjects {
    CVisibleObjects {
        object_count: storage.indices.len() as c_uint,
        group_count: storage.count_per_group.len() as c_uint,
        count_per_group: storage.count_per_group.as_ptr(),
        indices: storage.indices.as_ptr(),
    }
}

/// # Safety
/// `desc` and the context handle must be valid; outputs are written into
/// the descriptor.
#[no_mangle]
pub unsafe extern "C" fn axial_calculate_isovist(desc: *mut CalculateIsovistDesc) -> bool {
    fence("calculate_isovist", || {
        let desc = desc
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, CALCULATE_ISOVIST_VERSION)?;
        let context = desc
            .isovist_context
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null isovist context".into()))?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let isovist = calculate_isovist(
            &context.context,
            &IsovistQuery {
                origin: Vec2::new(desc.origin_x, desc.origin_y),
                max_view_distance: Meters(desc.max_view_distance as f64),
                field_of_view: Degrees(desc.field_of_view_degrees as f64),
                direction: Degrees(desc.direction_degrees as f64),
                perimeter_segment_count: desc.perimeter_segment_count,
            },
            &progress,
        )?;

        let coords: Vec<f64> = isovist.polygon.iter().flat_map(|p| [p.x, p.y]).collect();
        let visibility = vec![
            flatten_visibility(&isovist.visible_obstacles),
            flatten_visibility(&isovist.visible_attraction_points),
            flatten_visibility(&isovist.visible_attraction_polygons),
        ];
        let handle = Box::new(ResultHandle::Isovist { coords, visibility });
        let ResultHandle::Isovist { coords, visibility } = handle.as_ref() else {
            unreachable!()
        };
        desc.out_point_count = isovist.polygon.len() as c_uint;
        desc.out_points = coords.as_ptr();
        desc.out_area = isovist.area as f32;
        desc.out_visible_obstacles = visible_view(&visibility[0]);
        desc.out_visible_attraction_points = visible_view(&visibility[1]);
        desc.out_visible_attraction_polygons = visible_view(&visibility[2]);
        desc.out_isovist_handle = Box::into_raw(handle);
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Raster compare

#[repr(C)]
pub struct CompareResultsDesc {
    pub version: c_uint,

    pub line_count1: c_uint,
    pub line_coords1: *const f64,
    pub values1: *const f32,
    pub line_count2: c_uint,
    pub line_coords2: *const f64,
    pub values2: *const f32,

    pub mode: u8,
    pub resolution: f32,
    pub blur_radius: f32,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // Outputs
    pub out_gradient_raster: *mut ResultHandle,
    pub out_min: f32,
    pub out_max: f32,
}

pub const COMPARE_RESULTS_VERSION: u32 = 1;

unsafe fn read_lines(
    coords: *const f64,
    count: usize,
) -> Result<Vec<(Vec2, Vec2)>, EngineError> {
    let raw = in_slice(coords, count * 4)?;
    Ok(raw
        .chunks_exact(4)
        .map(|c| (Vec2::new(c[0], c[1]), Vec2::new(c[2], c[3])))
        .collect())
}

/// # Safety
/// `desc` and all non-null arrays must be valid; outputs are written into
/// the descriptor.
#[no_mangle]
pub unsafe extern "C" fn axial_compare_results(desc: *mut CompareResultsDesc) -> bool {
    fence("compare_results", || {
        let desc = desc
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, COMPARE_RESULTS_VERSION)?;
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let mode = CompareMode::from_u8(desc.mode)
            .ok_or_else(|| EngineError::BadInput(format!("unknown compare mode {}", desc.mode)))?;
        let lines1 = read_lines(desc.line_coords1, desc.line_count1 as usize)?;
        let values1 = in_slice(desc.values1, desc.line_count1 as usize)?;
        let lines2 = read_lines(desc.line_coords2, desc.line_count2 as usize)?;
        let values2 = in_slice(desc.values2, desc.line_count2 as usize)?;
        let (raster, min, max) = compare_results(
            &lines1,
            values1,
            &lines2,
            values2,
            mode,
            desc.resolution as f64,
            desc.blur_radius as f64,
            &progress,
        )?;
        desc.out_min = min;
        desc.out_max = max;
        desc.out_gradient_raster = Box::into_raw(Box::new(ResultHandle::Raster(raster)));
        Ok(())
    })
}

/// Raster pixel format tags.
pub const RASTER_FORMAT_FLOAT: u8 = 2;

#[repr(C)]
pub struct RasterData {
    pub version: c_uint,
    pub bb_min_x: f64,
    pub bb_min_y: f64,
    pub bb_max_x: f64,
    pub bb_max_y: f64,
    pub width: c_uint,
    pub height: c_uint,
    /// Floats per row.
    pub pitch: c_uint,
    pub format: u8,
    pub bits: *const c_void,
}

pub const RASTER_DATA_VERSION: u32 = 1;

/// # Safety
/// `handle` must be a raster result handle; `data` must be valid.
#[no_mangle]
pub unsafe extern "C" fn axial_get_raster_data(
    handle: *const ResultHandle,
    data: *mut RasterData,
) -> bool {
    fence("get_raster_data", || {
        let handle = handle
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null raster handle".into()))?;
        let data = data
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null data pointer".into()))?;
        expect_version(data.version, RASTER_DATA_VERSION)?;
        let ResultHandle::Raster(raster) = handle else {
            return Err(EngineError::BadInput("handle is not a raster".into()));
        };
        data.bb_min_x = raster.bounds.min.x;
        data.bb_min_y = raster.bounds.min.y;
        data.bb_max_x = raster.bounds.max.x;
        data.bb_max_y = raster.bounds.max.y;
        data.width = raster.width;
        data.height = raster.height;
        data.pitch = raster.width;
        data.format = RASTER_FORMAT_FLOAT;
        data.bits = raster.data.as_ptr() as *const c_void;
        Ok(())
    })
}

#[repr(C)]
pub struct RasterToPolygonsDesc {
    pub version: c_uint,
    pub raster: *const ResultHandle,
    /// `(low, high)` pairs.
    pub ranges: *const f32,
    pub range_count: c_uint,

    pub progress_callback: ProgressCallback,
    pub progress_callback_user: *mut c_void,

    // Outputs
    pub out_polygon_count_per_range: *const u32,
    pub out_point_count_per_polygon: *const u32,
    pub out_polygon_coords: *const f64,
}

pub const RASTER_TO_POLYGONS_VERSION: u32 = 1;

/// # Safety
/// `desc`, the raster handle and the range array must be valid; outputs are
/// written into the descriptor and owned by the returned handle.
#[no_mangle]
pub unsafe extern "C" fn axial_raster_to_polygons(
    desc: *mut RasterToPolygonsDesc,
) -> *mut ResultHandle {
    fence_handle("raster_to_polygons", || {
        let desc = desc
            .as_mut()
            .ok_or_else(|| EngineError::BadInput("null descriptor".into()))?;
        expect_version(desc.version, RASTER_TO_POLYGONS_VERSION)?;
        let raster = desc
            .raster
            .as_ref()
            .ok_or_else(|| EngineError::BadInput("null raster handle".into()))?;
        let ResultHandle::Raster(raster) = raster else {
            return Err(EngineError::BadInput("handle is not a raster".into()));
        };
        let progress = FfiProgress::new(desc.progress_callback, desc.progress_callback_user);
        let ranges: Vec<(f32, f32)> = in_slice(desc.ranges, desc.range_count as usize * 2)?
            .chunks_exact(2)
            .map(|c| (c[0], c[1]))
            .collect();
        let per_range = raster_to_polygons(raster, &ranges, &progress)?;

        let polygon_count_per_range: Vec<u32> =
            per_range.iter().map(|p| p.len() as u32).collect();
        let point_count_per_polygon: Vec<u32> = per_range
            .iter()
            .flatten()
            .map(|ring| ring.len() as u32)
            .collect();
        let coords: Vec<f64> = per_range
            .iter()
            .flatten()
            .flatten()
            .flat_map(|p| [p.x, p.y])
            .collect();
        let handle = Box::new(ResultHandle::Polygons {
            polygon_count_per_range,
            point_count_per_polygon,
            coords,
        });
        let ResultHandle::Polygons {
            polygon_count_per_range,
            point_count_per_polygon,
            coords,
        } = handle.as_ref()
        else {
            unreachable!()
        };
        desc.out_polygon_count_per_range = polygon_count_per_range.as_ptr();
        desc.out_point_count_per_polygon = point_count_per_polygon.as_ptr();
        desc.out_polygon_coords = coords.as_ptr();
        Ok(Box::into_raw(handle))
    })
}

// ---------------------------------------------------------------------------
// Normalizations

macro_rules! normalize_pair_fn {
    ($name:ident, $func:path, $aux:ty) => {
        /// # Safety
        /// All arrays must hold `count` elements.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            in_values: *const f32,
            aux: *const $aux,
            count: c_uint,
            out: *mut f32,
        ) -> bool {
            fence(stringify!($name), || {
                let values = in_slice(in_values, count as usize)?;
                let aux = in_slice(aux, count as usize)?;
                if out.is_null() {
                    return Err(EngineError::BadInput("null output array".into()));
                }
                let mut result = vec![0.0f32; count as usize];
                $func(values, aux, &mut result);
                out_copy(out, &result);
                Ok(())
            })
        }
    };
}

/// # Safety
/// Both arrays must hold `count` elements.
#[no_mangle]
pub unsafe extern "C" fn axial_standard_normalize(
    in_values: *const f32,
    count: c_uint,
    out: *mut f32,
) -> bool {
    fence("standard_normalize", || {
        let values = in_slice(in_values, count as usize)?;
        if out.is_null() {
            return Err(EngineError::BadInput("null output array".into()));
        }
        let mut result = vec![0.0f32; count as usize];
        normalize::standard_normalize(values, &mut result);
        out_copy(out, &result);
        Ok(())
    })
}

normalize_pair_fn!(axial_choice_normalize, normalize::choice_normalize, u32);
normalize_pair_fn!(axial_choice_syntax_normalize, normalize::syntax_normalize, f32);
normalize_pair_fn!(
    axial_betweenness_normalize,
    normalize::choice_normalize,
    u32
);
normalize_pair_fn!(
    axial_betweenness_syntax_normalize,
    normalize::syntax_normalize,
    f32
);
normalize_pair_fn!(
    axial_angular_integration_normalize,
    normalize::angular_integration_normalize,
    u32
);
normalize_pair_fn!(
    axial_angular_integration_syntax_normalize,
    normalize::angular_integration_syntax_normalize,
    u32
);
normalize_pair_fn!(
    axial_angular_integration_hillier_normalize,
    normalize::angular_integration_hillier_normalize,
    u32
);

/// Length-weighted variants take `(total_weight, total_depth_weight)`.
macro_rules! normalize_weight_fn {
    ($name:ident, $func:path) => {
        /// # Safety
        /// All arrays must hold `count` elements.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            total_weights: *const f32,
            total_depth_weights: *const f32,
            count: c_uint,
            out: *mut f32,
        ) -> bool {
            fence(stringify!($name), || {
                let tw = in_slice(total_weights, count as usize)?;
                let tdw = in_slice(total_depth_weights, count as usize)?;
                if out.is_null() {
                    return Err(EngineError::BadInput("null output array".into()));
                }
                let mut result = vec![0.0f32; count as usize];
                $func(tw, tdw, &mut result);
                out_copy(out, &result);
                Ok(())
            })
        }
    };
}

normalize_weight_fn!(
    axial_angular_integration_normalize_length_weight,
    normalize::angular_integration_normalize_weight
);
normalize_weight_fn!(
    axial_angular_integration_syntax_normalize_length_weight,
    normalize::angular_integration_syntax_normalize_weight
);
normalize_weight_fn!(
    axial_angular_integration_hillier_normalize_length_weight,
    normalize::angular_integration_hillier_normalize_weight
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_map_roundtrip() {
        let coords = [-1.0f64, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 1.0];
        let sections = [2i32, 2];
        let desc = CreateSegmentMapDesc {
            version: CREATE_SEGMENT_MAP_VERSION,
            snap: 0.1,
            extrude_cut: 0.0,
            min_tail: 0.0,
            min_colinear_deviation: 0.0,
            road_network_type: 1,
            poly_coords: coords.as_ptr(),
            poly_sections: sections.as_ptr(),
            poly_coord_count: 4,
            poly_section_count: 2,
            unlink_coords: std::ptr::null(),
            unlink_count: 0,
            progress_callback: None,
            progress_callback_user: std::ptr::null_mut(),
        };
        let mut res = CreateSegmentMapRes {
            version: CREATE_SEGMENT_MAP_VERSION,
            segment_coords: std::ptr::null(),
            segments: std::ptr::null(),
            segment_count: 0,
            unlink_coords: std::ptr::null(),
            unlink_count: 0,
        };
        unsafe {
            let handle = axial_create_segment_map(&desc, &mut res);
            assert!(!handle.is_null());
            // Crossing strokes split into four segments.
            assert_eq!(res.segment_count, 4);
            assert!(!res.segments.is_null());
            axial_free(handle);
        }
    }

    #[test]
    fn test_junctions_roundtrip() {
        let coords0 = [0.0f64, 0.0, 2.0, 0.0];
        let lines0 = [0u32, 1];
        let coords1 = [1.0f64, 1.0, 1.0, -1.0];
        let lines1 = [0u32, 1];
        let desc = CreateJunctionsDesc {
            version: CREATE_JUNCTIONS_VERSION,
            coords0: coords0.as_ptr(),
            lines0: lines0.as_ptr(),
            line_count0: 1,
            coords1: coords1.as_ptr(),
            lines1: lines1.as_ptr(),
            line_count1: 1,
            unlink_coords: std::ptr::null(),
            unlink_count: 0,
            progress_callback: None,
            progress_callback_user: std::ptr::null_mut(),
        };
        let mut res = CreateJunctionsRes {
            version: CREATE_JUNCTIONS_VERSION,
            point_coords: std::ptr::null(),
            point_count: 0,
        };
        unsafe {
            let handle = axial_create_junctions(&desc, &mut res);
            assert!(!handle.is_null());
            assert_eq!(res.point_count, 1);
            assert_eq!(*res.point_coords, 1.0);
            axial_free(handle);
        }
    }

    #[test]
    fn test_isovist_roundtrip() {
        let ctx_desc = CreateIsovistContextDesc {
            version: CREATE_ISOVIST_CONTEXT_VERSION,
            obstacle_polygons: CPolygons {
                group_count: 0,
                polygon_count_per_group: std::ptr::null(),
                point_count_per_polygon: std::ptr::null(),
                coords: std::ptr::null(),
            },
            attraction_points: CPoints {
                group_count: 0,
                point_count_per_group: std::ptr::null(),
                coords: std::ptr::null(),
            },
            attraction_polygons: CPolygons {
                group_count: 0,
                polygon_count_per_group: std::ptr::null(),
                point_count_per_polygon: std::ptr::null(),
                coords: std::ptr::null(),
            },
            progress_callback: None,
            progress_callback_user: std::ptr::null_mut(),
        };
        unsafe {
            let ctx = axial_create_isovist_context(&ctx_desc);
            assert!(!ctx.is_null());
            let mut desc = CalculateIsovistDesc {
                version: CALCULATE_ISOVIST_VERSION,
                isovist_context: ctx,
                origin_x: 0.0,
                origin_y: 0.0,
                max_view_distance: 5.0,
                field_of_view_degrees: 360.0,
                direction_degrees: 0.0,
                perimeter_segment_count: 4,
                out_point_count: 0,
                out_points: std::ptr::null(),
                out_isovist_handle: std::ptr::null_mut(),
                out_area: 0.0,
                out_visible_obstacles: CVisibleObjects::default(),
                out_visible_attraction_points: CVisibleObjects::default(),
                out_visible_attraction_polygons: CVisibleObjects::default(),
                progress_callback: None,
                progress_callback_user: std::ptr::null_mut(),
            };
            assert!(axial_calculate_isovist(&mut desc));
            assert_eq!(desc.out_point_count, 4);
            let area = std::f32::consts::PI * 25.0;
            assert!((desc.out_area - area).abs() / area < 1e-5);
            axial_free(desc.out_isovist_handle);
            axial_free_isovist_context(ctx);
        }
    }

    #[test]
    fn test_compare_and_vectorize_roundtrip() {
        let lines = [0.0f64, 0.0, 10.0, 0.0];
        let values1 = [1.0f32];
        let values2 = [2.0f32];
        let mut desc = CompareResultsDesc {
            version: COMPARE_RESULTS_VERSION,
            line_count1: 1,
            line_coords1: lines.as_ptr(),
            values1: values1.as_ptr(),
            line_count2: 1,
            line_coords2: lines.as_ptr(),
            values2: values2.as_ptr(),
            mode: 0,
            resolution: 1.0,
            blur_radius: 1.0,
            progress_callback: None,
            progress_callback_user: std::ptr::null_mut(),
            out_gradient_raster: std::ptr::null_mut(),
            out_min: 0.0,
            out_max: 0.0,
        };
        unsafe {
            assert!(axial_compare_results(&mut desc));
            assert!(!desc.out_gradient_raster.is_null());
            assert!(desc.out_max > 0.0);

            let mut data = RasterData {
                version: RASTER_DATA_VERSION,
                bb_min_x: 0.0,
                bb_min_y: 0.0,
                bb_max_x: 0.0,
                bb_max_y: 0.0,
                width: 0,
                height: 0,
                pitch: 0,
                format: 0,
                bits: std::ptr::null(),
            };
            assert!(axial_get_raster_data(desc.out_gradient_raster, &mut data));
            assert!(data.width > 0 && data.height > 0);
            assert_eq!(data.format, RASTER_FORMAT_FLOAT);

            let ranges = [0.25f32, 1.0];
            let mut polys = RasterToPolygonsDesc {
                version: RASTER_TO_POLYGONS_VERSION,
                raster: desc.out_gradient_raster,
                ranges: ranges.as_ptr(),
                range_count: 1,
                progress_callback: None,
                progress_callback_user: std::ptr::null_mut(),
                out_polygon_count_per_range: std::ptr::null(),
                out_point_count_per_polygon: std::ptr::null(),
                out_polygon_coords: std::ptr::null(),
            };
            let handle = axial_raster_to_polygons(&mut polys);
            assert!(!handle.is_null());
            assert!(*polys.out_polygon_count_per_range >= 1);
            axial_free(handle);
            axial_free(desc.out_gradient_raster);
        }
    }

    #[test]
    fn test_normalize_ffi() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let counts = [1u32, 2, 3, 4, 5];
        let mut out = [0.0f32; 5];
        unsafe {
            assert!(axial_standard_normalize(
                values.as_ptr(),
                5,
                out.as_mut_ptr()
            ));
            assert_eq!(out, [0.0, 0.25, 0.5, 0.75, 1.0]);
            assert!(axial_choice_normalize(
                values.as_ptr(),
                counts.as_ptr(),
                5,
                out.as_mut_ptr()
            ));
            assert!((out[2] - 1.5).abs() < 1e-5);
        }
    }
}
