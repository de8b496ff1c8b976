//! # axial-ffi: C ABI for the spatial network analytics engine
//!
//! Every operation takes one descriptor struct by pointer. Descriptors
//! carry a `version` field first and a nullable progress callback;
//! successful calls return `true`, failures return `false` after logging
//! through the registered log callbacks. Graphs, isovist contexts and
//! result buffers cross the boundary as opaque handles with explicit free
//! calls; array arguments are raw pointers plus element counts; the engine
//! performs no file I/O and reads no environment except the opt-in
//! `AXIAL_DEBUG` diagnostics flag.

mod analyses;
mod callback;
mod graphs;
mod tools;

pub use analyses::*;
pub use callback::{LogCallback, ProgressCallback};
pub use graphs::*;
pub use tools::*;

use axial_core::{EngineError, LogLevel, RadiusMask};
use callback::dispatch_log;
use std::ffi::{c_int, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Radius limits as they cross the boundary: active-tag mask plus one
/// scalar per tag.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CRadii {
    pub mask: u32,
    pub straight: f32,
    pub walking: f32,
    pub steps: u32,
    pub angular: f32,
    pub axmeter: f32,
    pub weights: f32,
}

impl CRadii {
    fn to_mask(self) -> Result<RadiusMask, EngineError> {
        RadiusMask::from_raw(
            self.mask,
            self.straight as f64,
            self.walking as f64,
            self.steps,
            self.angular as f64,
            self.axmeter as f64,
            self.weights as f64,
        )
        .ok_or_else(|| EngineError::BadInput(format!("unknown radius mask bits {:#x}", self.mask)))
    }
}

/// Borrow a caller array. A null pointer is an empty array only when the
/// count is zero.
///
/// # Safety
/// `ptr` must point to at least `len` readable elements when non-null.
pub(crate) unsafe fn in_slice<'a, T>(ptr: *const T, len: usize) -> Result<&'a [T], EngineError> {
    if ptr.is_null() {
        if len == 0 {
            Ok(&[])
        } else {
            Err(EngineError::BadInput(
                "null array with nonzero element count".into(),
            ))
        }
    } else {
        Ok(std::slice::from_raw_parts(ptr, len))
    }
}

/// Interleaved xy pairs to coordinates.
pub(crate) unsafe fn in_coords(
    ptr: *const f64,
    pair_count: usize,
) -> Result<Vec<axial_core::Vec2>, EngineError> {
    let raw = in_slice(ptr, pair_count * 2)?;
    Ok(raw
        .chunks_exact(2)
        .map(|c| axial_core::Vec2::new(c[0], c[1]))
        .collect())
}

/// Interleaved index pairs.
pub(crate) unsafe fn in_pairs(
    ptr: *const u32,
    pair_count: usize,
) -> Result<Vec<(u32, u32)>, EngineError> {
    let raw = in_slice(ptr, pair_count * 2)?;
    Ok(raw.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

/// Copy a result vector into an optional caller array.
///
/// # Safety
/// `ptr` must point to at least `values.len()` writable elements when
/// non-null.
pub(crate) unsafe fn out_copy<T: Copy>(ptr: *mut T, values: &[T]) {
    if !ptr.is_null() {
        std::ptr::copy_nonoverlapping(values.as_ptr(), ptr, values.len());
    }
}

pub(crate) fn expect_version(actual: u32, supported: u32) -> Result<(), EngineError> {
    if actual == supported {
        Ok(())
    } else {
        Err(EngineError::VersionMismatch(actual))
    }
}

/// Run a boundary function body behind a panic fence, converting every
/// failure into a log line plus `false`.
pub(crate) fn fence(name: &str, body: impl FnOnce() -> Result<(), EngineError>) -> bool {
    callback::init_diagnostics();
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            if err.is_cancelled() {
                dispatch_log(LogLevel::Verbose, Some(name), "cancelled by caller");
            } else {
                dispatch_log(LogLevel::Error, Some(name), &err.to_string());
            }
            false
        }
        Err(_) => {
            dispatch_log(LogLevel::Error, Some(name), "internal panic");
            false
        }
    }
}

/// As [`fence`], for constructors returning a handle (null on failure).
pub(crate) fn fence_handle<T>(
    name: &str,
    body: impl FnOnce() -> Result<*mut T, EngineError>,
) -> *mut T {
    let mut out: *mut T = std::ptr::null_mut();
    let ok = fence(name, || {
        out = body()?;
        Ok(())
    });
    if ok {
        out
    } else {
        std::ptr::null_mut()
    }
}

/// Register a log callback; returns a nonzero handle, 0 on failure.
#[no_mangle]
pub extern "C" fn axial_register_log_callback(
    callback: LogCallback,
    user_data: *mut c_void,
) -> c_int {
    callback::init_diagnostics();
    callback::register_log_callback(callback, user_data)
}

/// Remove a previously registered log callback.
#[no_mangle]
pub extern "C" fn axial_unregister_log_callback(handle: c_int) {
    callback::unregister_log_callback(handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radii_conversion() {
        let radii = CRadii {
            mask: 1 | 4,
            straight: 100.0,
            steps: 3,
            ..Default::default()
        };
        let mask = radii.to_mask().unwrap();
        assert_eq!(mask.straight_limit(), Some(100.0));
        assert_eq!(mask.steps_limit(), Some(3));
        assert_eq!(mask.walking_limit(), None);

        let bad = CRadii {
            mask: 1 << 10,
            ..Default::default()
        };
        assert!(bad.to_mask().is_err());
    }

    #[test]
    fn test_in_slice_null_rules() {
        unsafe {
            assert!(in_slice::<f64>(std::ptr::null(), 0).unwrap().is_empty());
            assert!(in_slice::<f64>(std::ptr::null(), 3).is_err());
        }
    }

    #[test]
    fn test_version_guard() {
        assert!(expect_version(1, 1).is_ok());
        assert!(matches!(
            expect_version(2, 1),
            Err(EngineError::VersionMismatch(2))
        ));
    }
}
