//! # axial-core: Spatial Network Model Core
//!
//! Foundation crate for the spatial network analytics engine: geometry
//! primitives, the uniform-grid broad-phase index, the radius mask / depth
//! vector pair shared by every traversal, typed entity ids, and the
//! progress/log boundary.
//!
//! ## Design Philosophy
//!
//! Street networks are modeled as index-addressed component vectors rather
//! than pointer graphs:
//!
//! - **Lines**: straight sight/segment lines, identified by stable 32-bit
//!   indices into the caller-supplied line array
//! - **Junctions**: implicit crossings derived at build time
//! - **Points**: exogenous origins/destinations attached to their nearest
//!   line by perpendicular projection
//!
//! The arena+index layout keeps handles trivially shareable across
//! concurrent analyses (graphs are read-only after construction) and avoids
//! lifetime tangles in the grouping and merging paths.
//!
//! ## Modules
//!
//! - [`geometry`] - vector math, intersections, hulls, bounding boxes
//! - [`grid`] - uniform-grid broad-phase index
//! - [`radius`] - radius mask and multi-metric depth vector
//! - [`progress`] - progress/cancel sink and severity-tagged log dispatch
//! - [`error`] - unified error type
//! - [`units`] - unit newtypes for API surfaces

use serde::{Deserialize, Serialize};

pub mod error;
pub mod geometry;
pub mod grid;
pub mod progress;
pub mod radius;
pub mod units;

pub use error::{EngineError, EngineResult};
pub use geometry::{BoundingBox, Vec2};
pub use grid::GridIndex;
pub use progress::{check_cancel, LogLevel, NullProgress, ProgressSink, SubProgress};
pub use radius::{DepthVector, DistanceMode, OriginType, RadiusMask};
pub use units::{Degrees, Meters};

// Newtype wrappers for entity ids for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u32);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            #[inline]
            pub fn new(value: u32) -> Self {
                $name(value)
            }
            #[inline]
            pub fn value(&self) -> u32 {
                self.0
            }
            #[inline]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

impl_id!(LineId);
impl_id!(JunctionId);
impl_id!(PointId);
impl_id!(GroupId);

/// Guard for the 32-bit index space shared by all entity vectors.
pub fn checked_entity_count(count: usize, what: &str) -> EngineResult<u32> {
    u32::try_from(count)
        .map_err(|_| EngineError::MemoryLimit(format!("{what} count {count} exceeds index space")))
}
