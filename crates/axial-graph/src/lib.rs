//! # axial-graph: Street Network Graph Models
//!
//! Builds the three graph forms every analysis runs on:
//!
//! - [`AxialGraph`]: input lines with implicit junctions (derived from
//!   clustered shared endpoints *and* interior line/line crossings), unlink
//!   resolution, and origin points attached by perpendicular projection
//! - [`SegmentGraph`]: one vertex per line, edges at shared endpoints
//!   carrying the turn angle between travel directions
//! - [`SegmentGroupGraph`]: quotient of the segment graph under a caller
//!   supplied grouping
//!
//! plus two standalone geometry tools: junction enumeration across map
//! layers ([`junctions`]) and segment-map cleanup ([`cleanup`]).
//!
//! All graphs are immutable after construction and safe to share between
//! concurrent analyses.

pub mod axial;
pub mod cleanup;
pub mod group;
pub mod junctions;
pub mod segment;

pub use axial::{
    sample_polygon_points, AttachedPoint, AxialBuildConfig, AxialGraph, Crossing, GraphInfo,
};
pub use cleanup::{CleanupConfig, RoadNetworkKind, SegmentMap, SegmentRecord};
pub use group::{GroupEdge, SegmentGroupGraph};
pub use junctions::{find_layer_junctions, JunctionLayer};
pub use segment::{Segment, SegmentEdge, SegmentGraph, SegmentJunction};
