//! # axial-algo: Spatial Network Analyses
//!
//! The analysis families of the engine, all built on one radius-bounded
//! multi-metric traversal kernel:
//!
//! | Analysis | Graph | Module |
//! |----------|-------|--------|
//! | Reach | axial | [`reach`] |
//! | Network integration | axial | [`integration`] |
//! | Angular integration / choice | segment | [`angular`] |
//! | Segment betweenness (Brandes) | axial | [`betweenness`] |
//! | Fast segment betweenness (tree) | segment | [`betweenness`] |
//! | OD betweenness | axial | [`odbetweenness`] |
//! | Attraction distance / reach | axial | [`attraction`] |
//! | Segment grouping (+ coloring) | segment | [`grouping`] |
//! | Segment group integration | group | [`integration`] |
//!
//! plus two standalone pipelines: isovist visibility polygons
//! ([`isovist`]) and the raster compare/vectorize chain ([`raster`]), and
//! the score normalization family ([`normalize`]).
//!
//! Analyses parallelize over origins with private accumulators reduced at
//! the end; given identical inputs the outputs do not depend on the worker
//! count. All are cancellable through the progress sink.

pub mod angular;
pub mod arena;
pub mod attraction;
pub mod betweenness;
pub mod grouping;
pub mod integration;
pub mod isovist;
pub mod normalize;
pub mod odbetweenness;
pub mod raster;
pub mod reach;
pub mod traversal;

pub use angular::{
    angular_choice, angular_integration, AngularChoiceResult, AngularIntegrationResult,
    AngularOptions,
};
pub use arena::ArenaContext;
pub use attraction::{
    attraction_distance, attraction_reach, AttractionSet, CollectionFunc, DistributionFunc,
    WeightFunc,
};
pub use betweenness::{
    fast_segment_betweenness, segment_betweenness, BetweennessResult, BetweennessSources,
};
pub use grouping::{segment_grouping, GroupingResult};
pub use integration::{
    integration_score, network_integration, segment_group_integration, GroupIntegrationResult,
    NetworkIntegrationResult,
};
pub use isovist::{
    calculate_isovist, Isovist, IsovistContext, IsovistQuery, PointSet, PolygonSet,
};
pub use odbetweenness::{od_betweenness, DestinationMode};
pub use raster::{compare_results, raster_to_polygons, CompareMode, Raster};
pub use reach::{reach, ReachResult};
pub use traversal::{AxialExplorer, OriginSpec, SegmentConfig, TraversalConfig};
