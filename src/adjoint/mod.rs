#![forbid(unsafe_code)]

//! Adjoint dictionaries: every segment mapped to its traced chain.
//!
//! This module drives tree construction and tracing over whole tables,
//! persists the results per region without ever overwriting an existing
//! output, and unions per-region results into one combined dictionary.

mod build;
mod map;
mod merge;
mod options;
mod persist;

/// Single-table and per-region builders.
///
/// [`build`] computes a dictionary in memory; [`build_region`] and
/// [`build_regions`] add the output-file cache on top of it.
pub use build::{
    build, build_region, build_regions, AdjointBuild, BatchReport, RegionJob, RegionOutcome,
    TraceStats,
};

/// Ordered `id -> [ids]` mapping with its JSON encoding.
pub use map::AdjointMap;

/// Region merging with collision bookkeeping.
pub use merge::{merge_maps, merge_regions, Collision, MergeOutcome, MergeReport};

/// Builder configuration.
pub use options::AdjointOptions;

/// Output naming and no-overwrite persistence helpers.
pub use persist::{region_name, region_output_path, write_json_new};
