//! Adjoint catchment lookups for river segment networks.
//!
//! Given a segment table of `(id, next_down_id, order)` rows, this crate builds
//! upstream or downstream trees, traces every segment's chain through them and
//! persists the resulting `id -> [connected ids]` dictionaries per region.

#![warn(missing_docs)]

pub mod adjoint;
pub mod check;
pub mod table;
pub mod trace;
pub mod tree;
pub mod types;

pub use adjoint::{build, AdjointMap, AdjointOptions};
pub use table::{ColumnNames, Segment, SegmentTable};
pub use trace::{trace, trace_linear, Trace, TraceOptions, DEFAULT_CUTOFF};
pub use tree::{build_downstream_tree, build_upstream_tree, Tree, TreeValue};
pub use types::{AdjoinError, Direction, Result, SegmentId, StreamOrder, OUTLET};
