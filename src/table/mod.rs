#![forbid(unsafe_code)]

//! Segment tables: the flat `(id, next_down_id, order)` relation every tree is
//! derived from.
//!
//! Identifiers are normalized to [`SegmentId`] once, while the table is built,
//! so tree construction and traversal never deal with mixed numeric types.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::{AdjoinError, Result, SegmentId, StreamOrder, OUTLET};

mod import;

pub use import::{normalize_id, normalize_order};

/// One network segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Unique identifier within the region.
    pub id: SegmentId,
    /// Identifier of the segment this one drains into, or [`OUTLET`].
    pub next_down: SegmentId,
    /// Stream order, when the source carries one.
    pub order: Option<StreamOrder>,
}

impl Segment {
    /// Creates a segment.
    pub fn new(id: SegmentId, next_down: SegmentId, order: Option<StreamOrder>) -> Self {
        Self {
            id,
            next_down,
            order,
        }
    }

    /// True when the segment has no downstream neighbor.
    pub fn is_outlet(&self) -> bool {
        self.next_down == OUTLET
    }

    /// True when the segment belongs to the given order filter (`None` keeps all).
    pub fn in_scope(&self, order: Option<StreamOrder>) -> bool {
        match order {
            Some(order) => self.order == Some(order),
            None => true,
        }
    }
}

/// Names of the source columns holding id, next-down id and stream order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Column with the unique segment identifier.
    pub id: String,
    /// Column with the identifier of the next segment downstream.
    pub next_down: String,
    /// Column with the stream order.
    pub order: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "COMID".to_string(),
            next_down: "NextDownID".to_string(),
            order: "order_".to_string(),
        }
    }
}

impl ColumnNames {
    /// Creates a set of column names.
    pub fn new(
        id: impl Into<String>,
        next_down: impl Into<String>,
        order: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            next_down: next_down.into(),
            order: order.into(),
        }
    }

    /// Column layout of GEOGloWS delineation catchments joined with drainage lines.
    pub fn geoglows_catchments() -> Self {
        Self::new("HydroID", "NextDownID", "order_")
    }
}

/// An immutable, validated segment table.
///
/// Rows keep their source order; sibling order in upstream trees and key order
/// in adjoint dictionaries both follow it.
#[derive(Clone, Debug)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    positions: FxHashMap<SegmentId, usize>,
    columns: ColumnNames,
    has_order: bool,
}

impl SegmentTable {
    /// Builds a table from in-memory segments using the default column names.
    ///
    /// The order column counts as present when at least one segment carries an
    /// order.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        let has_order = segments.iter().any(|segment| segment.order.is_some());
        Self::with_columns(segments, ColumnNames::default(), has_order)
    }

    /// Builds a table, recording which columns it was read with.
    ///
    /// Fails when an id is the outlet sentinel or appears twice.
    pub fn with_columns(
        segments: Vec<Segment>,
        columns: ColumnNames,
        has_order: bool,
    ) -> Result<Self> {
        let mut positions = FxHashMap::default();
        positions.reserve(segments.len());
        for (idx, segment) in segments.iter().enumerate() {
            if segment.id == OUTLET {
                return Err(AdjoinError::InvalidValue {
                    row: idx + 1,
                    column: columns.id.clone(),
                    value: segment.id.to_string(),
                });
            }
            if positions.insert(segment.id, idx).is_some() {
                return Err(AdjoinError::DuplicateSegment(segment.id));
            }
        }
        Ok(Self {
            segments,
            positions,
            columns,
            has_order,
        })
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in source order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates segments in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter()
    }

    /// Iterates segment ids in source order.
    pub fn ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments.iter().map(|segment| segment.id)
    }

    /// Looks up a segment by id.
    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.positions.get(&id).map(|&idx| &self.segments[idx])
    }

    /// True when the table contains the id.
    pub fn contains(&self, id: SegmentId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Column names the table was read with.
    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    /// True when the source provided an order column.
    pub fn has_order_column(&self) -> bool {
        self.has_order
    }

    /// Fails with a schema error unless the order column is present.
    pub fn require_order(&self) -> Result<()> {
        if self.has_order {
            Ok(())
        } else {
            Err(AdjoinError::missing_columns([self.columns.order.clone()]))
        }
    }

    /// Distinct stream orders present in the table, ascending.
    pub fn orders(&self) -> Vec<StreamOrder> {
        let mut orders: Vec<StreamOrder> = self.segments.iter().filter_map(|s| s.order).collect();
        orders.sort_unstable();
        orders.dedup();
        orders
    }
}
