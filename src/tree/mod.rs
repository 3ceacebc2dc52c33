#![forbid(unsafe_code)]

//! Upstream and downstream trees derived from a [`SegmentTable`].
//!
//! An upstream tree maps every segment in scope to the segments draining into
//! it; a downstream tree maps it to the segment it drains into. Both can be
//! restricted to a single stream order, in which case they only describe
//! same-order connectivity.
//!
//! Two builders produce trees: the grouped index in this module (one pass over
//! the table) and the per-id scan in [`reference`], which exists as the
//! correctness oracle. They must agree on every key and value.

use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use smallvec::SmallVec;

use crate::types::{Direction, SegmentId, StreamOrder};

mod index;
pub mod reference;

pub use index::{build_downstream_tree, build_tree, build_upstream_tree};

/// Parent list of an upstream tree node. Confluences rarely exceed two inflows.
pub type Parents = SmallVec<[SegmentId; 2]>;

/// Value stored for a tree key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeValue {
    /// The single next-down id of a downstream tree node (may be the outlet).
    Single(SegmentId),
    /// The ordered parent ids of an upstream tree node (may be empty).
    Many(Parents),
}

impl TreeValue {
    /// The ids held by this value, in order.
    pub fn ids(&self) -> &[SegmentId] {
        match self {
            TreeValue::Single(id) => std::slice::from_ref(id),
            TreeValue::Many(ids) => ids.as_slice(),
        }
    }

    /// The first id held by this value.
    pub fn first(&self) -> Option<SegmentId> {
        self.ids().first().copied()
    }

    /// Number of ids held.
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// True for an upstream node without parents.
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

impl Serialize for TreeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TreeValue::Single(id) => serializer.serialize_i64(*id),
            TreeValue::Many(ids) => {
                let mut seq = serializer.serialize_seq(Some(ids.len()))?;
                for id in ids {
                    seq.serialize_element(id)?;
                }
                seq.end()
            }
        }
    }
}

/// Counters collected while building a tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Extra same-order parents dropped from order-filtered upstream trees.
    pub dropped_parents: usize,
}

/// An immutable tree keyed by segment id.
///
/// Keys iterate in the source table's row order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    direction: Direction,
    order: Option<StreamOrder>,
    keys: Vec<SegmentId>,
    values: FxHashMap<SegmentId, TreeValue>,
    stats: BuildStats,
}

impl Tree {
    pub(crate) fn from_parts(
        direction: Direction,
        order: Option<StreamOrder>,
        entries: Vec<(SegmentId, TreeValue)>,
        stats: BuildStats,
    ) -> Self {
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = FxHashMap::default();
        values.reserve(entries.len());
        for (id, value) in entries {
            keys.push(id);
            values.insert(id, value);
        }
        Self {
            direction,
            order,
            keys,
            values,
            stats,
        }
    }

    /// Builds a tree from explicit `(key, value)` entries, keeping their order.
    ///
    /// Lets callers load trees that did not come from a [`SegmentTable`]; no
    /// connectivity checks are made.
    ///
    /// [`SegmentTable`]: crate::table::SegmentTable
    pub fn from_entries(
        direction: Direction,
        order: Option<StreamOrder>,
        entries: Vec<(SegmentId, TreeValue)>,
    ) -> Self {
        Self::from_parts(direction, order, entries, BuildStats::default())
    }

    /// Direction the tree points.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Stream order the tree was restricted to, if any.
    pub fn order(&self) -> Option<StreamOrder> {
        self.order
    }

    /// Value stored for `id`.
    pub fn get(&self, id: SegmentId) -> Option<&TreeValue> {
        self.values.get(&id)
    }

    /// True when `id` is a key.
    pub fn contains(&self, id: SegmentId) -> bool {
        self.values.contains_key(&id)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the tree has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in source order.
    pub fn keys(&self) -> &[SegmentId] {
        &self.keys
    }

    /// Iterates `(key, value)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &TreeValue)> + '_ {
        self.keys.iter().map(move |id| (*id, &self.values[id]))
    }

    /// True when no key maps to more than one id.
    pub fn is_single_valued(&self) -> bool {
        self.values.values().all(|value| value.len() <= 1)
    }

    /// Build counters.
    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len()))?;
        for (id, value) in self.iter() {
            map.serialize_entry(&id.to_string(), value)?;
        }
        map.end()
    }
}
