//! Per-id scan builders.
//!
//! Each key re-scans the whole table, which is quadratic but obviously
//! correct. Tests compare the grouped builders against these.

use super::{BuildStats, Parents, Tree, TreeValue};
use crate::table::SegmentTable;
use crate::types::{Direction, Result, StreamOrder, OUTLET};

/// Scan-based equivalent of [`super::build_upstream_tree`].
pub fn build_upstream_tree(table: &SegmentTable, order: Option<StreamOrder>) -> Result<Tree> {
    if order.is_some() {
        table.require_order()?;
    }

    let mut stats = BuildStats::default();
    let mut entries = Vec::new();
    for key in table.iter().filter(|s| s.in_scope(order)) {
        let mut parents: Parents = table
            .iter()
            .filter(|s| s.in_scope(order) && s.next_down != OUTLET && s.next_down == key.id)
            .map(|s| s.id)
            .collect();
        if order.is_some() && parents.len() > 1 {
            stats.dropped_parents += parents.len() - 1;
            parents.truncate(1);
        }
        entries.push((key.id, TreeValue::Many(parents)));
    }
    Ok(Tree::from_parts(Direction::Upstream, order, entries, stats))
}

/// Scan-based equivalent of [`super::build_downstream_tree`].
pub fn build_downstream_tree(table: &SegmentTable, order: Option<StreamOrder>) -> Result<Tree> {
    if order.is_some() {
        table.require_order()?;
    }

    let mut entries = Vec::new();
    for key in table.iter().filter(|s| s.in_scope(order)) {
        let eligible = order.is_none()
            || table
                .iter()
                .any(|s| s.in_scope(order) && s.id == key.next_down);
        let next_down = if eligible { key.next_down } else { OUTLET };
        entries.push((key.id, TreeValue::Single(next_down)));
    }
    Ok(Tree::from_parts(
        Direction::Downstream,
        order,
        entries,
        BuildStats::default(),
    ))
}
