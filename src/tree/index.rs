use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::{BuildStats, Parents, Tree, TreeValue};
use crate::table::SegmentTable;
use crate::types::{Direction, Result, SegmentId, StreamOrder, OUTLET};

/// Builds the tree for `direction`, optionally restricted to one stream order.
pub fn build_tree(
    table: &SegmentTable,
    direction: Direction,
    order: Option<StreamOrder>,
) -> Result<Tree> {
    match direction {
        Direction::Upstream => build_upstream_tree(table, order),
        Direction::Downstream => build_downstream_tree(table, order),
    }
}

/// Maps every segment in scope to the ids draining into it.
///
/// Parents are grouped by next-down id in a single pass, so siblings keep the
/// table's row order. With an order filter only same-order parents count and
/// at most the first one is kept.
pub fn build_upstream_tree(table: &SegmentTable, order: Option<StreamOrder>) -> Result<Tree> {
    if order.is_some() {
        table.require_order()?;
    }

    let mut groups: FxHashMap<SegmentId, Parents> = FxHashMap::default();
    for segment in table.iter().filter(|s| s.in_scope(order)) {
        if segment.is_outlet() {
            continue;
        }
        groups.entry(segment.next_down).or_default().push(segment.id);
    }

    let mut stats = BuildStats::default();
    let mut entries = Vec::with_capacity(table.len());
    for segment in table.iter().filter(|s| s.in_scope(order)) {
        let mut parents = groups.remove(&segment.id).unwrap_or_default();
        if order.is_some() && parents.len() > 1 {
            stats.dropped_parents += parents.len() - 1;
            parents.truncate(1);
        }
        entries.push((segment.id, TreeValue::Many(parents)));
    }

    if stats.dropped_parents > 0 {
        warn!(
            order = ?order,
            dropped = stats.dropped_parents,
            "dropped extra same-order parents while building upstream tree"
        );
    }
    debug!(order = ?order, keys = entries.len(), "built upstream tree");
    Ok(Tree::from_parts(Direction::Upstream, order, entries, stats))
}

/// Maps every segment in scope to its next-down id.
///
/// With an order filter a next-down id outside the filtered set is replaced by
/// [`OUTLET`], marking the end of the same-order chain.
pub fn build_downstream_tree(table: &SegmentTable, order: Option<StreamOrder>) -> Result<Tree> {
    if order.is_some() {
        table.require_order()?;
    }

    let scope: Option<FxHashSet<SegmentId>> = order.map(|_| {
        table
            .iter()
            .filter(|s| s.in_scope(order))
            .map(|s| s.id)
            .collect()
    });

    let entries: Vec<(SegmentId, TreeValue)> = table
        .iter()
        .filter(|s| s.in_scope(order))
        .map(|segment| {
            let next_down = match &scope {
                Some(scope) if !scope.contains(&segment.next_down) => OUTLET,
                _ => segment.next_down,
            };
            (segment.id, TreeValue::Single(next_down))
        })
        .collect();

    debug!(order = ?order, keys = entries.len(), "built downstream tree");
    Ok(Tree::from_parts(
        Direction::Downstream,
        order,
        entries,
        BuildStats::default(),
    ))
}
