#![forbid(unsafe_code)]

//! Chain tracing over upstream and downstream trees.
//!
//! [`trace`] is a breadth-first walk that works on either tree shape and stops
//! after a caller-supplied number of dequeues, so cyclic source data cannot
//! hang it. [`trace_linear`] follows a single successor per hop and is meant
//! for order-filtered trees, where every node has at most one neighbor in the
//! walk direction.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::tree::{Tree, TreeValue};
use crate::types::{AdjoinError, Direction, Result, SegmentId, OUTLET};

/// Default number of dequeues after which a trace gives up.
pub const DEFAULT_CUTOFF: usize = 200;

/// Options controlling a breadth-first trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TraceOptions {
    /// Maximum number of frontier entries processed per trace.
    pub cutoff: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

/// Result of a breadth-first trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Trace {
    /// Visited ids in discovery order, starting with the start id.
    pub ids: Vec<SegmentId>,
    /// Frontier entries processed.
    pub dequeues: usize,
    /// True when the cutoff stopped the walk before the frontier emptied.
    pub truncated: bool,
    /// Ids still waiting in the frontier when the cutoff stopped the walk.
    pub pending: usize,
}

impl Trace {
    /// True when the cutoff stopped the walk before the frontier emptied.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Consumes the trace, returning the visited ids.
    pub fn into_ids(self) -> Vec<SegmentId> {
        self.ids
    }
}

/// Walks `tree` breadth-first from `start`.
///
/// Each dequeued entry appends its non-outlet ids to the result and enqueues
/// the tree value of every id that is a key. The walk stops when the frontier
/// empties or after `cutoff` dequeues; in the latter case
/// [`Trace::pending`] counts the ids left unvisited.
pub fn trace(tree: &Tree, start: SegmentId, cutoff: usize) -> Trace {
    let seed = TreeValue::Single(start);
    let mut frontier: VecDeque<&TreeValue> = VecDeque::new();
    frontier.push_back(&seed);

    let mut ids = Vec::new();
    let mut dequeues = 0;
    while dequeues < cutoff {
        let Some(entry) = frontier.pop_front() else {
            break;
        };
        dequeues += 1;
        match entry {
            TreeValue::Single(id) => visit(tree, *id, &mut ids, &mut frontier),
            TreeValue::Many(members) => {
                for id in members {
                    visit(tree, *id, &mut ids, &mut frontier);
                }
            }
        }
    }

    let pending = frontier
        .iter()
        .flat_map(|entry| entry.ids())
        .filter(|&&id| id != OUTLET)
        .count();
    Trace {
        ids,
        dequeues,
        truncated: pending > 0,
        pending,
    }
}

fn visit<'t>(
    tree: &'t Tree,
    id: SegmentId,
    ids: &mut Vec<SegmentId>,
    frontier: &mut VecDeque<&'t TreeValue>,
) {
    if id == OUTLET {
        return;
    }
    ids.push(id);
    if let Some(value) = tree.get(id) {
        frontier.push_back(value);
    }
}

/// Follows the single successor of each node from `start`.
///
/// Upstream trees are followed while a node has a parent; downstream trees
/// while the next-down id is itself a key. Multi-parent nodes only contribute
/// their first parent, so callers should use [`trace`] on unfiltered upstream
/// trees.
///
/// # Errors
///
/// * [`AdjoinError::UnknownId`] when `start`, or a parent reached on the way,
///   is not a key of the tree.
/// * [`AdjoinError::CycleDetected`] when the chain revisits an id.
pub fn trace_linear(tree: &Tree, start: SegmentId) -> Result<Vec<SegmentId>> {
    let mut chain = vec![start];
    let mut visited = FxHashSet::default();
    visited.insert(start);
    let mut current = start;
    loop {
        let value = tree.get(current).ok_or(AdjoinError::UnknownId(current))?;
        let next = match (tree.direction(), value.first()) {
            (_, None) | (_, Some(OUTLET)) => break,
            (Direction::Upstream, Some(parent)) => parent,
            (Direction::Downstream, Some(next_down)) if tree.contains(next_down) => next_down,
            (Direction::Downstream, Some(_)) => break,
        };
        if !tree.contains(next) {
            return Err(AdjoinError::UnknownId(next));
        }
        if !visited.insert(next) {
            return Err(AdjoinError::CycleDetected {
                start,
                steps: chain.len(),
            });
        }
        chain.push(next);
        current = next;
    }
    Ok(chain)
}
