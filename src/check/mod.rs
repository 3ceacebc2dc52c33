#![forbid(unsafe_code)]

//! Consistency checks for persisted adjoint dictionaries.
//!
//! A dictionary is checked against the segment table it was built from: every
//! segment needs an entry, every entry must start with its key, and every
//! listed id must hang off the chain before it in the traced direction.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::adjoint::AdjointMap;
use crate::table::SegmentTable;
use crate::types::{Direction, SegmentId, StreamOrder, OUTLET};

/// Maximum number of findings kept in a report. Counts stay exact.
pub const MAX_FINDINGS: usize = 32;

/// Severity of a check finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    /// Informational note.
    Info,
    /// Suspicious but not inconsistent, such as a repeated id.
    Warning,
    /// The dictionary disagrees with the table.
    Error,
}

/// A single problem found by [`check_adjoint`].
#[derive(Clone, Debug, Serialize)]
pub struct CheckFinding {
    /// How serious the problem is.
    pub severity: CheckSeverity,
    /// Entry the problem was found in, if it concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<SegmentId>,
    /// Human-readable description.
    pub message: String,
}

/// Totals gathered while checking.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckCounts {
    /// Entries examined.
    pub entries: u64,
    /// Ids examined across all entries.
    pub ids: u64,
    /// Table segments without an entry.
    pub missing_keys: u64,
    /// Entries whose key is not a table segment.
    pub extra_keys: u64,
    /// Error findings, including those beyond [`MAX_FINDINGS`].
    pub errors: u64,
    /// Warning findings, including those beyond [`MAX_FINDINGS`].
    pub warnings: u64,
}

/// Outcome of [`check_adjoint`].
#[derive(Clone, Debug, Serialize)]
pub struct CheckReport {
    /// Direction the dictionary was checked as.
    pub direction: Direction,
    /// Stream order the dictionary was checked against, if any.
    pub order: Option<StreamOrder>,
    /// True when no error was found.
    pub success: bool,
    /// The first [`MAX_FINDINGS`] findings.
    pub findings: Vec<CheckFinding>,
    /// Totals.
    pub counts: CheckCounts,
}

/// Checks `map` against `table` as a `direction` dictionary.
///
/// With an order filter, entries of in-scope segments may only list
/// segments of that order.
pub fn check_adjoint(
    table: &SegmentTable,
    map: &AdjointMap,
    direction: Direction,
    order: Option<StreamOrder>,
) -> CheckReport {
    let mut findings = Findings::default();

    for segment in table.iter() {
        if !map.contains_key(segment.id) {
            findings.counts.missing_keys += 1;
            findings.error(Some(segment.id), "segment has no entry");
        }
    }

    for (key, chain) in map.iter() {
        findings.counts.entries += 1;
        findings.counts.ids += chain.len() as u64;
        if !table.contains(key) {
            findings.counts.extra_keys += 1;
            findings.warning(Some(key), "entry key is not a segment of the table");
            continue;
        }
        match chain.first() {
            None => {
                findings.error(Some(key), "entry is empty");
                continue;
            }
            Some(&first) if first != key => {
                findings.error(Some(key), format!("entry starts with {first}"));
                continue;
            }
            Some(_) => {}
        }
        match direction {
            Direction::Upstream => check_upstream(table, key, chain, order, &mut findings),
            Direction::Downstream => check_downstream(table, key, chain, order, &mut findings),
        }
    }

    let omitted = findings.omitted();
    if omitted > 0 {
        findings.items.push(CheckFinding {
            severity: CheckSeverity::Info,
            key: None,
            message: format!("{omitted} further finding(s) omitted"),
        });
    }
    CheckReport {
        direction,
        order,
        success: findings.counts.errors == 0,
        findings: findings.items,
        counts: findings.counts,
    }
}

fn check_upstream(
    table: &SegmentTable,
    key: SegmentId,
    chain: &[SegmentId],
    order: Option<StreamOrder>,
    findings: &mut Findings,
) {
    let filtered = order.is_some() && table.get(key).is_some_and(|s| s.in_scope(order));
    let mut seen: FxHashSet<SegmentId> = FxHashSet::default();
    seen.insert(key);
    let mut repeated = false;
    for &id in &chain[1..] {
        let Some(segment) = table.get(id) else {
            findings.error(Some(key), format!("unknown segment {id}"));
            continue;
        };
        if !seen.contains(&segment.next_down) {
            findings.error(
                Some(key),
                format!("{id} drains into {}, which is not earlier in the entry", segment.next_down),
            );
        }
        if filtered && !segment.in_scope(order) {
            findings.error(Some(key), format!("{id} is not of order {}", display_order(order)));
        }
        if !seen.insert(id) && !repeated {
            repeated = true;
            findings.warning(Some(key), format!("{id} is listed more than once"));
        }
    }
}

fn check_downstream(
    table: &SegmentTable,
    key: SegmentId,
    chain: &[SegmentId],
    order: Option<StreamOrder>,
    findings: &mut Findings,
) {
    let filtered = order.is_some() && table.get(key).is_some_and(|s| s.in_scope(order));
    let mut seen: FxHashSet<SegmentId> = FxHashSet::default();
    seen.insert(key);
    let mut repeated = false;
    for (pos, pair) in chain.windows(2).enumerate() {
        let (prev, id) = (pair[0], pair[1]);
        let Some(upper) = table.get(prev) else {
            // Reported when `prev` itself was checked.
            continue;
        };
        if upper.next_down != id {
            findings.error(
                Some(key),
                format!("{id} follows {prev}, which drains into {}", upper.next_down),
            );
        }
        match table.get(id) {
            Some(segment) => {
                if filtered && !segment.in_scope(order) {
                    findings.error(Some(key), format!("{id} is not of order {}", display_order(order)));
                }
            }
            // A next-down id outside the table may close an unfiltered chain.
            None if !filtered && pos + 2 == chain.len() && id != OUTLET => {}
            None => findings.error(Some(key), format!("unknown segment {id}")),
        }
        if !seen.insert(id) && !repeated {
            repeated = true;
            findings.warning(Some(key), format!("{id} is listed more than once"));
        }
    }
}

fn display_order(order: Option<StreamOrder>) -> StreamOrder {
    order.unwrap_or_default()
}

#[derive(Default)]
struct Findings {
    items: Vec<CheckFinding>,
    counts: CheckCounts,
}

impl Findings {
    fn error(&mut self, key: Option<SegmentId>, message: impl Into<String>) {
        self.counts.errors += 1;
        self.push(CheckSeverity::Error, key, message);
    }

    fn warning(&mut self, key: Option<SegmentId>, message: impl Into<String>) {
        self.counts.warnings += 1;
        self.push(CheckSeverity::Warning, key, message);
    }

    fn push(&mut self, severity: CheckSeverity, key: Option<SegmentId>, message: impl Into<String>) {
        if self.items.len() < MAX_FINDINGS {
            self.items.push(CheckFinding {
                severity,
                key,
                message: message.into(),
            });
        }
    }

    fn omitted(&self) -> u64 {
        (self.counts.errors + self.counts.warnings).saturating_sub(self.items.len() as u64)
    }
}
