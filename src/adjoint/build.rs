use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::map::AdjointMap;
use super::options::AdjointOptions;
use super::persist::{region_name, region_output_path, write_json_new};
use crate::table::SegmentTable;
use crate::trace::trace;
use crate::tree::build_tree;
use crate::types::{AdjoinError, Direction, Result, SegmentId};

/// Trace bookkeeping for one dictionary build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TraceStats {
    /// Number of segments traced.
    pub traced: usize,
    /// Number of traces stopped by the cutoff.
    pub truncated: usize,
    /// Start ids whose trace was stopped by the cutoff, in table order.
    pub truncated_ids: Vec<SegmentId>,
    /// Extra same-order parents dropped while building the tree.
    pub dropped_parents: usize,
}

/// An in-memory dictionary together with its trace statistics.
#[derive(Clone, Debug)]
pub struct AdjointBuild {
    /// `id -> chain` for every segment of the table.
    pub map: AdjointMap,
    /// Trace bookkeeping.
    pub stats: TraceStats,
}

/// Builds the adjoint dictionary of `table`.
///
/// The tree is built once and then shared read-only by parallel traces, one
/// per table row. Ids outside an order filter map to a chain holding only
/// themselves.
///
/// # Errors
///
/// Fails with a schema error when an order filter is requested and the table
/// has no order column.
pub fn build(table: &SegmentTable, opts: &AdjointOptions) -> Result<AdjointBuild> {
    let order = opts.order_filter();
    let tree = build_tree(table, opts.direction, order)?;
    let cutoff = opts.trace.cutoff;

    let traces: Vec<_> = table
        .segments()
        .par_iter()
        .map(|segment| (segment.id, trace(&tree, segment.id, cutoff)))
        .collect();

    let mut stats = TraceStats {
        traced: traces.len(),
        dropped_parents: tree.stats().dropped_parents,
        ..TraceStats::default()
    };
    let mut map = AdjointMap::with_capacity(traces.len());
    for (id, result) in traces {
        if result.is_truncated() {
            stats.truncated += 1;
            stats.truncated_ids.push(id);
        }
        map.insert(id, result.into_ids());
    }

    if stats.truncated > 0 {
        warn!(
            truncated = stats.truncated,
            cutoff,
            first = ?stats.truncated_ids.first(),
            "traces stopped at cutoff; source network may contain loops"
        );
    }
    Ok(AdjointBuild { map, stats })
}

/// One region of a batch: a segment table and where its dictionary goes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegionJob {
    /// Region label used in logs and reports.
    pub name: String,
    /// CSV segment table.
    pub input: PathBuf,
    /// Output JSON path; its existence marks the region as computed.
    pub output: PathBuf,
}

impl RegionJob {
    /// Job writing `<out_dir>/<region>-<direction>-dict.json` for `input`.
    pub fn new(input: impl Into<PathBuf>, out_dir: &Path, direction: Direction) -> Self {
        let input = input.into();
        Self {
            name: region_name(&input),
            output: region_output_path(out_dir, &input, direction),
            input,
        }
    }

    /// Job with an explicit output path.
    pub fn with_output(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let input = input.into();
        Self {
            name: region_name(&input),
            input,
            output: output.into(),
        }
    }
}

/// What happened to one region.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionOutcome {
    /// The dictionary was computed and written.
    Computed {
        /// Region label.
        region: String,
        /// Written file.
        output: PathBuf,
        /// Number of entries written.
        segments: usize,
        /// Trace bookkeeping.
        stats: TraceStats,
        /// Wall time in milliseconds.
        duration_ms: f64,
    },
    /// The output already existed; nothing was read or written.
    Skipped {
        /// Region label.
        region: String,
        /// Existing file.
        output: PathBuf,
    },
    /// The region could not be processed; other regions are unaffected.
    Failed {
        /// Region label.
        region: String,
        /// Error description.
        error: String,
    },
}

impl RegionOutcome {
    /// Region label.
    pub fn region(&self) -> &str {
        match self {
            RegionOutcome::Computed { region, .. }
            | RegionOutcome::Skipped { region, .. }
            | RegionOutcome::Failed { region, .. } => region,
        }
    }

    /// True for [`RegionOutcome::Skipped`].
    pub fn is_skipped(&self) -> bool {
        matches!(self, RegionOutcome::Skipped { .. })
    }

    /// True for [`RegionOutcome::Failed`].
    pub fn is_failed(&self) -> bool {
        matches!(self, RegionOutcome::Failed { .. })
    }
}

/// Builds and persists one region, unless its output already exists.
pub fn build_region(job: &RegionJob, opts: &AdjointOptions) -> Result<RegionOutcome> {
    if job.output.exists() {
        info!(region = %job.name, output = %job.output.display(), "output already present, skipping");
        return Ok(skipped(job));
    }

    let start = Instant::now();
    let table = SegmentTable::from_csv_path(&job.input, &opts.columns, opts.order != 0)?;
    let built = build(&table, opts)?;
    if !write_json_new(&job.output, &built.map)? {
        info!(region = %job.name, "output appeared while computing, keeping existing file");
        return Ok(skipped(job));
    }

    let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
    info!(
        region = %job.name,
        segments = built.map.len(),
        truncated = built.stats.truncated,
        duration_ms,
        "region computed"
    );
    Ok(RegionOutcome::Computed {
        region: job.name.clone(),
        output: job.output.clone(),
        segments: built.map.len(),
        stats: built.stats,
        duration_ms,
    })
}

fn skipped(job: &RegionJob) -> RegionOutcome {
    RegionOutcome::Skipped {
        region: job.name.clone(),
        output: job.output.clone(),
    }
}

/// Outcomes of a batch, in job order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    /// One outcome per job.
    pub outcomes: Vec<RegionOutcome>,
}

impl BatchReport {
    /// Number of regions computed in this run.
    pub fn computed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RegionOutcome::Computed { .. }))
            .count()
    }

    /// Number of regions skipped because their output existed.
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Number of regions that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Builds several regions concurrently on a pool of `threads` workers.
///
/// `threads == 0` lets rayon pick the pool size. A failing region is reported
/// as [`RegionOutcome::Failed`] and does not stop the others.
///
/// # Errors
///
/// Only fails when the worker pool cannot be created.
pub fn build_regions(
    jobs: &[RegionJob],
    opts: &AdjointOptions,
    threads: usize,
) -> Result<BatchReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| AdjoinError::Message(format!("failed to start worker pool: {err}")))?;

    let outcomes = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                build_region(job, opts).unwrap_or_else(|err| {
                    warn!(region = %job.name, error = %err, "region failed");
                    RegionOutcome::Failed {
                        region: job.name.clone(),
                        error: err.to_string(),
                    }
                })
            })
            .collect()
    });
    Ok(BatchReport { outcomes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Segment;
    use crate::types::OUTLET;

    fn confluence() -> SegmentTable {
        SegmentTable::from_segments(vec![
            Segment::new(1, 3, Some(1)),
            Segment::new(2, 3, Some(1)),
            Segment::new(3, 4, Some(2)),
            Segment::new(4, OUTLET, Some(2)),
        ])
        .unwrap()
    }

    #[test]
    fn whole_network_upstream_dictionary() {
        let built = build(&confluence(), &AdjointOptions::default()).unwrap();
        assert_eq!(built.map.get(4), Some(&[4, 3, 1, 2][..]));
        assert_eq!(built.map.get(3), Some(&[3, 1, 2][..]));
        assert_eq!(built.map.get(1), Some(&[1][..]));
        assert_eq!(built.stats.traced, 4);
        assert_eq!(built.stats.truncated, 0);
    }

    #[test]
    fn order_filtered_downstream_dictionary_covers_every_row() {
        let mut opts = AdjointOptions::new(Direction::Downstream);
        opts.order = 2;
        let built = build(&confluence(), &opts).unwrap();
        assert_eq!(built.map.keys(), &[1, 2, 3, 4]);
        assert_eq!(built.map.get(3), Some(&[3, 4][..]));
        assert_eq!(built.map.get(1), Some(&[1][..]));
    }

    #[test]
    fn truncated_traces_are_counted() {
        let mut opts = AdjointOptions::new(Direction::Downstream);
        opts.trace.cutoff = 2;
        let built = build(&confluence(), &opts).unwrap();
        // 1 -> 3 -> 4 -> outlet needs more than two dequeues.
        assert_eq!(built.stats.truncated_ids, vec![1, 2]);
        assert_eq!(built.map.get(1), Some(&[1, 3][..]));
    }
}
