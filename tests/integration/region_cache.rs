#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use adjoin::adjoint::{build_region, build_regions, RegionJob, RegionOutcome};
use adjoin::{AdjointMap, AdjointOptions, Direction};
use tempfile::TempDir;

fn write_table(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write table");
    path
}

const JAPAN: &str = "COMID,NextDownID,order_\n1,3,1\n2,3,1\n3,4,2\n4,-1,2\n";
const ISLANDS: &str = "COMID,NextDownID,order_\n100,-1,1\n101,100,1\n";

#[test]
fn second_build_is_skipped_and_leaves_output_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_table(dir.path(), "japan-geoglows-catchment.csv", JAPAN);
    let out_dir = dir.path().join("out");
    let job = RegionJob::new(&input, &out_dir, Direction::Upstream);
    assert_eq!(job.name, "japan");
    assert_eq!(job.output, out_dir.join("japan-upstream-dict.json"));

    let opts = AdjointOptions::default();
    let first = build_region(&job, &opts).expect("first build");
    match &first {
        RegionOutcome::Computed { segments, .. } => assert_eq!(*segments, 4),
        other => panic!("expected a computed region, got {other:?}"),
    }
    let written = fs::read(&job.output).expect("read output");

    // A changed table must not be picked up: the output marks the region done.
    fs::write(&input, ISLANDS).expect("rewrite table");
    let second = build_region(&job, &opts).expect("second build");
    assert!(second.is_skipped());
    assert_eq!(fs::read(&job.output).expect("reread output"), written);

    let map = AdjointMap::read_json(&job.output).expect("decode output");
    assert_eq!(map.keys(), &[1, 2, 3, 4]);
    assert_eq!(map.get(4), Some(&[4, 3, 1, 2][..]));
}

#[test]
fn failing_region_does_not_abort_the_batch() {
    let dir = TempDir::new().expect("tempdir");
    let good = write_table(dir.path(), "japan-catchment.csv", JAPAN);
    let bad = write_table(dir.path(), "broken-catchment.csv", "id,next\n1,-1\n");
    let other = write_table(dir.path(), "islands-catchment.csv", ISLANDS);
    let out_dir = dir.path().join("out");

    let jobs: Vec<RegionJob> = [&good, &bad, &other]
        .into_iter()
        .map(|input| RegionJob::new(input, &out_dir, Direction::Downstream))
        .collect();
    let opts = AdjointOptions::new(Direction::Downstream);

    let report = build_regions(&jobs, &opts, 2).expect("batch");
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.computed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.outcomes[1].region(), "broken");
    match &report.outcomes[1] {
        RegionOutcome::Failed { error, .. } => assert!(error.contains("COMID")),
        other => panic!("expected a failure, got {other:?}"),
    }
    assert!(out_dir.join("japan-downstream-dict.json").exists());
    assert!(out_dir.join("islands-downstream-dict.json").exists());
    assert!(!out_dir.join("broken-downstream-dict.json").exists());

    let rerun = build_regions(&jobs, &opts, 2).expect("rerun");
    assert_eq!(rerun.skipped(), 2);
    assert_eq!(rerun.failed(), 1);
}

#[test]
fn order_filtered_region_requires_order_column() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_table(dir.path(), "plain-catchment.csv", "COMID,NextDownID\n1,-1\n");
    let job = RegionJob::new(&input, dir.path(), Direction::Upstream);
    let mut opts = AdjointOptions::default();
    opts.order = 2;
    let err = build_region(&job, &opts).unwrap_err();
    assert!(err.is_schema());
    assert!(!job.output.exists());
}
