#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use adjoin::adjoint::{merge_regions, MergeOutcome};
use adjoin::AdjointMap;
use tempfile::TempDir;

fn write_json(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).expect("write dictionary");
    path
}

#[test]
fn regions_are_merged_once_and_collisions_recorded() {
    let dir = TempDir::new().expect("tempdir");
    let japan = write_json(&dir, "japan-upstream-dict.json", r#"{"1":[1],"2":[2,1]}"#);
    let korea = write_json(&dir, "korea-upstream-dict.json", r#"{"2":[2],"7":[7.0]}"#);
    let output = dir.path().join("AllRegions-upstream-dict.json");

    let outcome = merge_regions(&[japan.clone(), korea.clone()], &output).expect("merge");
    let report = match outcome {
        MergeOutcome::Merged(report) => report,
        other => panic!("expected a merge, got {other:?}"),
    };
    assert_eq!(report.regions, 2);
    assert_eq!(report.segments, 3);
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].id, 2);
    assert_eq!(report.collisions[0].kept_from, "japan");
    assert_eq!(report.collisions[0].dropped_from, "korea");

    let merged = AdjointMap::read_json(&output).expect("decode merged");
    assert_eq!(merged.keys(), &[1, 2, 7]);
    assert_eq!(merged.get(2), Some(&[2, 1][..]));
    assert_eq!(
        fs::read_to_string(&output).expect("read merged"),
        r#"{"1":[1],"2":[2,1],"7":[7]}"#
    );

    let again = merge_regions(&[japan, korea], &output).expect("second merge");
    assert!(matches!(again, MergeOutcome::Skipped { .. }));
}

#[test]
fn unreadable_input_fails_without_writing() {
    let dir = TempDir::new().expect("tempdir");
    let good = write_json(&dir, "a-dict.json", r#"{"1":[1]}"#);
    let bad = write_json(&dir, "b-dict.json", r#"{"1":"nope"}"#);
    let output = dir.path().join("merged.json");

    assert!(merge_regions(&[good, bad], &output).is_err());
    assert!(!output.exists());
}
