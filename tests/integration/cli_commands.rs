#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const CONFLUENCE: &str = "COMID,NextDownID,order_\n1,3,1\n2,3,1\n3,4,2\n4,-1,2\n";

fn setup_table(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write table");
    (dir, path)
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join("cli.toml")
}

fn parse_json(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).expect("json output")
}

#[test]
fn build_writes_region_dictionary_and_skips_rerun() {
    let (dir, table) = setup_table("japan-catchment.csv", CONFLUENCE);
    let out_dir = dir.path().join("out");

    let output = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "build"])
        .arg(&table)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let outcome = parse_json(&output);
    assert_eq!(outcome["status"], "computed");
    assert_eq!(outcome["region"], "japan");
    assert_eq!(outcome["segments"], 4);

    let written = out_dir.join("japan-upstream-dict.json");
    let dict: Value = serde_json::from_str(&fs::read_to_string(&written).expect("read dict"))
        .expect("decode dict");
    assert_eq!(dict["4"], serde_json::json!([4, 3, 1, 2]));

    let rerun = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "build"])
        .arg(&table)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(parse_json(&rerun)["status"], "skipped");
}

#[test]
fn trace_prints_chain_in_both_directions() {
    let (dir, table) = setup_table("japan-catchment.csv", CONFLUENCE);

    let up = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .arg("--quiet")
        .arg("trace")
        .arg(&table)
        .arg("3")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8_lossy(&up).trim(), "3 1 2");

    let down = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "trace"])
        .arg(&table)
        .args(["1", "--direction", "down", "--order", "2", "--linear"])
        .assert()
        .failure();
    // Segment 1 is order 1 and therefore absent from the order-2 tree.
    let stderr = String::from_utf8_lossy(&down.get_output().stderr).to_string();
    assert!(stderr.contains("not present"), "stderr: {stderr}");
}

#[test]
fn check_accepts_built_dictionary_and_rejects_tampered_one() {
    let (dir, table) = setup_table("japan-catchment.csv", CONFLUENCE);
    let dict = dir.path().join("japan-downstream-dict.json");

    cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["build", "--direction", "down"])
        .arg(&table)
        .arg("--out")
        .arg(&dict)
        .assert()
        .success();

    cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["check", "--direction", "down"])
        .arg(&table)
        .arg(&dict)
        .assert()
        .success();

    let tampered = dir.path().join("tampered.json");
    fs::write(&tampered, r#"{"1":[1,4],"2":[2,3,4],"3":[3,4],"4":[4]}"#).expect("write");
    let output = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "check", "--direction", "down"])
        .arg(&table)
        .arg(&tampered)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let report = parse_json(&output);
    assert_eq!(report["success"], false);
    assert_eq!(report["counts"]["errors"], 1);
}

#[test]
fn batch_and_merge_cover_all_regions() {
    let (dir, japan) = setup_table("japan-catchment.csv", CONFLUENCE);
    let korea = dir.path().join("korea-catchment.csv");
    fs::write(&korea, "COMID,NextDownID,order_\n10,-1,1\n11,10,1\n").expect("write korea");
    let out_dir = dir.path().join("out");

    let output = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "batch", "--threads", "2", "--out-dir"])
        .arg(&out_dir)
        .arg(&japan)
        .arg(&korea)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report = parse_json(&output);
    assert_eq!(report["outcomes"].as_array().map(Vec::len), Some(2));

    let merged = dir.path().join("AllRegions-upstream-dict.json");
    let output = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "merge", "--out"])
        .arg(&merged)
        .arg(out_dir.join("japan-upstream-dict.json"))
        .arg(out_dir.join("korea-upstream-dict.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report = parse_json(&output);
    assert_eq!(report["status"], "merged");
    assert_eq!(report["segments"], 6);
    assert!(merged.exists());
}

#[test]
fn profile_supplies_column_names() {
    let (dir, table) = setup_table(
        "europe-catchment.csv",
        "HydroID,NextDownID,order_\n5,6,1\n6,-1,1\n",
    );

    cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args([
            "--id-column",
            "HydroID",
            "profiles",
            "save",
            "geoglows",
            "--direction",
            "down",
            "--default",
        ])
        .assert()
        .success();
    let saved = fs::read_to_string(config_path(dir.path())).expect("config written");
    assert!(saved.contains("HydroID"));

    let output = cargo_bin_cmd!("adjoin")
        .env("ADJOIN_CONFIG", config_path(dir.path()))
        .args(["--format", "json", "trace"])
        .arg(&table)
        .arg("5")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let trace = parse_json(&output);
    assert_eq!(trace["ids"], serde_json::json!([5, 6]));
    assert_eq!(trace["truncated"], false);
}
