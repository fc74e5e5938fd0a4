/// End-to-end tests: run the `benchfig` binary against synthetic harness
/// trees and check console output and produced files.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn benchfig(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_benchfig"))
        .args(args)
        .output()
        .expect("failed to run benchfig");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn write_estimate(root: &Path, key: &str, mean_ns: f64, lo_ns: f64, hi_ns: f64) {
    let dir = root.join(key).join("new");
    fs::create_dir_all(&dir).unwrap();
    let json = format!(
        r#"{{"mean":{{"point_estimate":{mean_ns},"confidence_interval":{{"lower_bound":{lo_ns},"upper_bound":{hi_ns},"confidence_level":0.95}}}},"std_dev":{{"point_estimate":250000.0}},"median":{{"point_estimate":{mean_ns}}}}}"#
    );
    fs::write(dir.join("estimates.json"), json).unwrap();
}

/// A small tree: two Insert benchmarks plus one Merge benchmark.
fn sample_tree(dir: &Path) -> PathBuf {
    let root = dir.join("criterion");
    write_estimate(&root, "Insert/DAG-CRR/1000", 5e6, 4.5e6, 5.5e6);
    write_estimate(&root, "Insert/DAG-CRR/10000", 42e6, 41e6, 43e6);
    write_estimate(&root, "Merge/CR-SQLite/1000", 7e6, 6.8e6, 7.2e6);
    root
}

/// Two-segment keys, so the strict policy used by `report` keeps each
/// benchmark distinct.
fn report_tree(dir: &Path) -> PathBuf {
    let root = dir.join("criterion");
    write_estimate(&root, "Insert/dag_1k", 5e6, 4.5e6, 5.5e6);
    write_estimate(&root, "Insert/dag_10k", 42e6, 41e6, 43e6);
    write_estimate(&root, "Merge/crsqlite_1k", 7e6, 6.8e6, 7.2e6);
    root
}

#[test]
fn report_prints_grouped_table() {
    let tmp = tempfile::tempdir().unwrap();
    let root = report_tree(tmp.path());

    let (code, stdout, stderr) = benchfig(&["report", "--dir", root.to_str().unwrap()]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.starts_with("Group"));
    assert!(stdout.contains("Insert"));
    assert!(stdout.contains("42.000"));
    assert!(stdout.contains("Total: 3 benchmarks"));
}

#[test]
fn report_csv_has_interval_columns() {
    let tmp = tempfile::tempdir().unwrap();
    let root = report_tree(tmp.path());

    let (code, stdout, _) = benchfig(&["report", "--csv", "--dir", root.to_str().unwrap()]);
    assert_eq!(code, 0);
    let header = stdout.lines().next().unwrap();
    assert_eq!(
        header,
        "group,benchmark,mean_ms,ci_lower_ms,ci_upper_ms,error_ms,std_dev_ms,median_ms"
    );
    assert!(stdout.contains("Insert,dag_10k,42,41,43,1,0.25,42"));
}

#[test]
fn report_filter_is_substring_match() {
    let tmp = tempfile::tempdir().unwrap();
    let root = report_tree(tmp.path());

    let (code, stdout, _) =
        benchfig(&["report", "--filter", "merge", "--dir", root.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Merge"));
    assert!(!stdout.contains("dag_10k"));
    assert!(stdout.contains("Total: 1 benchmarks"));
}

#[test]
fn report_on_empty_tree_exits_nonzero() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("criterion");
    fs::create_dir_all(&root).unwrap();

    let (code, _, stderr) = benchfig(&["report", "--dir", root.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("No benchmark results found."));
}

#[test]
fn report_on_missing_directory_exits_nonzero() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("no-such-dir");

    let (code, _, stderr) = benchfig(&["report", "--dir", root.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("No benchmark results found."));
}

#[test]
fn figures_survive_partial_coverage() {
    let tmp = tempfile::tempdir().unwrap();
    let root = sample_tree(tmp.path());
    let out = tmp.path().join("figures");

    let (code, stdout, stderr) = benchfig(&[
        "figures",
        "--spec-only",
        "--dir",
        root.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert_eq!(code, 0, "stderr: {stderr}");

    // Comparison figures lack required keys and are skipped; the
    // placeholder and model figures still compose.
    assert!(stdout.contains("fig_insert_comparison SKIPPED"));
    assert!(stdout.contains("fig_merge_comparison SKIPPED"));
    assert!(stdout.contains("Done: 7/9 figures"));

    assert!(!out.join("fig_insert_comparison.json").exists());
    for id in [
        "fig_scalability",
        "fig_sensitivity_conflict",
        "fig_sensitivity_columns",
        "fig_sensitivity_valuesize",
        "fig_memory",
        "fig_breakeven_gc",
        "fig_breakeven_query",
    ] {
        assert!(out.join(format!("{id}.json")).exists(), "{id}.json missing");
    }

    // Substituted series are flagged, not silently passed off as measured.
    let scalability = fs::read_to_string(out.join("fig_scalability.json")).unwrap();
    assert!(scalability.contains("\"provenance\": \"placeholder\""));
    assert!(stdout.contains("[includes fallback/model data]"));
}

#[test]
fn figure_specs_are_stable_across_reruns() {
    let tmp = tempfile::tempdir().unwrap();
    let root = sample_tree(tmp.path());
    let out_a = tmp.path().join("a");
    let out_b = tmp.path().join("b");

    for out in [&out_a, &out_b] {
        let (code, _, _) = benchfig(&[
            "figures",
            "--spec-only",
            "--dir",
            root.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]);
        assert_eq!(code, 0);
    }

    let a = fs::read(out_a.join("fig_memory.json")).unwrap();
    let b = fs::read(out_b.join("fig_memory.json")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn export_writes_normalized_json() {
    let tmp = tempfile::tempdir().unwrap();
    let root = sample_tree(tmp.path());
    let out = tmp.path().join("results");

    let (code, stdout, _) = benchfig(&[
        "export",
        "--dir",
        root.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Extracted 3 benchmarks"));
    assert!(stdout.contains("## Insert"));
    assert!(stdout.contains("DAG-CRR/10000: 42.000 +/- 1.000 ms"));

    let exported = fs::read_to_string(out.join("criterion.json")).unwrap();
    assert!(exported.contains("\"Insert/DAG-CRR/10000\""));
    assert!(exported.contains("\"mean_ms\": 42.0"));
}

#[test]
fn export_passes_network_measurements_through() {
    let tmp = tempfile::tempdir().unwrap();
    let root = sample_tree(tmp.path());
    let out = tmp.path().join("results");
    fs::create_dir_all(&out).unwrap();
    fs::write(
        out.join("network.json"),
        r#"[{"peer":"lan-peer","rtt_mean_us":450.0,"speedup":12.0}]"#,
    )
    .unwrap();

    let (code, stdout, _) = benchfig(&[
        "export",
        "--dir",
        root.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Found network results: 1 peers"));
    assert!(stdout.contains("lan-peer: RTT 450us, speedup 12x"));
}

#[test]
fn malformed_estimate_aborts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let root = sample_tree(tmp.path());
    let bad = root.join("Insert/DAG-CRR/100000/new");
    fs::create_dir_all(&bad).unwrap();
    fs::write(
        bad.join("estimates.json"),
        r#"{"mean":{"point_estimate":5.0,"confidence_interval":{"lower_bound":6.0,"upper_bound":4.0}}}"#,
    )
    .unwrap();

    let (code, _, stderr) = benchfig(&["report", "--dir", root.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("malformed estimate record"));
}
