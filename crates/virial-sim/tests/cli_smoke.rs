use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

const RUN_FILE: &str = "\
reference_sigma: 1.0
model:
  type: square-well
  sigma: 0.5
  lambda: 2.0
  epsilon: 1.0
extra_models:
  - type: hard-sphere
    sigma: 1.0
overlap:
  points: 3
  steps: 10
  sub_steps: 200
  block_size: 100
  equilibration: 2
  calibration:
    steps: 6
";

#[test]
fn run_writes_report_and_preference() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("run.yaml");
    fs::write(&config, RUN_FILE).unwrap();
    let out = dir.path().join("out");

    let output = Command::new(env!("CARGO_BIN_EXE_virial-sim"))
        .args(["run", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("run virial-sim");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_str(&fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
    assert_eq!(report["points"], 3);
    assert_eq!(report["estimator"], "overlap");
    assert!(report["full_value"].is_number());
    assert_eq!(report["extra_targets"].as_array().unwrap().len(), 1);
    assert!(report["extra_targets"][0]["full_value"].is_number());
    let stored = fs::read_to_string(out.join("refpref3_1")).unwrap();
    assert!(stored.trim().parse::<f64>().unwrap() > 0.0);
}

#[test]
fn reference_prints_tabulated_value() {
    let output = Command::new(env!("CARGO_BIN_EXE_virial-sim"))
        .args(["reference", "--points", "2", "--sigma", "1"])
        .output()
        .expect("run virial-sim");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    let value = body["value"].as_f64().unwrap();
    assert!((value - 2.0 * std::f64::consts::PI / 3.0).abs() < 1e-12);
}

#[test]
fn unknown_order_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_virial-sim"))
        .args(["reference", "--points", "40"])
        .output()
        .expect("run virial-sim");
    assert!(!output.status.success());
}
