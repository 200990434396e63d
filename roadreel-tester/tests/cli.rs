use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "roadreel-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_roadreel-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("scrub-fuzz"));
}

#[test]
fn cli_runs_scenario_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_roadreel-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "speed-controls",
            "--seeds",
            "1,2",
            "--frame-ms",
            "120",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Roadreel Playback Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let runs = report.as_array().expect("array of runs");
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run["passed"] == true));
}

#[test]
fn cli_rejects_missing_itinerary() {
    let exe = env!("CARGO_BIN_EXE_roadreel-tester");
    let output = Command::new(exe)
        .args(["--itinerary", "/nonexistent/roadreel-itinerary.json"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load itinerary"));
}

#[test]
fn cli_warns_on_unknown_scenario() {
    let exe = env!("CARGO_BIN_EXE_roadreel-tester");
    let output = Command::new(exe)
        .args(["--scenarios", "no-such-scenario", "--report", "markdown"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("Unknown scenario"));
    assert!(stdout.contains("_No scenarios executed._"));
}
