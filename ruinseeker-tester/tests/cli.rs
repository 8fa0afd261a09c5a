use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "ruinseeker-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_validate_bundled_catalog_as_json() {
    let exe = env!("CARGO_BIN_EXE_ruinseeker-tester");
    let output_path = temp_path("validate");
    let status = Command::new(exe)
        .args(["validate", "--report", "json", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("\"issues\": []"));
}

#[test]
fn cli_validate_fails_for_missing_catalog_dir() {
    let exe = env!("CARGO_BIN_EXE_ruinseeker-tester");
    let output = Command::new(exe)
        .args(["validate", "--catalog"])
        .arg(temp_path("nowhere"))
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("items.json"));
}

#[test]
fn cli_explore_reports_no_route_for_weightless_gear() {
    let exe = env!("CARGO_BIN_EXE_ruinseeker-tester");
    let output_path = temp_path("explore");
    let status = Command::new(exe)
        .args([
            "explore",
            "--items",
            "nonexistent_tool",
            "--seed",
            "42",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("\"outcome\": \"no_route\""));
}

#[test]
fn cli_simulate_markdown_report() {
    let exe = env!("CARGO_BIN_EXE_ruinseeker-tester");
    let output_path = temp_path("simulate");
    let output = Command::new(exe)
        .args([
            "simulate",
            "--seeds",
            "1,2",
            "--iterations",
            "200",
            "--attempts",
            "50",
            "--report",
            "markdown",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("# Ruinseeker Simulation"));
    assert!(content.contains("giza_surface_survey"));
}
