use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mini_city"))
        .args(args)
        .env("RUST_LOG", "warn,mini_city=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the simulation runs headless without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_cli(&["--ticks", "60", "--seed", "3"]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that the session summary and map are logged
#[test]
fn test_summary_and_map_logged() {
    let output = run_cli(&["--ticks", "40", "--seed", "4", "--quiet"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for needle in [
        "=== Mini City Summary ===",
        "Algorithm: A*",
        "Goals reached:",
        "NPC vehicles:",
        "Pedestrians:",
        "=== City Map ===",
    ] {
        assert!(stderr.contains(needle), "Missing '{}' in output", needle);
    }
}

/// Test that the algorithm flag reaches the session
#[test]
fn test_algorithm_flag() {
    let output = run_cli(&["--ticks", "10", "--seed", "5", "--quiet", "--algorithm", "bfs"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Algorithm: BFS"));
}

/// Test that a random map can be requested
#[test]
fn test_random_map_flag() {
    let output = run_cli(&["--ticks", "10", "--seed", "6", "--quiet", "--random-map"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Generated random map with seed 6"));
}

/// Test that bad input is reported instead of crashing
#[test]
fn test_bad_input_fails_cleanly() {
    let output = run_cli(&["--ticks", "10", "--delta", "0"]);
    assert!(!output.status.success());

    let output = run_cli(&["--ticks", "10", "--map", "/nonexistent/mini_city.map"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read map file"));
}
