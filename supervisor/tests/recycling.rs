// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

fn dummy_agent_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dummy_agent"))
}

/// Runs the baseline path end to end through the real CLI: a steadily
/// succeeding collector alongside one that requests its own recycling on
/// every tick, for a handful of rounds, and expects a clean exit with the
/// steady collector's metric present in the final snapshot.
#[test]
fn steady_and_self_recycling_collectors_both_survive_several_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let collector_dir = dir.path().join("collectors.d");
    fs::create_dir(&collector_dir).unwrap();
    fs::write(collector_dir.join("ok.collector"), "{}\n").unwrap();
    fs::write(collector_dir.join("reload.collector"), "{}\n").unwrap();

    let config_path = dir.path().join("agent.yaml");
    fs::write(
        &config_path,
        "collectors:\n  - type: ok\n  - type: reload\n",
    )
    .unwrap();

    let output = Command::new(dummy_agent_exe())
        .arg(&config_path)
        .arg(&collector_dir)
        .arg("1.0") // timeout
        .arg("0.2") // interval
        .arg("0.1") // backoff
        .arg("5") // iterations
        .output()
        .expect("dummy_agent must run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("dummy-ok"),
        "expected the steady collector's metric in the snapshot, got: {stdout}"
    );
}

#[test]
fn unresolvable_collector_type_is_a_fatal_start_up_error() {
    let dir = tempfile::tempdir().unwrap();
    let collector_dir = dir.path().join("collectors.d");
    fs::create_dir(&collector_dir).unwrap();
    fs::write(collector_dir.join("nope.collector"), "{}\n").unwrap();

    let config_path = dir.path().join("agent.yaml");
    let mut f = fs::File::create(&config_path).unwrap();
    writeln!(f, "collectors:\n  - type: nope").unwrap();

    let output = Command::new(dummy_agent_exe())
        .arg(&config_path)
        .arg(&collector_dir)
        .arg("1.0")
        .arg("0.2")
        .arg("0.1")
        .arg("1")
        .output()
        .expect("dummy_agent must run");

    assert_eq!(output.status.code(), Some(2));
}
