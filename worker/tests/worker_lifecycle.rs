// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

struct RecordingCells {
    metrics: Mutex<Vec<(u64, f64)>>,
}

impl scope::CellSink for RecordingCells {
    fn set_metric(&self, id: u64, value: f64) {
        self.metrics.lock().push((id, value));
    }

    fn set_state(&self, _id: u64, _ok: bool) {}
}

fn dummy_worker_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dummy_worker"))
}

#[test]
fn counter_collector_reports_done_and_forwards_metric_updates() {
    let (tx, rx) = mpsc::channel();
    let cells = Arc::new(RecordingCells {
        metrics: Mutex::new(Vec::new()),
    });
    let reload = scope::ReloadLatch::new();

    let mut w = worker::Worker::spawn(
        &dummy_worker_exe(),
        "counter",
        "{}".to_string(),
        vec![42],
        tx,
        cells.clone(),
        reload,
    )
    .unwrap();

    w.send_tick(1).unwrap();
    let (tick, ok) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(tick, 1);
    assert!(ok);

    // Give the reader thread a moment to apply the forwarded update.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(cells.metrics.lock().last(), Some(&(42, 1.0)));

    w.terminate(true, &config::InstanceConfig::default()).unwrap();
}

#[test]
fn failing_collector_reports_ok_false() {
    let (tx, rx) = mpsc::channel();
    let cells = Arc::new(RecordingCells {
        metrics: Mutex::new(Vec::new()),
    });
    let reload = scope::ReloadLatch::new();

    let mut w = worker::Worker::spawn(
        &dummy_worker_exe(),
        "fail",
        "{}".to_string(),
        vec![],
        tx,
        cells,
        reload,
    )
    .unwrap();

    w.send_tick(5).unwrap();
    let (tick, ok) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(tick, 5);
    assert!(!ok);

    w.terminate(true, &config::InstanceConfig::default()).unwrap();
}

#[test]
fn hung_collector_is_forcefully_terminated() {
    let (tx, _rx) = mpsc::channel();
    let cells = Arc::new(RecordingCells {
        metrics: Mutex::new(Vec::new()),
    });
    let reload = scope::ReloadLatch::new();

    let mut w = worker::Worker::spawn(
        &dummy_worker_exe(),
        "hang",
        "{}".to_string(),
        vec![],
        tx,
        cells,
        reload,
    )
    .unwrap();

    w.send_tick(1).unwrap();

    let mut cfg = config::InstanceConfig::default();
    cfg.graceful_timeout = 0.1;
    cfg.forceful_timeout = 0.2;
    cfg.max_forceful_attempts = 3;

    // Not graceful: simulate a straggler being force-killed directly.
    w.terminate(false, &cfg).unwrap();
}

#[test]
fn unknown_collector_type_reports_fatal_and_exits_nonzero() {
    let (tx, rx) = mpsc::channel::<(u64, bool)>();
    let cells = Arc::new(RecordingCells {
        metrics: Mutex::new(Vec::new()),
    });
    let reload = scope::ReloadLatch::new();

    let mut w = worker::Worker::spawn(
        &dummy_worker_exe(),
        "does-not-exist",
        "{}".to_string(),
        vec![],
        tx,
        cells,
        reload,
    )
    .unwrap();

    // The worker exits immediately after reporting Fatal; no Done ever
    // arrives, and a subsequent liveness check observes it has died.
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    std::thread::sleep(Duration::from_millis(150));
    assert!(!w.is_alive());

    let _ = w.terminate(false, &config::InstanceConfig::default());
}
