// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! A tiny stand-in for the real `agent` binary, used only by this crate's
//! own integration tests: a handful of deterministic collector types plus a
//! minimal CLI that runs a `supervisor::Core` for a fixed number of rounds.
//! Cannot reuse the `worker` crate's own `dummy_worker` fixture — Cargo only
//! exposes `CARGO_BIN_EXE_*` for binaries within the same package.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use scope::{CollectError, ConfigError, Sampler, TagSet};

struct AlwaysOk {
    ticks: Box<dyn scope::MetricHandle>,
}

impl Sampler for AlwaysOk {
    fn sample(&mut self) -> Result<(), CollectError> {
        self.ticks.update(1.0);
        Ok(())
    }
}

fn setup_ok(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let registry = root.require(scope::Capability::REGISTRY)?;
    let registry = registry
        .as_registry()
        .expect("REGISTRY name always binds a Capability::Registry");
    let ticks = registry.metric(TagSet::from_pairs([("what", "dummy-ok")]));
    Ok(Box::new(AlwaysOk { ticks }))
}

struct AlwaysFails;

impl Sampler for AlwaysFails {
    fn sample(&mut self) -> Result<(), CollectError> {
        Err(CollectError::new("dummy collector always fails"))
    }
}

fn setup_fail(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    root.require(scope::Capability::REGISTRY)?;
    Ok(Box::new(AlwaysFails))
}

struct RequestsReload {
    reload: scope::ReloadLatch,
}

impl Sampler for RequestsReload {
    fn sample(&mut self) -> Result<(), CollectError> {
        self.reload.set();
        Ok(())
    }
}

fn setup_reload(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let reload = root
        .require(scope::Capability::RELOAD)?
        .as_reload()
        .expect("RELOAD name always binds a Capability::Reload")
        .clone();
    Ok(Box::new(RequestsReload { reload }))
}

/// Simulates a worker stuck mid-sample: killable by `SIGKILL`, but never
/// replies to a `Tick` on its own. Exercises the straggler-restart path.
struct Hangs;

impl Sampler for Hangs {
    fn sample(&mut self) -> Result<(), CollectError> {
        std::thread::sleep(Duration::from_secs(60));
        Ok(())
    }
}

fn setup_hang(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    root.require(scope::Capability::REGISTRY)?;
    Ok(Box::new(Hangs))
}

/// Simulates a worker that dies outright while sampling. Exercises the
/// dead-worker restart path.
struct Crashes;

impl Sampler for Crashes {
    fn sample(&mut self) -> Result<(), CollectError> {
        std::process::exit(9);
    }
}

fn setup_crash(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    root.require(scope::Capability::REGISTRY)?;
    Ok(Box::new(Crashes))
}

fn lookup(name: &str) -> Option<scope::SamplerFactory> {
    match name {
        "ok" => Some(setup_ok as scope::SamplerFactory),
        "fail" => Some(setup_fail as scope::SamplerFactory),
        "reload" => Some(setup_reload as scope::SamplerFactory),
        "hang" => Some(setup_hang as scope::SamplerFactory),
        "crash" => Some(setup_crash as scope::SamplerFactory),
        _ => None,
    }
}

fn main() {
    if std::env::var(worker::WORKER_MODE_ENV).is_ok() {
        let code = worker::run_worker_main(lookup);
        std::process::exit(code);
    }

    // CLI: <config-path> <collector-dir> <timeout-secs> <interval-secs> <backoff-secs> <iterations>
    let args: Vec<String> = std::env::args().collect();
    let config_path = PathBuf::from(&args[1]);
    let collector_dir = PathBuf::from(&args[2]);
    let timeout = Duration::from_secs_f64(args[3].parse().expect("timeout is a float"));
    let interval = Duration::from_secs_f64(args[4].parse().expect("interval is a float"));
    let backoff = Duration::from_secs_f64(args[5].parse().expect("backoff is a float"));
    let iterations: u32 = args[6].parse().expect("iterations is an integer");

    let exe = std::env::current_exe().expect("current_exe must resolve");
    let params = supervisor::CoreParams {
        config_path,
        collector_dirs: vec![collector_dir],
        exe,
        lookup: Arc::new(lookup),
        timeout,
        interval,
        backoff,
    };

    let mut core = match supervisor::Core::new(params) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("fatal at start-up: {e}");
            std::process::exit(2);
        }
    };

    for _ in 0..iterations {
        if let Err(e) = core.run_once() {
            eprintln!("fatal: {e}");
            std::process::exit(3);
        }
    }

    if let Err(e) = core.stop() {
        eprintln!("fatal during stop: {e}");
        std::process::exit(4);
    }

    let snapshot = core.registry().snapshot();
    for (tags, value) in &snapshot.metrics {
        println!("METRIC {tags} {value}");
    }
    for (tags, ok) in &snapshot.states {
        println!("STATE {tags} {ok}");
    }
}
