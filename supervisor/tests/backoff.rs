// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use scope::{CollectError, ConfigError, Sampler, TagSet};

struct Noop;

impl Sampler for Noop {
    fn sample(&mut self) -> Result<(), CollectError> {
        Ok(())
    }
}

fn setup_probe(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    root.require(scope::Capability::REGISTRY)?;
    Ok(Box::new(Noop))
}

fn lookup(name: &str) -> Option<scope::SamplerFactory> {
    match name {
        "probe" => Some(setup_probe as scope::SamplerFactory),
        _ => None,
    }
}

fn make_supervisor(
    descriptor_dir: PathBuf,
    type_name: &str,
    results: mpsc::Sender<(u64, bool)>,
) -> supervisor::CollectorSupervisor {
    let registry = registry::Registry::new(TagSet::new());
    let group = registry.group();

    let mut bindings = HashMap::new();
    bindings.insert(
        scope::Capability::PLATFORM,
        scope::Capability::Platform(Arc::new(platform::Platform::probe())),
    );
    bindings.insert(
        scope::Capability::REGISTRY,
        scope::Capability::Registry(Arc::new(group)),
    );
    // `config` is bound per instance by `InstanceState::start`, not here.
    let parent_scope = scope::Scope::root(bindings);

    supervisor::CollectorSupervisor::new(supervisor::CollectorSupervisorParams {
        logical_name: type_name.to_string(),
        type_name: type_name.to_string(),
        descriptor_dir,
        exe: PathBuf::from(env!("CARGO_BIN_EXE_dummy_agent")),
        parent_scope,
        config_value: serde_yaml::Value::Null,
        lookup: Arc::new(lookup),
        results,
        cells: registry.clone() as Arc<dyn scope::CellSink>,
        instance_config: config::InstanceConfig::default(),
    })
}

/// Precisely exercises the back-off countdown: after a recycle attempt
/// fails, the current instance is left running through the next nine
/// `soft_restart` calls, and the tenth retries.
#[test]
fn soft_restart_backs_off_for_nine_calls_then_retries_on_the_tenth() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor_path = dir.path().join("probe.collector");
    fs::write(&descriptor_path, "factory: probe\n").unwrap();

    let (tx, _rx) = mpsc::channel();
    let mut supervisor = make_supervisor(dir.path().to_path_buf(), "probe", tx);
    supervisor.start().expect("initial start must succeed");

    let original_pid = supervisor
        .instance_pid()
        .expect("an instance must be running");

    // Break the descriptor so every recycle attempt fails.
    fs::remove_file(&descriptor_path).unwrap();

    // Call 1: the attempt that fails and arms the 10-round countdown.
    supervisor
        .soft_restart(true)
        .expect("a failed recycle is not itself a termination failure");
    assert_eq!(
        supervisor.instance_pid(),
        Some(original_pid),
        "a failed recycle must leave the current instance running"
    );

    // Calls 2 through 10 (nine calls): back off, no retry attempted.
    for call in 2..=10 {
        supervisor
            .soft_restart(true)
            .unwrap_or_else(|e| panic!("call {call} should not touch the instance: {e}"));
        assert_eq!(
            supervisor.instance_pid(),
            Some(original_pid),
            "call {call} must not have retried yet"
        );
    }

    // Restore the descriptor before the 11th call, which is the retry.
    fs::write(&descriptor_path, "factory: probe\n").unwrap();
    supervisor
        .soft_restart(true)
        .expect("the eleventh call retries and should now succeed");

    assert_ne!(
        supervisor.instance_pid(),
        Some(original_pid),
        "the retry must have replaced the instance with a fresh one"
    );

    supervisor.stop(true).expect("stop must succeed");
}

/// A worker observed dead restarts unconditionally, with no back-off: there
/// is nothing left to protect, unlike a proactive recycle.
#[test]
fn restart_is_unconditional_even_immediately_after_a_soft_restart_failure() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor_path = dir.path().join("probe.collector");
    fs::write(&descriptor_path, "factory: probe\n").unwrap();

    let (tx, _rx) = mpsc::channel();
    let mut supervisor = make_supervisor(dir.path().to_path_buf(), "probe", tx);
    supervisor.start().expect("initial start must succeed");
    let original_pid = supervisor.instance_pid().unwrap();

    supervisor
        .restart(false)
        .expect("restart does not back off and must succeed immediately");

    assert_ne!(
        supervisor.instance_pid(),
        Some(original_pid),
        "restart always replaces the instance"
    );

    supervisor.stop(true).expect("stop must succeed");
}
