// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! A private fixture binary used only by this crate's own integration
//! tests: a handful of synthetic collector types standing in for real
//! built-ins, so `worker_lifecycle.rs` can exercise real subprocess
//! behavior without depending on the `collectors` crate.

use std::process;

use scope::{CollectError, ConfigError, MetricHandle, Sampler, Scope, TagSet};

fn main() {
    let code = worker::run_worker_main(lookup);
    process::exit(code);
}

fn lookup(name: &str) -> Option<scope::SamplerFactory> {
    match name {
        "counter" => Some(counter_factory as scope::SamplerFactory),
        "fail" => Some(fail_factory as scope::SamplerFactory),
        "hang" => Some(hang_factory as scope::SamplerFactory),
        _ => None,
    }
}

struct CounterSampler {
    handle: Box<dyn MetricHandle>,
    count: f64,
}

impl Sampler for CounterSampler {
    fn sample(&mut self) -> Result<(), CollectError> {
        self.count += 1.0;
        self.handle.update(self.count);
        Ok(())
    }
}

fn counter_factory(root: &Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let registry = root
        .require(scope::Capability::REGISTRY)?
        .as_registry()
        .expect("registry capability has the wrong variant")
        .clone();
    let handle = registry.metric(TagSet::from_pairs([("what", "c")]));
    Ok(Box::new(CounterSampler { handle, count: 0.0 }))
}

struct FailSampler;

impl Sampler for FailSampler {
    fn sample(&mut self) -> Result<(), CollectError> {
        Err(CollectError::new("boom"))
    }
}

fn fail_factory(_scope: &Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    Ok(Box::new(FailSampler))
}

struct HangSampler;

impl Sampler for HangSampler {
    fn sample(&mut self) -> Result<(), CollectError> {
        std::thread::sleep(std::time::Duration::from_secs(3600));
        Ok(())
    }
}

fn hang_factory(_scope: &Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    Ok(Box::new(HangSampler))
}
