// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Linux CPU time-in-state percentages, from `/proc/stat`'s aggregate `cpu`
//! line. One metric per field, reporting the fraction of the inter-tick
//! delta spent in that state.

use std::fs;
use std::path::Path;

use scope::{CollectError, ConfigError, MetricHandle, Sampler, TagSet};

const PROC_STAT: &str = "/proc/stat";

const FIELDS: [&str; 10] = [
    "user", "nice", "system", "idle", "iowait", "irq", "softirq", "steal", "guest", "guest_nice",
];

fn read_cpu(path: &Path) -> Result<[u64; 10], String> {
    let text = fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    let first = text
        .lines()
        .next()
        .ok_or_else(|| format!("{} is empty", path.display()))?;
    let mut parts = first.split_whitespace();

    if parts.next() != Some("cpu") {
        return Err(format!("{}: expected first line to start with 'cpu'", path.display()));
    }

    let mut out = [0u64; 10];
    for slot in out.iter_mut() {
        let field = parts
            .next()
            .ok_or_else(|| format!("{}: expected 10 fields on the cpu line", path.display()))?;
        *slot = field
            .parse()
            .map_err(|_| format!("{}: non-numeric cpu field '{field}'", path.display()))?;
    }

    Ok(out)
}

pub struct LinuxCpu {
    handles: Vec<Box<dyn MetricHandle>>,
    last: [u64; 10],
}

impl LinuxCpu {
    fn new(registry: &dyn scope::MetricSink, last: [u64; 10]) -> LinuxCpu {
        let handles = FIELDS
            .iter()
            .map(|field| {
                registry.metric(TagSet::from_pairs([
                    ("what", format!("cpu-usage-{}", field.replace('_', "-"))),
                    ("unit", "%".to_string()),
                ]))
            })
            .collect();
        LinuxCpu { handles, last }
    }
}

impl Sampler for LinuxCpu {
    fn sample(&mut self) -> Result<(), CollectError> {
        let now = read_cpu(Path::new(PROC_STAT)).map_err(CollectError::new)?;

        let total_now: u64 = now.iter().sum();
        let total_last: u64 = self.last.iter().sum();
        let diff = total_now as i64 - total_last as i64;

        if diff <= 0 {
            self.last = now;
            return Ok(());
        }

        let diff = diff as f64;
        for (i, handle) in self.handles.iter().enumerate() {
            let delta = now[i] as f64 - self.last[i] as f64;
            handle.update((delta / diff * 100.0).round() / 100.0);
        }

        self.last = now;
        Ok(())
    }
}

pub fn setup(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let platform = root.require(scope::Capability::PLATFORM)?;
    let platform = platform.as_platform().expect("platform capability has the wrong variant");

    if !platform.is_linux() {
        return Err(ConfigError::new("cpu collector requires Linux"));
    }

    let registry = root.require(scope::Capability::REGISTRY)?;
    let registry = registry.as_registry().expect("registry capability has the wrong variant");

    let last = read_cpu(Path::new(PROC_STAT)).map_err(ConfigError::new)?;
    Ok(Box::new(LinuxCpu::new(registry.as_ref(), last)))
}
