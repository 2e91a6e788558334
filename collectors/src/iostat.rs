// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Per-device Linux I/O activity rates, from `/proc/diskstats`. Each field is
//! reported as a per-second rate over the inter-tick wall-clock delta.

use std::collections::HashMap;
use std::fs;
use std::time::Instant;

use scope::{CollectError, ConfigError, MetricHandle, Sampler, TagSet};

const PROC_DISKSTATS: &str = "/proc/diskstats";

const FIELDS: [&str; 11] = [
    "rd_ios", "rd_merges", "rd_sectors", "rd_tics", "wr_ios", "wr_merges", "wr_sectors", "wr_tics",
    "ios_pgr", "tot_tics", "rq_tics",
];

fn read_disks() -> Result<HashMap<String, [u64; 11]>, String> {
    let text = fs::read_to_string(PROC_DISKSTATS)
        .map_err(|e| format!("reading {PROC_DISKSTATS}: {e}"))?;
    let mut disks = HashMap::new();

    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let device = parts[2].to_string();
        let rest = &parts[3..];

        if rest.len() != FIELDS.len() {
            return Err(format!(
                "{PROC_DISKSTATS}: expected {} fields for device '{device}'",
                FIELDS.len()
            ));
        }

        let mut values = [0u64; 11];
        for (slot, field) in values.iter_mut().zip(rest.iter()) {
            *slot = field
                .parse()
                .map_err(|_| format!("{PROC_DISKSTATS}: non-numeric field '{field}'"))?;
        }

        disks.insert(device, values);
    }

    Ok(disks)
}

pub struct LinuxIoStat {
    handles: HashMap<(String, usize), Box<dyn MetricHandle>>,
    last_time: Instant,
    last: HashMap<String, [u64; 11]>,
}

impl LinuxIoStat {
    fn new(registry: &dyn scope::MetricSink, last: HashMap<String, [u64; 11]>) -> LinuxIoStat {
        let mut handles = HashMap::new();

        // Cells must be allocated in a fixed order: the supervisor's
        // validation `setup()` and the worker's replay `setup()` run in
        // separate processes with independent hash seeds, so iterating
        // `last.keys()` directly would hand out each process' ids in a
        // different order.
        let mut devices: Vec<&String> = last.keys().collect();
        devices.sort();

        for device in devices {
            for (i, field) in FIELDS.iter().enumerate() {
                let mut tags = TagSet::from_pairs([("device", device.as_str())]);
                tags.insert("what", format!("iostat-{}", field.replace('_', "-")));
                handles.insert((device.clone(), i), registry.metric(tags));
            }
        }

        LinuxIoStat {
            handles,
            last_time: Instant::now(),
            last,
        }
    }
}

impl Sampler for LinuxIoStat {
    fn sample(&mut self) -> Result<(), CollectError> {
        let now = Instant::now();
        let diff = now.duration_since(self.last_time).as_secs_f64();
        self.last_time = now;

        if diff <= 0.0 {
            return Ok(());
        }

        let current = read_disks().map_err(CollectError::new)?;

        for (device, values) in &current {
            let Some(previous) = self.last.get(device) else {
                continue;
            };

            for (i, (a, b)) in values.iter().zip(previous.iter()).enumerate() {
                if let Some(handle) = self.handles.get(&(device.clone(), i)) {
                    handle.update((*a as f64 - *b as f64) / diff);
                }
            }
        }

        self.last = current;
        Ok(())
    }
}

pub fn setup(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let platform = root.require(scope::Capability::PLATFORM)?;
    let platform = platform.as_platform().expect("platform capability has the wrong variant");

    if !platform.is_linux() {
        return Err(ConfigError::new("iostat collector requires Linux"));
    }

    let registry = root.require(scope::Capability::REGISTRY)?;
    let registry = registry.as_registry().expect("registry capability has the wrong variant");

    let last = read_disks().map_err(ConfigError::new)?;
    Ok(Box::new(LinuxIoStat::new(registry.as_ref(), last)))
}
