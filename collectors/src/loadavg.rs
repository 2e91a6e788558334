// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Linux system load averages, from `/proc/loadavg`.

use std::fs;

use scope::{CollectError, ConfigError, MetricHandle, Sampler, TagSet};

const PROC_LOADAVG: &str = "/proc/loadavg";

fn read_loadavg() -> Result<(f64, f64, f64), String> {
    let text = fs::read_to_string(PROC_LOADAVG)
        .map_err(|e| format!("reading {PROC_LOADAVG}: {e}"))?;
    let first = text
        .lines()
        .next()
        .ok_or_else(|| format!("{PROC_LOADAVG} is empty"))?;
    let fields: Vec<&str> = first.split_whitespace().collect();

    if fields.len() != 5 {
        return Err(format!("{PROC_LOADAVG}: expected 5 fields"));
    }

    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| format!("{PROC_LOADAVG}: non-numeric load average '{s}'"))
    };

    Ok((parse(fields[0])?, parse(fields[1])?, parse(fields[2])?))
}

pub struct LinuxLoadAvg {
    load1: Box<dyn MetricHandle>,
    load5: Box<dyn MetricHandle>,
    load10: Box<dyn MetricHandle>,
}

impl Sampler for LinuxLoadAvg {
    fn sample(&mut self) -> Result<(), CollectError> {
        let (l1, l5, l10) = read_loadavg().map_err(CollectError::new)?;
        self.load1.update(l1);
        self.load5.update(l5);
        self.load10.update(l10);
        Ok(())
    }
}

pub fn setup(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let platform = root.require(scope::Capability::PLATFORM)?;
    let platform = platform.as_platform().expect("platform capability has the wrong variant");

    if !platform.is_linux() {
        return Err(ConfigError::new("loadavg collector requires Linux"));
    }

    let registry = root.require(scope::Capability::REGISTRY)?;
    let registry = registry.as_registry().expect("registry capability has the wrong variant");

    read_loadavg().map_err(ConfigError::new)?;

    Ok(Box::new(LinuxLoadAvg {
        load1: registry.metric(TagSet::from_pairs([("what", "loadavg-1m")])),
        load5: registry.metric(TagSet::from_pairs([("what", "loadavg-5m")])),
        load10: registry.metric(TagSet::from_pairs([("what", "loadavg-10m")])),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_line_with_the_wrong_field_count() {
        let fields: Vec<&str> = "0.1 0.2".split_whitespace().collect();
        assert_ne!(fields.len(), 5);
    }
}
