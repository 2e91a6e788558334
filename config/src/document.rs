// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashSet;
use std::fs;
use std::path::Path as FsPath;

use serde_yaml::{Mapping, Value};

use scope::TagSet;

use crate::error::{ConfigError, Path};

/// One entry of the `collectors:` list: a required `type` plus an arbitrary
/// remainder, handed opaquely to the collector as its `config` capability.
#[derive(Clone, Debug)]
pub struct CollectorEntry {
    pub type_name: String,
    pub remainder: Value,
}

/// `instance_config:` — per-instance lifecycle tuning. Unknown keys are
/// rejected; defaults match spec.md §6.
#[derive(Clone, Debug)]
pub struct InstanceConfig {
    pub max_runs: u64,
    pub max_errors: u64,
    pub graceful_timeout: f64,
    pub forceful_timeout: f64,
    pub max_forceful_attempts: u32,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        InstanceConfig {
            max_runs: 10_000,
            max_errors: 5,
            graceful_timeout: 2.0,
            forceful_timeout: 2.0,
            max_forceful_attempts: 5,
        }
    }
}

const INSTANCE_CONFIG_KEYS: &[&str] = &[
    "max_runs",
    "max_errors",
    "graceful_timeout",
    "forceful_timeout",
    "max_forceful_attempts",
];

/// The parsed top-level configuration document (spec.md §6).
#[derive(Clone, Debug)]
pub struct Document {
    pub tags: TagSet,
    pub collectors: Vec<CollectorEntry>,
    pub blacklist: HashSet<String>,
    pub instance_config: InstanceConfig,
}

impl Document {
    pub fn load(path: &FsPath) -> Result<Document, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("{}: {e}", path.display())))?;
        Document::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Document, ConfigError> {
        let root: Value = serde_yaml::from_str(text)
            .map_err(|e| ConfigError::new(format!("invalid YAML: {e}")))?;
        let root_path = Path::root();
        let root_map = as_mapping_or_empty(&root, &root_path)?;

        let tags = as_tag_dict(&root_map, "tags", &root_path)?;
        let collectors = as_collector_list(&root_map, "collectors", &root_path)?;
        let blacklist = as_string_set(&root_map, "blacklist", &root_path)?;
        let instance_config = as_instance_config(&root_map, "instance_config", &root_path)?;

        Ok(Document {
            tags,
            collectors,
            blacklist,
            instance_config,
        })
    }
}

fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn as_mapping_or_empty(v: &Value, path: &Path) -> Result<Mapping, ConfigError> {
    match v {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(m) => Ok(m.clone()),
        _ => Err(ConfigError::at(path.clone(), "expected a mapping")),
    }
}

fn as_tag_dict(map: &Mapping, key: &str, path: &Path) -> Result<TagSet, ConfigError> {
    let p = path.key(key);
    let Some(v) = get(map, key) else {
        return Ok(TagSet::new());
    };
    let m = match v {
        Value::Mapping(m) => m,
        _ => return Err(ConfigError::at(p, "expected a mapping of string to string")),
    };

    let mut tags = TagSet::new();
    for (k, v) in m {
        let key_str = k
            .as_str()
            .ok_or_else(|| ConfigError::at(p.clone(), "tag keys must be strings"))?;
        let val_str = v
            .as_str()
            .ok_or_else(|| ConfigError::at(p.key(key_str), "tag values must be strings"))?;
        tags.insert(key_str, val_str);
    }
    Ok(tags)
}

fn as_collector_list(
    map: &Mapping,
    key: &str,
    path: &Path,
) -> Result<Vec<CollectorEntry>, ConfigError> {
    let p = path.key(key);
    let Some(v) = get(map, key) else {
        return Ok(Vec::new());
    };
    let list = match v {
        Value::Sequence(s) => s,
        _ => return Err(ConfigError::at(p, "expected a list")),
    };

    let mut out = Vec::with_capacity(list.len());
    for (i, entry) in list.iter().enumerate() {
        let entry_path = p.index(i);
        let entry_map = match entry {
            Value::Mapping(m) => m.clone(),
            _ => return Err(ConfigError::at(entry_path, "expected a mapping")),
        };
        let type_path = entry_path.key("type");
        let type_name = get(&entry_map, "type")
            .ok_or_else(|| ConfigError::at(type_path.clone(), "required"))?
            .as_str()
            .ok_or_else(|| ConfigError::at(type_path, "expected a string"))?
            .to_string();

        let remainder: Mapping = entry_map
            .iter()
            .filter(|(k, _)| k.as_str() != Some("type"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        out.push(CollectorEntry {
            type_name,
            remainder: Value::Mapping(remainder),
        });
    }
    Ok(out)
}

fn as_string_set(map: &Mapping, key: &str, path: &Path) -> Result<HashSet<String>, ConfigError> {
    let p = path.key(key);
    let Some(v) = get(map, key) else {
        return Ok(HashSet::new());
    };
    let list = match v {
        Value::Sequence(s) => s,
        _ => return Err(ConfigError::at(p, "expected a list")),
    };
    list.iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| ConfigError::at(p.index(i), "expected a string"))
        })
        .collect()
}

fn as_instance_config(
    map: &Mapping,
    key: &str,
    path: &Path,
) -> Result<InstanceConfig, ConfigError> {
    let p = path.key(key);
    let Some(v) = get(map, key) else {
        return Ok(InstanceConfig::default());
    };
    let entry_map = match v {
        Value::Mapping(m) => m,
        _ => return Err(ConfigError::at(p, "expected a mapping")),
    };

    for k in entry_map.keys() {
        let k = k
            .as_str()
            .ok_or_else(|| ConfigError::at(p.clone(), "keys must be strings"))?;
        if !INSTANCE_CONFIG_KEYS.contains(&k) {
            return Err(ConfigError::at(p.key(k), "unknown key"));
        }
    }

    let mut cfg = InstanceConfig::default();
    if let Some(v) = get(entry_map, "max_runs") {
        cfg.max_runs = as_u64(v, &p.key("max_runs"))?;
    }
    if let Some(v) = get(entry_map, "max_errors") {
        cfg.max_errors = as_u64(v, &p.key("max_errors"))?;
    }
    if let Some(v) = get(entry_map, "graceful_timeout") {
        cfg.graceful_timeout = as_f64(v, &p.key("graceful_timeout"))?;
    }
    if let Some(v) = get(entry_map, "forceful_timeout") {
        cfg.forceful_timeout = as_f64(v, &p.key("forceful_timeout"))?;
    }
    if let Some(v) = get(entry_map, "max_forceful_attempts") {
        cfg.max_forceful_attempts = as_u64(v, &p.key("max_forceful_attempts"))? as u32;
    }
    Ok(cfg)
}

fn as_u64(v: &Value, path: &Path) -> Result<u64, ConfigError> {
    v.as_u64()
        .ok_or_else(|| ConfigError::at(path.clone(), "expected an integer"))
}

fn as_f64(v: &Value, path: &Path) -> Result<f64, ConfigError> {
    v.as_f64()
        .ok_or_else(|| ConfigError::at(path.clone(), "expected a number"))
}
