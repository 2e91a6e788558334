// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fs;
use std::path::{Path as FsPath, PathBuf};
use std::time::SystemTime;

use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

/// `<dir>/<type>.collector` — source fingerprint unit for spec.md §4.4's
/// recycle-on-source-change policy (see `SPEC_FULL.md` §C).
pub fn descriptor_path(dir: &FsPath, type_name: &str) -> PathBuf {
    dir.join(format!("{type_name}.collector"))
}

/// A collector type's descriptor: which built-in factory it binds to, plus
/// free-form metadata folded into that collector's `config` capability.
#[derive(Clone, Debug)]
pub struct CollectorDescriptor {
    pub factory: String,
    pub metadata: Value,
}

impl CollectorDescriptor {
    pub fn load(dir: &FsPath, type_name: &str) -> Result<CollectorDescriptor, ConfigError> {
        let path = descriptor_path(dir, type_name);
        let text = fs::read_to_string(&path)
            .map_err(|e| ConfigError::new(format!("{}: {e}", path.display())))?;
        let value: Value = serde_yaml::from_str(&text)
            .map_err(|e| ConfigError::new(format!("{}: invalid YAML: {e}", path.display())))?;

        let factory = value
            .as_mapping()
            .and_then(|m| {
                m.iter()
                    .find(|(k, _)| k.as_str() == Some("factory"))
                    .map(|(_, v)| v)
            })
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| type_name.to_string());

        Ok(CollectorDescriptor {
            factory,
            metadata: value,
        })
    }
}

/// Folds a descriptor's free-form metadata into a collector's configured
/// remainder: the metadata acts as defaults, the configured remainder wins
/// on key conflicts. The descriptor's own `factory` key is never carried
/// into the merged result.
pub fn merge_metadata(metadata: &Value, remainder: &Value) -> Value {
    let mut merged = match metadata {
        Value::Mapping(m) => {
            let mut out = m.clone();
            out.remove("factory");
            out
        }
        _ => Mapping::new(),
    };

    if let Value::Mapping(r) = remainder {
        for (k, v) in r {
            merged.insert(k.clone(), v.clone());
        }
    }

    Value::Mapping(merged)
}

/// `(size, mtime)` of a descriptor file, the fingerprint an
/// `InstanceState` records at start and compares against on every `check()`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime: SystemTime,
}

impl Fingerprint {
    pub fn observe(dir: &FsPath, type_name: &str) -> Result<Fingerprint, ConfigError> {
        let path = descriptor_path(dir, type_name);
        let meta = fs::metadata(&path)
            .map_err(|e| ConfigError::new(format!("{}: {e}", path.display())))?;
        let mtime = meta
            .modified()
            .map_err(|e| ConfigError::new(format!("{}: {e}", path.display())))?;
        Ok(Fingerprint {
            size: meta.len(),
            mtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn descriptor_defaults_factory_to_type_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor_path(dir.path(), "cpu");
        File::create(&path).unwrap().write_all(b"{}").unwrap();

        let d = CollectorDescriptor::load(dir.path(), "cpu").unwrap();
        assert_eq!(d.factory, "cpu");
    }

    #[test]
    fn descriptor_can_bind_to_a_different_factory() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor_path(dir.path(), "cpu-alt");
        File::create(&path)
            .unwrap()
            .write_all(b"factory: cpu\n")
            .unwrap();

        let d = CollectorDescriptor::load(dir.path(), "cpu-alt").unwrap();
        assert_eq!(d.factory, "cpu");
    }

    #[test]
    fn fingerprint_changes_when_descriptor_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor_path(dir.path(), "cpu");
        File::create(&path).unwrap().write_all(b"a: 1").unwrap();
        let before = Fingerprint::observe(dir.path(), "cpu").unwrap();

        sleep(Duration::from_millis(10));
        File::create(&path).unwrap().write_all(b"a: 22").unwrap();
        let after = Fingerprint::observe(dir.path(), "cpu").unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn missing_descriptor_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CollectorDescriptor::load(dir.path(), "nope").is_err());
    }

    #[test]
    fn merge_metadata_prefers_remainder_and_drops_factory() {
        let metadata: Value = serde_yaml::from_str("factory: cpu\npath: /proc/stat\ninterval: 5\n").unwrap();
        let remainder: Value = serde_yaml::from_str("interval: 10\n").unwrap();

        let merged = merge_metadata(&metadata, &remainder);
        let m = merged.as_mapping().unwrap();
        assert!(m.get("factory").is_none());
        assert_eq!(m.get("path").unwrap().as_str(), Some("/proc/stat"));
        assert_eq!(m.get("interval").unwrap().as_i64(), Some(10));
    }

    #[test]
    fn merge_metadata_with_no_descriptor_metadata_is_just_the_remainder() {
        let remainder: Value = serde_yaml::from_str("interval: 10\n").unwrap();
        let merged = merge_metadata(&Value::Null, &remainder);
        assert_eq!(merged.as_mapping().unwrap().get("interval").unwrap().as_i64(), Some(10));
    }
}
