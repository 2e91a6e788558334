// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use serde_yaml::Value;

/// The `config` capability: a typed-accessor wrapper over a collector's
/// opaque configuration remainder, in the style of `as_t`/`as_dict` from the
/// system this was adapted from.
pub struct CollectorConfig {
    raw: Value,
}

impl CollectorConfig {
    pub fn new(raw: Value) -> CollectorConfig {
        CollectorConfig { raw }
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.raw.as_mapping()?.iter().find_map(|(k, v)| {
            if k.as_str() == Some(key) {
                Some(v)
            } else {
                None
            }
        })
    }
}

impl scope::ConfigCapability for CollectorConfig {
    fn get_str(&self, key: &str) -> Option<String> {
        self.field(key)?.as_str().map(str::to_string)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.field(key)?.as_i64()
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.field(key)?.as_f64()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.field(key)?.as_bool()
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}
