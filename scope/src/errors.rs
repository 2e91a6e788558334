// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// Raised by [`Scope::require`](crate::Scope::require) when no ancestor binds
/// the requested capability name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MissingDependency(pub String);

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no component named '{}' available", self.0)
    }
}

impl std::error::Error for MissingDependency {}

/// Malformed configuration, or a collector that failed `setup`. Fatal for the
/// collector it concerns; surfaced to the embedder, never recovered locally.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl From<MissingDependency> for ConfigError {
    fn from(e: MissingDependency) -> Self {
        ConfigError(e.to_string())
    }
}

impl ConfigError {
    pub fn new(msg: impl Into<String>) -> ConfigError {
        ConfigError(msg.into())
    }
}

/// A sampler raised while being sampled. Recovered locally: the worker
/// reports `ok=false` for the tick and the supervisor counts an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectError(pub String);

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CollectError {}

impl CollectError {
    pub fn new(msg: impl Into<String>) -> CollectError {
        CollectError(msg.into())
    }
}
