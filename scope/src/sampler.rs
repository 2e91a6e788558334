// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use crate::errors::{CollectError, ConfigError};
use crate::Scope;

/// The contract a collector supplies, as described in spec.md §6: a sampler
/// is callable with zero arguments ("sample now") and may optionally expose
/// `start`/`stop`.
pub trait Sampler: Send {
    /// Called once before the first sample.
    fn start(&mut self) -> Result<(), CollectError> {
        Ok(())
    }

    /// Take one sample, publishing values through whatever [`MetricHandle`](crate::MetricHandle)s
    /// it obtained during `setup`.
    fn sample(&mut self) -> Result<(), CollectError>;

    /// Called once after the last sample.
    fn stop(&mut self) -> Result<(), CollectError> {
        Ok(())
    }
}

/// `setup(scope) -> sampler`. A collector type is resolved to one of these at
/// compile time (see the `collectors` crate); "setup that returns no
/// sampler" is represented by the `Err` case.
pub type SamplerFactory = fn(&Scope) -> Result<Box<dyn Sampler>, ConfigError>;
