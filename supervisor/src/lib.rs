// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The collector lifecycle layer (spec.md §3, §4.4, §4.5): recycling
//! per-collector supervisors plus the top-level dispatch loop that ticks
//! them, recovers stragglers, and reloads configuration on demand.
//!
//! Grounded on `examples/original_source/semcollect/collector.py`'s
//! `Collector`/`Collector.Instance` and `core.py`'s `Core`.

mod core;
mod errors;
mod instance;
mod state;

pub use self::core::{Core, CoreParams};
pub use errors::{CollectError, RestartFailure};
pub use instance::InstanceState;
pub use state::{CollectorSupervisor, CollectorSupervisorParams, Lookup};
