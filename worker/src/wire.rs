// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use serde::{Deserialize, Serialize};

/// Supervisor → worker, over the worker's stdin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WorkerCommand {
    /// Sent exactly once, before any `Tick`: the collector type to resolve
    /// against the worker process' compiled-in factory table, its
    /// configuration (YAML text, re-parsed on the worker side), and the
    /// ordered cell ids the supervisor allocated for this instance during
    /// its validation run of `setup` (see `SPEC_FULL.md` §D).
    Init {
        type_name: String,
        config_yaml: String,
        cell_ids: Vec<u64>,
    },
    /// One dispatch; `sampler()` should be invoked once in response.
    Tick(u64),
    /// Graceful-shutdown sentinel: finish any in-flight tick, call `stop()`,
    /// exit zero.
    Shutdown,
}

/// Worker → supervisor, over the worker's stdout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WorkerEvent {
    /// `setup`/`start` succeeded; the worker is ready for ticks.
    Ready,
    /// One tick's outcome.
    Done { tick: u64, ok: bool },
    /// Forwards a `MetricHandle::update`/`unset` write to the authoritative
    /// cell (`unset` is represented as `value: f64::NAN`).
    MetricUpdate { id: u64, value: f64 },
    /// Forwards a `StateHandle::update` write.
    StateUpdate { id: u64, ok: bool },
    /// The sampler set its `reload` capability: request a soft-restart.
    ReloadRequested,
    /// `setup`/`start` failed; the worker will exit non-zero without
    /// becoming ready.
    Fatal { message: String },
}
