// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The worker process abstraction (spec.md §4.3): supervisor-side spawn,
//! IPC wire protocol, and graceful/forceful termination of one collector
//! instance's OS subprocess, plus the worker-process-side entry point that
//! re-invokes `setup` against a replaying registry view (`SPEC_FULL.md` §D).

mod child;
mod errors;
mod framing;
mod instance;
mod wire;

pub use child::{Worker, WORKER_MODE_ENV};
pub use errors::{DispatchError, TerminateFailure};
pub use instance::{run_worker_main, WorkerRegistryView};
pub use wire::{WorkerCommand, WorkerEvent};
