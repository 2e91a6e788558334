// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

/// Applies a cell update arriving from a worker process by id, without
/// needing the original [`crate::MetricHandle`]/[`crate::StateHandle`].
///
/// Implemented by `registry::Registry`; used by the `worker` crate's
/// supervisor-side reader thread to fold IPC-forwarded writes back into the
/// authoritative cells (see `SPEC_FULL.md` §D).
pub trait CellSink: Send + Sync {
    fn set_metric(&self, id: u64, value: f64);
    fn set_state(&self, id: u64, ok: bool);
}
