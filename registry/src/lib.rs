// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The process-wide, shared metric/state table (spec.md §4.1). Cells are
//! identified by a dense, monotonic id; the supervisor process holds the
//! only [`Registry`] and reads it via [`Registry::snapshot`], while workers
//! write through the [`scope::MetricHandle`]/[`scope::StateHandle`] returned
//! by a [`Group`].

mod group;

pub use group::Group;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use scope::{MetricHandle, StateHandle, TagSet};

/// A dense id allocated from [`Registry`]'s monotonic counter. Never reused.
pub type CellId = u64;

#[derive(Default)]
struct Cells {
    metrics: BTreeMap<CellId, (Arc<AtomicU64>, TagSet)>,
    states: BTreeMap<CellId, (Arc<AtomicBool>, TagSet)>,
}

/// An ordered, point-in-time read of every live cell.
pub struct Snapshot {
    pub metrics: Vec<(TagSet, f64)>,
    pub states: Vec<(TagSet, bool)>,
}

/// The shared table backing every [`Group`] in a [`scope::Scope`] tree.
///
/// A real cross-process shared-memory segment would put `Cells` in mapped
/// memory; here the registry lives in the supervisor process and workers
/// reach it indirectly over IPC (see `worker::WorkerRegistryView`), so a
/// `Mutex`-guarded map is sufficient — see `SPEC_FULL.md` §D.
pub struct Registry {
    next_id: AtomicU64,
    cells: Mutex<Cells>,
    base: TagSet,
}

impl Registry {
    pub fn new(base: TagSet) -> Arc<Registry> {
        Arc::new(Registry {
            next_id: AtomicU64::new(0),
            cells: Mutex::new(Cells::default()),
            base,
        })
    }

    /// Allocates a fresh metric cell, composing `tags` over the registry's
    /// base tags (per-cell keys win on conflict).
    pub fn metric(&self, tags: TagSet) -> (CellId, MetricCellHandle) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cell = Arc::new(AtomicU64::new(f64::NAN.to_bits()));
        self.cells
            .lock()
            .metrics
            .insert(id, (cell.clone(), self.base.compose(&tags)));
        (id, MetricCellHandle(cell))
    }

    /// Allocates a fresh state cell, default `false`.
    pub fn state(&self, tags: TagSet) -> (CellId, StateCellHandle) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cell = Arc::new(AtomicBool::new(false));
        self.cells
            .lock()
            .states
            .insert(id, (cell.clone(), self.base.compose(&tags)));
        (id, StateCellHandle(cell))
    }

    /// Applies a value to an already-allocated metric cell. A no-op if `id`
    /// has been freed or never existed (e.g. a late write racing a worker
    /// recycle).
    pub fn set_metric(&self, id: CellId, value: f64) {
        if let Some((cell, _)) = self.cells.lock().metrics.get(&id) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// As [`Registry::set_metric`], for state cells.
    pub fn set_state(&self, id: CellId, ok: bool) {
        if let Some((cell, _)) = self.cells.lock().states.get(&id) {
            cell.store(ok, Ordering::Relaxed);
        }
    }

    /// Removes a cell. Idempotent: freeing an id twice, or an id that was
    /// never allocated, is a no-op.
    pub fn free(&self, id: CellId) {
        let mut cells = self.cells.lock();
        cells.metrics.remove(&id);
        cells.states.remove(&id);
    }

    /// An ordered enumeration of every live cell's tags and current value.
    /// Each cell's read is atomic; the snapshot as a whole is not
    /// transactional across cells.
    pub fn snapshot(&self) -> Snapshot {
        let cells = self.cells.lock();
        let metrics = cells
            .metrics
            .values()
            .map(|(cell, tags)| (tags.clone(), f64::from_bits(cell.load(Ordering::Relaxed))))
            .collect();
        let states = cells
            .states
            .values()
            .map(|(cell, tags)| (tags.clone(), cell.load(Ordering::Relaxed)))
            .collect();
        Snapshot { metrics, states }
    }

    /// A fresh, empty top-level [`Group`] bound to this registry.
    pub fn group(self: &Arc<Self>) -> Group {
        Group::new(self.clone())
    }
}

/// A writable handle to one metric cell. Cheap to clone the backing
/// reference; holding one does not keep the cell enumerated by
/// [`Registry::snapshot`] once its owning [`Group`] frees it.
pub struct MetricCellHandle(Arc<AtomicU64>);

impl MetricHandle for MetricCellHandle {
    fn update(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn unset(&self) {
        self.0.store(f64::NAN.to_bits(), Ordering::Relaxed);
    }
}

pub struct StateCellHandle(Arc<AtomicBool>);

impl StateHandle for StateCellHandle {
    fn update(&self, ok: bool) {
        self.0.store(ok, Ordering::Relaxed);
    }
}

impl scope::CellSink for Registry {
    fn set_metric(&self, id: CellId, value: f64) {
        Registry::set_metric(self, id, value);
    }

    fn set_state(&self, id: CellId, ok: bool) {
        Registry::set_state(self, id, ok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_not_reused() {
        let reg = Registry::new(TagSet::new());
        let (a, _) = reg.metric(TagSet::new());
        let (b, _) = reg.state(TagSet::new());
        let (c, _) = reg.metric(TagSet::new());
        reg.free(b);
        let (d, _) = reg.metric(TagSet::new());
        assert!(a < b && b < c && c < d);
        assert_ne!(d, b);
    }

    #[test]
    fn base_tags_compose_with_per_cell_tags_cell_wins() {
        let reg = Registry::new(TagSet::from_pairs([("b", "2")]));
        let (_, handle) = reg.metric(TagSet::from_pairs([("a", "1"), ("b", "9")]));
        handle.update(1.0);
        let snap = reg.snapshot();
        let (tags, value) = &snap.metrics[0];
        assert_eq!(tags.get("a"), Some("1"));
        assert_eq!(tags.get("b"), Some("9"));
        assert_eq!(*value, 1.0);
    }

    #[test]
    fn snapshot_reports_nan_for_unwritten_and_exact_count() {
        let reg = Registry::new(TagSet::new());
        for _ in 0..5 {
            reg.metric(TagSet::new());
        }
        let snap = reg.snapshot();
        assert_eq!(snap.metrics.len(), 5);
        assert!(snap.metrics.iter().all(|(_, v)| v.is_nan()));
    }

    #[test]
    fn set_metric_and_set_state_apply_by_id_and_ignore_unknown_ids() {
        use scope::CellSink;

        let reg = Registry::new(TagSet::new());
        let (id, _) = reg.metric(TagSet::new());
        reg.set_metric(id, 42.0);
        reg.set_metric(999, 1.0);
        assert_eq!(reg.snapshot().metrics[0].1, 42.0);

        let (sid, _) = reg.state(TagSet::new());
        CellSink::set_state(&reg, sid, true);
        assert!(reg.snapshot().states[0].1);
    }

    #[test]
    fn freed_cell_is_not_enumerated() {
        let reg = Registry::new(TagSet::new());
        let (id, _) = reg.metric(TagSet::new());
        reg.metric(TagSet::new());
        reg.free(id);
        assert_eq!(reg.snapshot().metrics.len(), 1);
    }
}
