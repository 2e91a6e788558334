// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::Arc;

use parking_lot::Mutex;
use scope::{Capability, CellIdSource, MetricHandle, MetricSink, ScopedCapability, StateHandle, TagSet};

use crate::{CellId, Registry};

/// A sub-view of a [`Registry`] bound to one collector supervisor or worker
/// instance. Owns the set of cell ids allocated through it; freeing a
/// `Group` frees exactly those ids, not its children's (children are freed
/// transitively by the owning [`scope::Scope`] tree).
pub struct Group {
    registry: Arc<Registry>,
    tags: TagSet,
    owned: Arc<Mutex<Vec<CellId>>>,
}

impl Group {
    pub fn new(registry: Arc<Registry>) -> Group {
        Group {
            registry,
            tags: TagSet::new(),
            owned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_tags(&self, tags: TagSet) -> Group {
        Group {
            registry: self.registry.clone(),
            tags: self.tags.compose(&tags),
            owned: self.owned.clone(),
        }
    }

    /// The ids allocated through this `Group` so far, in allocation order.
    /// The supervisor reads this after a validation-only `setup()` call to
    /// ship the same ordered ids to the worker subprocess for deterministic
    /// replay (see `SPEC_FULL.md` §D).
    pub fn owned_ids(&self) -> Vec<CellId> {
        self.owned.lock().clone()
    }
}

impl MetricSink for Group {
    fn metric(&self, tags: TagSet) -> Box<dyn MetricHandle> {
        let (id, handle) = self.registry.metric(self.tags.compose(&tags));
        self.owned.lock().push(id);
        Box::new(handle)
    }

    fn state(&self, tags: TagSet) -> Box<dyn StateHandle> {
        let (id, handle) = self.registry.state(self.tags.compose(&tags));
        self.owned.lock().push(id);
        Box::new(handle)
    }

    fn scoped(&self, tags: TagSet) -> Arc<dyn MetricSink> {
        Arc::new(self.with_tags(tags))
    }
}

impl ScopedCapability for Group {
    /// Every worker instance gets a fresh child `Group` over the same
    /// registry; it starts with no pre-bound tags and no owned ids.
    fn per_child(&self) -> Option<Capability> {
        Some(Capability::Registry(Arc::new(Group::new(
            self.registry.clone(),
        ))))
    }

    /// Frees every id allocated through this `Group` (including through any
    /// `scoped()` view derived from it). Idempotent.
    fn release(&self) {
        let ids = std::mem::take(&mut *self.owned.lock());
        for id in ids {
            self.registry.free(id);
        }
    }
}

impl CellIdSource for Group {
    fn owned_ids(&self) -> Vec<CellId> {
        Group::owned_ids(self)
    }
}
