// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The dependency-injection container described in spec.md §4.2: a
//! hierarchical, named-capability lookup with `child()`/`free()`, used to
//! give every collector instance exactly the subset of registry and
//! platform facilities it needs.

mod capability;
mod cell_sink;
mod errors;
mod reload;
mod sampler;
mod tags;

pub use capability::{
    Capability, CellIdSource, ConfigCapability, MetricHandle, MetricSink, PlatformProbe,
    RegistryCapability, ScopedCapability, StateHandle,
};
pub use cell_sink::CellSink;
pub use errors::{CollectError, ConfigError, MissingDependency};
pub use reload::ReloadLatch;
pub use sampler::{Sampler, SamplerFactory};
pub use tags::TagSet;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// A named mapping `name -> capability`, with an optional parent. Lookup
/// walks the parent chain; `free()` is depth-first.
pub struct Scope {
    bindings: HashMap<&'static str, Capability>,
    parent: Option<Arc<Scope>>,
    children: Mutex<Vec<Arc<Scope>>>,
}

impl Scope {
    /// Builds a root scope with no parent.
    pub fn root(bindings: HashMap<&'static str, Capability>) -> Arc<Scope> {
        Arc::new(Scope {
            bindings,
            parent: None,
            children: Mutex::new(Vec::new()),
        })
    }

    /// Returns the capability bound at the nearest ancestor (including
    /// `self`), or [`MissingDependency`] if none binds `name`.
    pub fn require(&self, name: &str) -> Result<Capability, MissingDependency> {
        if let Some(cap) = self.bindings.get(name) {
            return Ok(cap.clone());
        }
        match &self.parent {
            Some(parent) => parent.require(name),
            None => Err(MissingDependency(name.to_string())),
        }
    }

    /// Creates a child scope whose local bindings are `extra` plus, for each
    /// of *this* scope's capabilities that declare a per-child factory, a
    /// freshly constructed sub-capability (e.g. `Registry.Group` becomes a
    /// per-worker `Group`). `extra` wins on name collisions.
    pub fn child(self: &Arc<Self>, extra: HashMap<&'static str, Capability>) -> Arc<Scope> {
        let mut bindings = HashMap::new();
        for (name, cap) in &self.bindings {
            if let Some(per_child) = cap.per_child() {
                bindings.insert(*name, per_child);
            }
        }
        for (name, cap) in extra {
            bindings.insert(name, cap);
        }

        let child = Arc::new(Scope {
            bindings,
            parent: Some(self.clone()),
            children: Mutex::new(Vec::new()),
        });
        self.children.lock().push(child.clone());
        child
    }

    /// Depth-first release: free every child, then release-hook every local
    /// capability, then detach `self` from its parent's child list.
    pub fn free(self: &Arc<Self>) {
        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            child.free();
        }
        for cap in self.bindings.values() {
            cap.release();
        }
        if let Some(parent) = &self.parent {
            parent.children.lock().retain(|c| !Arc::ptr_eq(c, self));
        }
    }
}
