// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::Arc;

use crate::reload::ReloadLatch;
use crate::tags::TagSet;

/// A writable handle to a single numeric cell. Obtained from a
/// [`MetricSink`]; holding one does not keep the underlying cell alive past
/// the owning [`Group`](../registry/struct.Group.html) being freed.
pub trait MetricHandle: Send + Sync {
    fn update(&self, value: f64);
    /// Resets the cell to "not yet observed" (`NaN`).
    fn unset(&self);
}

/// A writable handle to a single boolean cell.
pub trait StateHandle: Send + Sync {
    fn update(&self, ok: bool);
}

/// The `"registry"` capability surface offered to a collector's `setup`.
///
/// Implemented by [`registry::Group`](../registry/struct.Group.html) in the
/// supervisor process, and by a replaying view in the worker process (see
/// `SPEC_FULL.md` §D) that forwards writes over IPC instead of allocating
/// fresh ids.
pub trait MetricSink: Send + Sync {
    fn metric(&self, tags: TagSet) -> Box<dyn MetricHandle>;
    fn state(&self, tags: TagSet) -> Box<dyn StateHandle>;
    /// A sub-view with `tags` pre-bound as an additional base layer under
    /// whatever this sink already composes.
    fn scoped(&self, tags: TagSet) -> Arc<dyn MetricSink>;
}

/// Structural hook a capability may implement to participate in
/// [`Scope::child`](crate::Scope::child) / [`Scope::free`](crate::Scope::free):
/// a capability that declares a per-child factory gets a freshly constructed
/// sub-capability grafted into every child scope, and a capability that
/// declares a release hook gets torn down when its owning scope is freed.
///
/// Any object can participate by implementing this; nothing about `Scope`
/// privileges the registry specifically, even though it is the only built-in
/// capability that currently uses it.
pub trait ScopedCapability: Send + Sync {
    fn per_child(&self) -> Option<Capability> {
        None
    }
    fn release(&self) {}
}

/// Exposes the ids a registry capability has allocated so far, in
/// allocation order. Used only by the supervisor process, after an
/// in-process validation `setup()` run against a real `Group`, to ship the
/// same ordered ids to a worker subprocess for deterministic replay (see
/// `SPEC_FULL.md` §D). A worker-side replaying view has no ids of its own to
/// report and returns an empty list.
pub trait CellIdSource: Send + Sync {
    fn owned_ids(&self) -> Vec<u64>;
}

/// The concrete capability bound to the `"registry"` name: both a
/// [`MetricSink`] and a [`ScopedCapability`], plus [`CellIdSource`] so the
/// supervisor can read back a validation run's allocated ids.
pub trait RegistryCapability: MetricSink + ScopedCapability + CellIdSource {}

impl<T: MetricSink + ScopedCapability + CellIdSource> RegistryCapability for T {}

/// The `"platform"` capability.
pub trait PlatformProbe: Send + Sync {
    fn is_linux(&self) -> bool;
    fn is_darwin(&self) -> bool;
}

/// The `"config"` capability: the opaque, per-collector remainder of its
/// configuration entry.
pub trait ConfigCapability: Send + Sync {
    fn get_str(&self, key: &str) -> Option<String>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn raw(&self) -> &serde_yaml::Value;
}

/// One binding in a [`Scope`](crate::Scope): the runtime value behind a
/// capability name.
#[derive(Clone)]
pub enum Capability {
    Platform(Arc<dyn PlatformProbe>),
    Registry(Arc<dyn RegistryCapability>),
    Config(Arc<dyn ConfigCapability>),
    Reload(ReloadLatch),
}

impl Capability {
    pub const PLATFORM: &'static str = "platform";
    pub const REGISTRY: &'static str = "registry";
    pub const CONFIG: &'static str = "config";
    pub const RELOAD: &'static str = "reload";

    pub(crate) fn per_child(&self) -> Option<Capability> {
        match self {
            Capability::Registry(r) => r.per_child(),
            _ => None,
        }
    }

    pub(crate) fn release(&self) {
        if let Capability::Registry(r) = self {
            r.release();
        }
    }

    pub fn as_platform(&self) -> Option<&Arc<dyn PlatformProbe>> {
        match self {
            Capability::Platform(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_registry(&self) -> Option<&Arc<dyn RegistryCapability>> {
        match self {
            Capability::Registry(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&Arc<dyn ConfigCapability>> {
        match self {
            Capability::Config(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_reload(&self) -> Option<&ReloadLatch> {
        match self {
            Capability::Reload(r) => Some(r),
            _ => None,
        }
    }
}
