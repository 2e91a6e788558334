// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use scope::{CellSink, ReloadLatch, Scope};

use crate::errors::RestartFailure;

/// Everything needed to build one running instance (spec.md §4.4 `start`),
/// grouped so `CollectorSupervisor` can rebuild it without repeating itself
/// at every call site.
pub struct InstanceParams<'a> {
    pub exe: &'a Path,
    pub descriptor_dir: &'a Path,
    pub type_name: &'a str,
    pub factory_name: &'a str,
    pub factory: scope::SamplerFactory,
    pub parent_scope: &'a Arc<Scope>,
    pub config_value: &'a serde_yaml::Value,
    pub config_yaml: &'a str,
    pub results: Sender<(u64, bool)>,
    pub cells: Arc<dyn CellSink>,
}

/// One running worker subprocess and the bookkeeping `needs_recycling` reads
/// (spec.md §3 `InstanceState`), grounded on `Collector.Instance` in
/// `examples/original_source/semcollect/collector.py`.
pub struct InstanceState {
    worker: worker::Worker,
    child_scope: Arc<Scope>,
    reload: ReloadLatch,
    fingerprint: config::Fingerprint,
    runs: u64,
    errors: u64,
}

impl InstanceState {
    /// Builds the instance's child `Scope`, validates the collector's
    /// `setup()` against it to allocate real cells, then spawns the worker
    /// subprocess and ships it the same ordered cell ids (`SPEC_FULL.md` §D).
    /// On any failure the child scope (and whatever it allocated) is freed
    /// before returning.
    pub fn start(p: InstanceParams) -> Result<InstanceState, RestartFailure> {
        let reload = ReloadLatch::new();
        let mut extra = HashMap::new();
        extra.insert(
            scope::Capability::RELOAD,
            scope::Capability::Reload(reload.clone()),
        );
        // Bound here rather than once at the parent scope: the merged
        // descriptor-metadata-plus-remainder value can change on every
        // recycle (the descriptor is re-read fresh in `build_instance`),
        // so each instance gets its own `config` capability built from the
        // value that was actually resolved for it.
        extra.insert(
            scope::Capability::CONFIG,
            scope::Capability::Config(Arc::new(config::CollectorConfig::new(
                p.config_value.clone(),
            ))),
        );
        let child_scope = p.parent_scope.child(extra);

        match Self::start_inner(&p, &child_scope, reload.clone()) {
            Ok(inst) => Ok(inst),
            Err(e) => {
                child_scope.free();
                Err(e)
            }
        }
    }

    fn start_inner(
        p: &InstanceParams,
        child_scope: &Arc<Scope>,
        reload: ReloadLatch,
    ) -> Result<InstanceState, RestartFailure> {
        // The sampler object itself is discarded: it cannot be shipped
        // across a process boundary, but building it here allocates the
        // real cells the worker will later write through.
        let _sampler = (p.factory)(child_scope)?;

        let registry_cap = child_scope
            .require(scope::Capability::REGISTRY)
            .expect("registry capability is always bound in a collector's scope");
        let registry = registry_cap
            .as_registry()
            .expect("REGISTRY name is always bound to a Capability::Registry");
        let cell_ids = registry.owned_ids();

        let fingerprint = config::Fingerprint::observe(p.descriptor_dir, p.type_name)?;

        let worker = worker::Worker::spawn(
            p.exe,
            p.factory_name,
            p.config_yaml.to_string(),
            cell_ids,
            p.results.clone(),
            p.cells.clone(),
            reload.clone(),
        )?;

        Ok(InstanceState {
            worker,
            child_scope: child_scope.clone(),
            reload,
            fingerprint,
            runs: 0,
            errors: 0,
        })
    }

    pub fn is_alive(&mut self) -> bool {
        self.worker.is_alive()
    }

    pub fn pid(&self) -> u32 {
        self.worker.pid()
    }

    pub fn dispatch(&mut self, tick: u64) -> Result<(), worker::DispatchError> {
        self.worker.send_tick(tick)?;
        self.runs += 1;
        Ok(())
    }

    pub fn errored(&mut self, count: u64) {
        self.errors += count;
    }

    /// spec.md §4.4 `needs_recycling`: the descriptor's source fingerprint
    /// changed since start, the run/error budgets are exhausted, or the
    /// worker asked to be recycled.
    pub fn needs_recycling(
        &self,
        descriptor_dir: &Path,
        type_name: &str,
        cfg: &config::InstanceConfig,
    ) -> bool {
        let fingerprint_changed = config::Fingerprint::observe(descriptor_dir, type_name)
            .map(|now| now != self.fingerprint)
            .unwrap_or(false);

        fingerprint_changed
            || self.runs > cfg.max_runs
            || self.errors > cfg.max_errors
            || self.reload.is_set()
    }

    /// Terminates the worker subprocess, then frees the child scope. Frees
    /// nothing if termination itself fails, since the subprocess (and the
    /// cells it may still be writing) is then in an unknown state; the
    /// failure is fatal for the supervisor process (spec.md §7).
    pub fn terminate(
        self,
        graceful: bool,
        cfg: &config::InstanceConfig,
    ) -> Result<(), worker::TerminateFailure> {
        self.worker.terminate(graceful, cfg)?;
        self.child_scope.free();
        Ok(())
    }
}
