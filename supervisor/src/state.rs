// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use scope::Scope;

use crate::errors::{CollectError, RestartFailure};
use crate::instance::{InstanceParams, InstanceState};

/// Resolves a collector type name to its compiled-in factory. Shared between
/// the supervisor (building instances) and the worker subprocess entry point
/// (replaying `setup`), but owned as data here so this crate stays decoupled
/// from any particular collector set.
pub type Lookup = Arc<dyn Fn(&str) -> Option<scope::SamplerFactory> + Send + Sync>;

pub struct CollectorSupervisorParams {
    pub logical_name: String,
    pub type_name: String,
    pub descriptor_dir: PathBuf,
    pub exe: PathBuf,
    pub parent_scope: Arc<Scope>,
    pub config_value: serde_yaml::Value,
    pub lookup: Lookup,
    pub results: Sender<(u64, bool)>,
    pub cells: Arc<dyn scope::CellSink>,
    pub instance_config: config::InstanceConfig,
}

/// One configured collector's lifecycle state machine (spec.md §3, §4.4),
/// grounded on the `Collector` class in
/// `examples/original_source/semcollect/collector.py`.
pub struct CollectorSupervisor {
    logical_name: String,
    type_name: String,
    descriptor_dir: PathBuf,
    exe: PathBuf,
    parent_scope: Arc<Scope>,
    config_value: serde_yaml::Value,
    lookup: Lookup,
    results: Sender<(u64, bool)>,
    cells: Arc<dyn scope::CellSink>,
    instance_config: config::InstanceConfig,
    instance: Option<InstanceState>,
    failed_restart_countdown: u32,
}

impl CollectorSupervisor {
    pub fn new(p: CollectorSupervisorParams) -> CollectorSupervisor {
        CollectorSupervisor {
            logical_name: p.logical_name,
            type_name: p.type_name,
            descriptor_dir: p.descriptor_dir,
            exe: p.exe,
            parent_scope: p.parent_scope,
            config_value: p.config_value,
            lookup: p.lookup,
            results: p.results,
            cells: p.cells,
            instance_config: p.instance_config,
            instance: None,
            failed_restart_countdown: 0,
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// The running instance's worker pid, for logging and tests. `None` if
    /// no instance is currently running.
    pub fn instance_pid(&self) -> Option<u32> {
        self.instance.as_ref().map(InstanceState::pid)
    }

    /// Re-reads the collector's descriptor and resolves its factory fresh
    /// every time, so a descriptor rewrite that rebinds `factory:` takes
    /// effect on the next recycle. The descriptor's free-form metadata is
    /// folded into the configured remainder (the remainder wins on key
    /// conflicts) before it reaches the collector's `config` capability,
    /// so a descriptor can carry defaults a collector's own config entry
    /// may override.
    fn build_instance(&self) -> Result<InstanceState, RestartFailure> {
        let descriptor = config::CollectorDescriptor::load(&self.descriptor_dir, &self.type_name)?;
        let factory = (self.lookup)(&descriptor.factory).ok_or_else(|| {
            RestartFailure(format!(
                "{}: unknown collector factory '{}'",
                self.type_name, descriptor.factory
            ))
        })?;

        let merged_config = config::merge_metadata(&descriptor.metadata, &self.config_value);
        let config_yaml = serde_yaml::to_string(&merged_config)
            .map_err(|e| RestartFailure(format!("{}: {e}", self.type_name)))?;

        InstanceState::start(InstanceParams {
            exe: &self.exe,
            descriptor_dir: &self.descriptor_dir,
            type_name: &self.type_name,
            factory_name: &descriptor.factory,
            factory,
            parent_scope: &self.parent_scope,
            config_value: &merged_config,
            config_yaml: &config_yaml,
            results: self.results.clone(),
            cells: self.cells.clone(),
        })
    }

    /// Initial construction. A no-op if already running; failures here are
    /// not back-off gated and propagate straight to the caller, since there
    /// is no existing instance to protect (spec.md §4.4 `start`).
    pub fn start(&mut self) -> Result<(), RestartFailure> {
        if self.instance.is_some() {
            return Ok(());
        }
        self.instance = Some(self.build_instance()?);
        Ok(())
    }

    /// Gracefully stops the running instance, if any.
    pub fn stop(&mut self, graceful: bool) -> Result<(), worker::TerminateFailure> {
        match self.instance.take() {
            Some(inst) => inst.terminate(graceful, &self.instance_config),
            None => Ok(()),
        }
    }

    /// Unconditional restart: terminate the current instance (if any), then
    /// construct a replacement, with no back-off gating. Used for a worker
    /// observed dead or stuck past the dispatch timeout — there is nothing
    /// left to "keep alive" either way (spec.md §4.4 `restart`).
    pub fn restart(&mut self, graceful: bool) -> Result<(), worker::TerminateFailure> {
        if let Some(old) = self.instance.take() {
            old.terminate(graceful, &self.instance_config)?;
        }
        match self.build_instance() {
            Ok(inst) => self.instance = Some(inst),
            Err(e) => log::error!("{}: failed to restart: {e}", self.logical_name),
        }
        Ok(())
    }

    /// Proactive recycle: construct the replacement *first*. If construction
    /// fails, the current instance is left running untouched and a back-off
    /// countdown is armed so the next nine `check()` calls skip straight
    /// through without retrying; the tenth retries (spec.md §4.4
    /// `soft_restart`, Error Handling `RestartFailure`).
    pub fn soft_restart(&mut self, graceful: bool) -> Result<(), worker::TerminateFailure> {
        if self.failed_restart_countdown > 0 {
            self.failed_restart_countdown -= 1;
            if self.failed_restart_countdown > 0 {
                return Ok(());
            }
        }

        match self.build_instance() {
            Ok(new_inst) => {
                if let Some(old) = self.instance.take() {
                    old.terminate(graceful, &self.instance_config)?;
                }
                self.instance = Some(new_inst);
                self.failed_restart_countdown = 0;
            }
            Err(e) => {
                log::error!("{}: recycle failed, backing off: {e}", self.logical_name);
                self.failed_restart_countdown = 10;
            }
        }
        Ok(())
    }

    pub fn errored(&mut self, count: u64) {
        if let Some(inst) = self.instance.as_mut() {
            inst.errored(count);
        }
    }

    /// spec.md §4.4 `check`: called between ticks. Starts a missing
    /// instance, restarts a dead one, or recycles one that needs it.
    pub fn check(&mut self) -> Result<(), worker::TerminateFailure> {
        let (dead, needs_recycle) = match self.instance.as_mut() {
            None => {
                match self.build_instance() {
                    Ok(new_inst) => self.instance = Some(new_inst),
                    Err(e) => log::error!("{}: failed to start: {e}", self.logical_name),
                }
                return Ok(());
            }
            Some(inst) => {
                let dead = !inst.is_alive();
                let needs_recycle = !dead
                    && inst.needs_recycling(&self.descriptor_dir, &self.type_name, &self.instance_config);
                (dead, needs_recycle)
            }
        };

        if dead {
            log::error!("{}: worker is no longer alive, restarting", self.logical_name);
            return self.restart(false);
        }
        if needs_recycle {
            log::info!("{}: recycling", self.logical_name);
            return self.soft_restart(true);
        }
        Ok(())
    }

    /// Dispatches one tick, after a `check()` pass (spec.md §4.4 `collect`).
    /// `Fatal` propagates a worker-refused-to-die condition; `Dispatch` is
    /// recovered by the caller (logged, this collector skipped the round).
    pub fn collect(&mut self, tick: u64) -> Result<(), CollectError> {
        self.check().map_err(CollectError::Fatal)?;
        match self.instance.as_mut() {
            Some(inst) => inst.dispatch(tick).map_err(CollectError::Dispatch),
            None => Err(CollectError::Dispatch(worker::DispatchError(
                "no instance running".to_string(),
            ))),
        }
    }
}
