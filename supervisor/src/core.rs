// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::CollectError;
use crate::state::{CollectorSupervisor, CollectorSupervisorParams, Lookup};

/// Tick numbers wrap at this bound (spec.md §4.5) so a `u64` tick can be
/// framed compactly and the (tick -> supervisor) map used per round never
/// grows unbounded even if a worker never reports back.
const TASK_MOD: u64 = 1 << 20;

/// Fixed, process-lifetime configuration for one `Core` (spec.md §4.5,
/// `SPEC_FULL.md` §C). Re-read from disk on every `reload`.
pub struct CoreParams {
    pub config_path: PathBuf,
    pub collector_dirs: Vec<PathBuf>,
    pub exe: PathBuf,
    pub lookup: Lookup,
    pub timeout: Duration,
    pub interval: Duration,
    pub backoff: Duration,
}

/// The agent's top-level dispatch loop, grounded on the `Core` class in
/// `examples/original_source/semcollect/core.py`. Owns every
/// `CollectorSupervisor` built from the current configuration and the
/// shared result queue their worker subprocesses report ticks back through.
pub struct Core {
    params: CoreParams,
    supervisors: Vec<CollectorSupervisor>,
    registry: Arc<registry::Registry>,
    results_tx: Sender<(u64, bool)>,
    results_rx: Receiver<(u64, bool)>,
    signalled: Arc<AtomicBool>,
    tick: u64,
}

impl Core {
    pub fn new(params: CoreParams) -> Result<Core, scope::ConfigError> {
        let (results_tx, results_rx) = mpsc::channel();
        let (supervisors, registry) = Self::build(&params, results_tx.clone())?;
        Ok(Core {
            params,
            supervisors,
            registry,
            results_tx,
            results_rx,
            signalled: Arc::new(AtomicBool::new(false)),
            tick: 0,
        })
    }

    /// A handle a signal-handling thread can set to interrupt the sleep
    /// phase of `run_once` (spec.md §4.5 `signalled`).
    pub fn signalled_handle(&self) -> Arc<AtomicBool> {
        self.signalled.clone()
    }

    pub fn signal(&self) {
        self.signalled.store(true, Ordering::SeqCst);
    }

    pub fn registry(&self) -> &Arc<registry::Registry> {
        &self.registry
    }

    fn build(
        params: &CoreParams,
        results_tx: Sender<(u64, bool)>,
    ) -> Result<(Vec<CollectorSupervisor>, Arc<registry::Registry>), scope::ConfigError> {
        let doc = config::Document::load(&params.config_path)?;
        let registry = registry::Registry::new(doc.tags.clone());

        let mut supervisors = Vec::new();
        for entry in &doc.collectors {
            if doc.blacklist.contains(&entry.type_name) {
                continue;
            }

            match Self::build_one(params, entry, &doc.instance_config, &registry, results_tx.clone()) {
                Ok(supervisor) => supervisors.push(supervisor),
                Err(e) => {
                    for mut s in supervisors {
                        if let Err(e2) = s.stop(true) {
                            log::error!("cleanup after failed start-up: {e2}");
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok((supervisors, registry))
    }

    fn build_one(
        params: &CoreParams,
        entry: &config::CollectorEntry,
        instance_config: &config::InstanceConfig,
        registry: &Arc<registry::Registry>,
        results_tx: Sender<(u64, bool)>,
    ) -> Result<CollectorSupervisor, scope::ConfigError> {
        let dir = params
            .collector_dirs
            .iter()
            .find(|d| config::descriptor_path(d, &entry.type_name).is_file())
            .ok_or_else(|| {
                scope::ConfigError::new(format!(
                    "{}: no descriptor found in configured collector directories",
                    entry.type_name
                ))
            })?
            .clone();

        let group = registry.group();
        let mut bindings = HashMap::new();
        bindings.insert(
            scope::Capability::PLATFORM,
            scope::Capability::Platform(Arc::new(platform::Platform::probe())),
        );
        bindings.insert(
            scope::Capability::REGISTRY,
            scope::Capability::Registry(Arc::new(group)),
        );
        // `config` is bound per instance instead (see `InstanceState::start`):
        // it's folded together with the collector's descriptor metadata,
        // which is resolved fresh on every recycle.
        let parent_scope = scope::Scope::root(bindings);

        let mut supervisor = CollectorSupervisor::new(CollectorSupervisorParams {
            logical_name: entry.type_name.clone(),
            type_name: entry.type_name.clone(),
            descriptor_dir: dir,
            exe: params.exe.clone(),
            parent_scope,
            config_value: entry.remainder.clone(),
            lookup: params.lookup.clone(),
            results: results_tx,
            cells: registry.clone() as Arc<dyn scope::CellSink>,
            instance_config: instance_config.clone(),
        });
        supervisor.start()?;
        Ok(supervisor)
    }

    /// One full dispatch round (spec.md §4.5 `collect_all`): tick every
    /// supervisor, wait up to `timeout` draining the shared result queue,
    /// force-restart any straggler still outstanding, then drop any late
    /// results that trickle in afterward.
    pub fn collect_all(&mut self) -> Result<(), worker::TerminateFailure> {
        let mut outstanding: HashMap<u64, usize> = HashMap::new();

        for idx in 0..self.supervisors.len() {
            let t = self.tick;
            self.tick = (self.tick + 1) % TASK_MOD;
            match self.supervisors[idx].collect(t) {
                Ok(()) => {
                    outstanding.insert(t, idx);
                }
                Err(CollectError::Fatal(e)) => return Err(e),
                Err(CollectError::Dispatch(e)) => {
                    log::error!(
                        "{}: failed to dispatch: {e}",
                        self.supervisors[idx].logical_name()
                    );
                }
            }
        }

        let mut time_left = self.params.timeout;
        let mut then = Instant::now();

        while !outstanding.is_empty() && !time_left.is_zero() {
            match self.results_rx.recv_timeout(time_left) {
                Ok((tick, ok)) => {
                    let now = Instant::now();
                    time_left = time_left.saturating_sub(now.saturating_duration_since(then));
                    then = now;

                    match outstanding.remove(&tick) {
                        Some(idx) if !ok => self.supervisors[idx].errored(1),
                        Some(_) => {}
                        None => log::warn!("no outstanding collector for tick {tick}"),
                    }
                }
                Err(_) => break,
            }
        }

        for (_, idx) in outstanding.drain() {
            log::warn!(
                "{}: straggler past the dispatch timeout, restarting",
                self.supervisors[idx].logical_name()
            );
            self.supervisors[idx].restart(false)?;
        }

        while self.results_rx.try_recv().is_ok() {}

        Ok(())
    }

    /// spec.md §4.5 `run_once`: one `collect_all` round, then a cooperative
    /// wait until the next scheduled run (checking every supervisor each
    /// wake-up), or a flat back-off if the round itself overran the
    /// interval.
    pub fn run_once(&mut self) -> Result<(), worker::TerminateFailure> {
        self.signalled.store(false, Ordering::SeqCst);
        let next_run = Instant::now() + self.params.interval;

        self.collect_all()?;

        if self.signalled.load(Ordering::SeqCst) {
            return Ok(());
        }

        if log::log_enabled!(log::Level::Debug) {
            let snap = self.registry.snapshot();
            for (tags, value) in &snap.metrics {
                if value.is_nan() {
                    log::debug!("{tags}: <unset>");
                } else {
                    log::debug!("{tags}: {value:.2}");
                }
            }
        }

        if Instant::now() >= next_run {
            thread::sleep(self.params.backoff);
            return Ok(());
        }

        while Instant::now() < next_run {
            let remaining = next_run.saturating_duration_since(Instant::now());
            thread::sleep(remaining.min(Duration::from_secs(1)));

            if self.signalled.load(Ordering::SeqCst) {
                return Ok(());
            }
            for s in &mut self.supervisors {
                s.check()?;
            }
        }

        Ok(())
    }

    /// spec.md §4.5 `reload`: rebuild every supervisor and the registry from
    /// the configuration on disk, then gracefully stop the superseded
    /// supervisors. Leaves the current set untouched if the rebuild itself
    /// fails.
    pub fn reload(&mut self) {
        log::info!("reloading configuration");
        match Self::build(&self.params, self.results_tx.clone()) {
            Ok((new_supervisors, new_registry)) => {
                let old = std::mem::replace(&mut self.supervisors, new_supervisors);
                self.registry = new_registry;
                for mut s in old {
                    if let Err(e) = s.stop(true) {
                        log::error!("failed to stop a superseded collector: {e}");
                    }
                }
            }
            Err(e) => log::error!("reload failed, keeping current collectors: {e}"),
        }
    }

    /// Gracefully stops every supervisor. Returns the last termination
    /// failure encountered, if any, after attempting all of them.
    pub fn stop(&mut self) -> Result<(), worker::TerminateFailure> {
        let mut last_err = None;
        for s in self.supervisors.iter_mut().rev() {
            if let Err(e) = s.stop(true) {
                log::error!("{e}");
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
