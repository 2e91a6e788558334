// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use scope::{Capability, CellIdSource, MetricHandle, MetricSink, ReloadLatch, Scope,
            ScopedCapability, SamplerFactory, StateHandle, TagSet};

use crate::framing::{read_message, write_message};
use crate::wire::{WorkerCommand, WorkerEvent};

/// The `registry` capability as seen inside a worker process: it does not
/// allocate ids, it replays the ordered list the supervisor's validation
/// run shipped in `Init` (see `SPEC_FULL.md` §D). Metric/state writes are
/// forwarded to the supervisor over the worker's stdout.
pub struct WorkerRegistryView {
    ids: Arc<Mutex<VecDeque<u64>>>,
    out: Arc<Mutex<dyn Write + Send>>,
}

impl WorkerRegistryView {
    pub fn new(cell_ids: Vec<u64>, out: Arc<Mutex<dyn Write + Send>>) -> WorkerRegistryView {
        WorkerRegistryView {
            ids: Arc::new(Mutex::new(cell_ids.into_iter().collect())),
            out,
        }
    }

    fn next_id(&self) -> u64 {
        self.ids.lock().pop_front().unwrap_or_else(|| {
            panic!(
                "setup() allocated more cells than the supervisor's validation \
                 run shipped ids for; setup must be deterministic"
            )
        })
    }
}

impl MetricSink for WorkerRegistryView {
    fn metric(&self, _tags: TagSet) -> Box<dyn MetricHandle> {
        Box::new(ForwardingMetricHandle {
            id: self.next_id(),
            out: self.out.clone(),
        })
    }

    fn state(&self, _tags: TagSet) -> Box<dyn StateHandle> {
        Box::new(ForwardingStateHandle {
            id: self.next_id(),
            out: self.out.clone(),
        })
    }

    fn scoped(&self, _tags: TagSet) -> Arc<dyn MetricSink> {
        // Tags are irrelevant here: ids are already fixed by the supervisor's
        // validation run, so a scoped view draws from the same id queue.
        Arc::new(WorkerRegistryView {
            ids: self.ids.clone(),
            out: self.out.clone(),
        })
    }
}

impl ScopedCapability for WorkerRegistryView {}

impl CellIdSource for WorkerRegistryView {
    /// A worker's view never allocates ids of its own; it only replays ones
    /// the supervisor already shipped in `Init`.
    fn owned_ids(&self) -> Vec<u64> {
        Vec::new()
    }
}

fn send(out: &Arc<Mutex<dyn Write + Send>>, event: &WorkerEvent) {
    let mut w = out.lock();
    if let Err(e) = write_message(&mut *w, event) {
        log::error!("failed to forward event to supervisor: {e}");
    }
}

struct ForwardingMetricHandle {
    id: u64,
    out: Arc<Mutex<dyn Write + Send>>,
}

impl MetricHandle for ForwardingMetricHandle {
    fn update(&self, value: f64) {
        send(
            &self.out,
            &WorkerEvent::MetricUpdate { id: self.id, value },
        );
    }

    fn unset(&self) {
        send(
            &self.out,
            &WorkerEvent::MetricUpdate {
                id: self.id,
                value: f64::NAN,
            },
        );
    }
}

struct ForwardingStateHandle {
    id: u64,
    out: Arc<Mutex<dyn Write + Send>>,
}

impl StateHandle for ForwardingStateHandle {
    fn update(&self, ok: bool) {
        send(&self.out, &WorkerEvent::StateUpdate { id: self.id, ok });
    }
}

/// The worker subprocess' main loop (spec.md §4.3 steps 4-7). `lookup`
/// resolves a collector type name to its compiled-in `SamplerFactory`;
/// callers pass in the built-in collector table so this crate stays
/// decoupled from any particular collector set.
pub fn run_worker_main(lookup: impl Fn(&str) -> Option<SamplerFactory>) -> i32 {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let out: Arc<Mutex<dyn Write + Send>> = Arc::new(Mutex::new(io::stdout()));

    let (type_name, config_yaml, cell_ids) = match read_message::<_, WorkerCommand>(&mut input) {
        Ok(Some(WorkerCommand::Init {
            type_name,
            config_yaml,
            cell_ids,
        })) => (type_name, config_yaml, cell_ids),
        Ok(_) => {
            log::error!("worker: expected Init as the first message");
            return 1;
        }
        Err(e) => {
            log::error!("worker: failed to read Init: {e}");
            return 1;
        }
    };

    let factory = match lookup(&type_name) {
        Some(f) => f,
        None => {
            send(
                &out,
                &WorkerEvent::Fatal {
                    message: format!("unknown collector type '{type_name}'"),
                },
            );
            return 1;
        }
    };

    let config_value: serde_yaml::Value = match serde_yaml::from_str(&config_yaml) {
        Ok(v) => v,
        Err(e) => {
            send(
                &out,
                &WorkerEvent::Fatal {
                    message: format!("invalid config: {e}"),
                },
            );
            return 1;
        }
    };

    let registry_view = WorkerRegistryView::new(cell_ids, out.clone());
    let reload = ReloadLatch::new();

    let mut bindings = HashMap::new();
    bindings.insert(
        Capability::PLATFORM,
        Capability::Platform(Arc::new(platform::Platform::probe())),
    );
    bindings.insert(
        Capability::REGISTRY,
        Capability::Registry(Arc::new(registry_view)),
    );
    bindings.insert(
        Capability::CONFIG,
        Capability::Config(Arc::new(config::CollectorConfig::new(config_value))),
    );
    bindings.insert(Capability::RELOAD, Capability::Reload(reload.clone()));
    let root = Scope::root(bindings);

    let mut sampler = match factory(&root) {
        Ok(s) => s,
        Err(e) => {
            send(
                &out,
                &WorkerEvent::Fatal {
                    message: e.to_string(),
                },
            );
            return 1;
        }
    };

    if let Err(e) = sampler.start() {
        send(
            &out,
            &WorkerEvent::Fatal {
                message: e.to_string(),
            },
        );
        return 1;
    }

    send(&out, &WorkerEvent::Ready);

    let mut reload_reported = false;
    loop {
        match read_message::<_, WorkerCommand>(&mut input) {
            Ok(Some(WorkerCommand::Tick(tick))) => {
                let ok = match sampler.sample() {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("collector failed to sample: {e}");
                        false
                    }
                };
                send(&out, &WorkerEvent::Done { tick, ok });

                if !reload_reported && reload.is_set() {
                    send(&out, &WorkerEvent::ReloadRequested);
                    reload_reported = true;
                }
            }
            Ok(Some(WorkerCommand::Shutdown)) | Ok(None) => break,
            Ok(Some(WorkerCommand::Init { .. })) => {
                log::error!("worker: unexpected duplicate Init");
                break;
            }
            Err(e) => {
                log::error!("worker: control channel read failed: {e}");
                break;
            }
        }
    }

    let _ = sampler.stop();
    0
}
