// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{ChildStdin, Command, Stdio};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::{getpgid, Pid};

use scope::{CellSink, ReloadLatch};

use crate::errors::{DispatchError, TerminateFailure};
use crate::framing::{read_message, write_message};
use crate::wire::{WorkerCommand, WorkerEvent};

/// Set in the environment of a re-exec'd worker subprocess so its `main`
/// dispatches to `worker::run_worker_main` instead of the supervisor's CLI.
pub const WORKER_MODE_ENV: &str = "COLLECTOR_WORKER_MODE";

/// A running worker subprocess, from the supervisor's side: the pair of
/// framed pipes plus the OS process itself (spec.md §4.3).
pub struct Worker {
    child: std::process::Child,
    stdin: ChildStdin,
    reader: Option<thread::JoinHandle<()>>,
    pgid: Pid,
}

impl Worker {
    /// Spawns `exe` in worker mode, in its own process group, and performs
    /// the `Init` handshake (spec.md §4.3 steps 3-4). `results` receives
    /// `(tick, ok)` pairs for the shared, per-round result queue; `cells`
    /// receives forwarded metric/state writes; `reload` is set when the
    /// sampler requests its own recycling.
    pub fn spawn(
        exe: &Path,
        type_name: &str,
        config_yaml: String,
        cell_ids: Vec<u64>,
        results: Sender<(u64, bool)>,
        cells: Arc<dyn CellSink>,
        reload: ReloadLatch,
    ) -> Result<Worker, DispatchError> {
        let mut command = Command::new(exe);
        command.env(WORKER_MODE_ENV, "1");
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::inherit());

        // New process group, so termination can signal the whole subtree.
        unsafe {
            command.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            });
        }

        let mut child = command
            .spawn()
            .map_err(|e| DispatchError(format!("spawn failed: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .expect("worker spawned with piped stdin");
        let stdout = child
            .stdout
            .take()
            .expect("worker spawned with piped stdout");

        write_message(
            &mut stdin,
            &WorkerCommand::Init {
                type_name: type_name.to_string(),
                config_yaml,
                cell_ids,
            },
        )
        .map_err(|e| DispatchError(format!("init handshake failed: {e}")))?;

        let pid = Pid::from_raw(child.id() as i32);
        let pgid =
            getpgid(Some(pid)).map_err(|e| DispatchError(format!("no process group: {e}")))?;

        let reader = thread::spawn(move || {
            let mut stdout = stdout;
            loop {
                match read_message::<_, WorkerEvent>(&mut stdout) {
                    Ok(Some(WorkerEvent::Ready)) => {}
                    Ok(Some(WorkerEvent::Done { tick, ok })) => {
                        let _ = results.send((tick, ok));
                    }
                    Ok(Some(WorkerEvent::MetricUpdate { id, value })) => {
                        cells.set_metric(id, value)
                    }
                    Ok(Some(WorkerEvent::StateUpdate { id, ok })) => cells.set_state(id, ok),
                    Ok(Some(WorkerEvent::ReloadRequested)) => reload.set(),
                    Ok(Some(WorkerEvent::Fatal { message })) => {
                        log::error!("worker reported a fatal error: {message}");
                    }
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("worker event stream failed: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Worker {
            child,
            stdin,
            reader: Some(reader),
            pgid,
        })
    }

    /// Non-blocking liveness check.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn send_tick(&mut self, tick: u64) -> Result<(), DispatchError> {
        write_message(&mut self.stdin, &WorkerCommand::Tick(tick))
            .map_err(|e| DispatchError(e.to_string()))
    }

    /// Termination protocol from spec.md §4.4: optionally try the graceful
    /// sentinel first, then up to `max_forceful_attempts` signal-and-wait
    /// rounds, then give up.
    pub fn terminate(
        mut self,
        graceful: bool,
        cfg: &config::InstanceConfig,
    ) -> Result<(), TerminateFailure> {
        if graceful {
            let _ = write_message(&mut self.stdin, &WorkerCommand::Shutdown);
            if self.wait_for_exit(Duration::from_secs_f64(cfg.graceful_timeout)) {
                self.join_reader();
                return Ok(());
            }
        }

        for attempt in 1..=cfg.max_forceful_attempts {
            log::warn!(
                "worker pid {:?}: terminate attempt {attempt} of {}",
                self.child.id(),
                cfg.max_forceful_attempts
            );
            let _ = self.signal_pgid(Signal::SIGKILL);
            if self.wait_for_exit(Duration::from_secs_f64(cfg.forceful_timeout)) {
                self.join_reader();
                return Ok(());
            }
        }

        Err(TerminateFailure(format!(
            "worker pid {:?} could not be terminated after {} attempts",
            self.child.id(),
            cfg.max_forceful_attempts
        )))
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if matches!(self.child.try_wait(), Ok(Some(_))) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(25));
        }
    }

    fn signal_pgid(&self, sig: Signal) -> nix::Result<()> {
        signal::kill(Pid::from_raw(-self.pgid.as_raw()), sig)
    }

    fn join_reader(&mut self) {
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}
