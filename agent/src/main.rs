// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

mod cli;
mod signals;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

fn main() {
    // A worker subprocess is a re-exec of this same binary (`SPEC_FULL.md`
    // §D); dispatch to the worker entry point before anything else touches
    // argv or installs signal handlers meant for the supervisor process.
    if std::env::var(worker::WORKER_MODE_ENV).is_ok() {
        let code = worker::run_worker_main(collectors::lookup);
        std::process::exit(code);
    }

    env_logger::builder()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();

    let opt = cli::Opt::parse();

    let exe = std::env::current_exe().unwrap_or_else(|e| {
        log::error!("could not resolve the running executable's path: {e}");
        std::process::exit(2);
    });

    let params = supervisor::CoreParams {
        config_path: opt.config,
        collector_dirs: opt.collector_dirs,
        exe,
        lookup: Arc::new(collectors::lookup),
        timeout: Duration::from_secs_f64(opt.timeout),
        interval: Duration::from_secs_f64(opt.interval),
        backoff: Duration::from_secs_f64(opt.backoff),
    };

    let mut core = match supervisor::Core::new(params) {
        Ok(core) => core,
        Err(e) => {
            log::error!("fatal at start-up: {e}");
            std::process::exit(2);
        }
    };

    signals::install(core.signalled_handle());

    loop {
        if let Err(e) = core.run_once() {
            log::error!("unrecoverable supervisor error: {e}");
            std::process::exit(3);
        }

        if signals::take_stop_requested() {
            log::info!("SIGTERM received, stopping");
            if let Err(e) = core.stop() {
                log::error!("fatal during stop: {e}");
                std::process::exit(4);
            }
            std::process::exit(0);
        }

        if signals::take_reload_requested() {
            log::info!("SIGHUP received, reloading");
            core.reload();
        }
    }
}
