// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Process signal wiring (spec.md §6): SIGHUP requests a reload at the next
//! loop boundary, SIGTERM requests a graceful stop. Handlers only touch
//! `AtomicBool`s, which is the one thing safe to do from a signal handler;
//! `Core::run_once`'s own wait loop is interrupted via `Core::signal`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{self, SigHandler, Signal};

static RELOAD_REQUESTED: AtomicBool = AtomicBool::new(false);
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sighup(_: libc::c_int) {
    RELOAD_REQUESTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_sigterm(_: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs the handlers. Must be called once before the main loop starts;
/// the `signalled` handle is woken on every delivery so a blocked
/// `run_once` notices the request without waiting out its full sleep.
pub fn install(signalled: Arc<AtomicBool>) {
    unsafe {
        signal::signal(Signal::SIGHUP, SigHandler::Handler(on_sighup))
            .expect("installing SIGHUP handler must succeed");
        signal::signal(Signal::SIGTERM, SigHandler::Handler(on_sigterm))
            .expect("installing SIGTERM handler must succeed");
    }
    // `signalled` itself can't be touched from the handlers above (no
    // capturing closures in an `extern "C" fn"), so a watcher thread bridges
    // the two flags into it.
    std::thread::spawn(move || loop {
        if RELOAD_REQUESTED.load(Ordering::SeqCst) || STOP_REQUESTED.load(Ordering::SeqCst) {
            signalled.store(true, Ordering::SeqCst);
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    });
}

pub fn take_reload_requested() -> bool {
    RELOAD_REQUESTED.swap(false, Ordering::SeqCst)
}

pub fn take_stop_requested() -> bool {
    STOP_REQUESTED.swap(false, Ordering::SeqCst)
}
