// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared, monotonic boolean: false until a sampler requests its own
/// recycling, never reset afterward. Cloning is cheap; all clones observe
/// the same underlying flag.
///
/// Every instance gets a fresh `ReloadLatch` — it is constructed anew each
/// time a [`Scope`](crate::Scope) is built for a worker instance, never
/// inherited from the parent.
#[derive(Clone)]
pub struct ReloadLatch {
    flag: Arc<AtomicBool>,
}

impl ReloadLatch {
    pub fn new() -> ReloadLatch {
        ReloadLatch {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Called by a sampler (or forwarded from a worker over IPC) to request
    /// recycling. Idempotent.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset_and_latches() {
        let latch = ReloadLatch::new();
        assert!(!latch.is_set());
        let clone = latch.clone();
        clone.set();
        assert!(latch.is_set());
    }
}
