// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// Could not send a tick (or the init handshake) to a worker; the supervisor
/// logs and skips that collector for the round (spec.md §7).
#[derive(Clone, Debug)]
pub struct DispatchError(pub String);

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch failed: {}", self.0)
    }
}

impl std::error::Error for DispatchError {}

/// A worker refused to die after `max_forceful_attempts`; fatal for the
/// owning supervisor process (spec.md §7).
#[derive(Clone, Debug)]
pub struct TerminateFailure(pub String);

impl fmt::Display for TerminateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TerminateFailure {}
