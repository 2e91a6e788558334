// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// Failure constructing a replacement instance: a broken/missing factory,
/// `setup()` raising, the descriptor file unreadable, or the worker
/// subprocess itself failing to spawn. Recovered by the caller with
/// back-off ([`crate::CollectorSupervisor::soft_restart`]) or propagated
/// fatally at initial start-up.
#[derive(Clone, Debug)]
pub struct RestartFailure(pub String);

impl fmt::Display for RestartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RestartFailure {}

impl From<scope::ConfigError> for RestartFailure {
    fn from(e: scope::ConfigError) -> Self {
        RestartFailure(e.to_string())
    }
}

impl From<config::ConfigError> for RestartFailure {
    fn from(e: config::ConfigError) -> Self {
        RestartFailure(e.to_string())
    }
}

impl From<worker::DispatchError> for RestartFailure {
    fn from(e: worker::DispatchError) -> Self {
        RestartFailure(e.to_string())
    }
}

impl From<RestartFailure> for scope::ConfigError {
    fn from(e: RestartFailure) -> Self {
        scope::ConfigError::new(e.to_string())
    }
}

/// Outcome of dispatching a single tick to a supervisor (spec.md §7): either
/// a recoverable dispatch failure (logged, that collector skipped this
/// round) or a termination failure that a worker refused to die, which is
/// fatal for the whole supervisor process.
#[derive(Debug)]
pub enum CollectError {
    Dispatch(worker::DispatchError),
    Fatal(worker::TerminateFailure),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Dispatch(e) => write!(f, "{e}"),
            CollectError::Fatal(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CollectError {}
