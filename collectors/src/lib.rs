// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The built-in collector table: one `scope::SamplerFactory` per Linux
//! `/proc`-backed collector type, translated from this system's original
//! Python collectors. Decoupled from any particular `Registry`/`Platform`
//! implementation — it only ever touches the `scope` capability traits.

mod cpu;
mod disk;
mod iostat;
mod loadavg;

/// Resolves a `[type].collector`'s `factory` name to a compiled-in sampler
/// constructor. Returns `None` for any name this binary does not carry a
/// built-in for.
pub fn lookup(name: &str) -> Option<scope::SamplerFactory> {
    match name {
        "cpu" => Some(cpu::setup as scope::SamplerFactory),
        "disk" => Some(disk::setup as scope::SamplerFactory),
        "iostat" => Some(iostat::setup as scope::SamplerFactory),
        "loadavg" => Some(loadavg::setup as scope::SamplerFactory),
        _ => None,
    }
}
