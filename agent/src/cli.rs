// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::path::PathBuf;

use clap::Parser;

/// Host telemetry agent: runs collectors as worker subprocesses under a
/// recycling supervisor (spec.md §1, §6).
#[derive(Parser, Debug)]
#[command(name = "agent", version)]
pub struct Opt {
    /// Path to the YAML configuration document.
    #[arg(long)]
    pub config: PathBuf,

    /// Directory holding `<type>.collector` descriptor files. May be given
    /// more than once; the first directory containing a matching descriptor
    /// wins.
    #[arg(long = "collector-dir", required = true)]
    pub collector_dirs: Vec<PathBuf>,

    /// Seconds to wait for a round's workers to report back before treating
    /// the stragglers as dead.
    #[arg(long, default_value_t = 10.0)]
    pub timeout: f64,

    /// Seconds between the start of one round and the next.
    #[arg(long, default_value_t = 60.0)]
    pub interval: f64,

    /// Seconds to sleep before the next round when a round itself overran
    /// the interval.
    #[arg(long, default_value_t = 5.0)]
    pub backoff: f64,
}
