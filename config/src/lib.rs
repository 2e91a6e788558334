// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Parses the agent's YAML configuration document and resolves collector
//! descriptor files (spec.md §6, `SPEC_FULL.md` §C).

mod descriptor;
mod document;
mod error;
mod view;

pub use descriptor::{descriptor_path, merge_metadata, CollectorDescriptor, Fingerprint};
pub use document::{CollectorEntry, Document, InstanceConfig};
pub use error::{ConfigError, Path};
pub use view::CollectorConfig;
