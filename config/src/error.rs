// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// One segment of a [`ConfigError`]'s locator: a map key or a list index.
#[derive(Clone, Debug)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A JSON-path-style locator built up as parsing descends into the
/// document, e.g. `collectors[2].type`.
#[derive(Clone, Debug, Default)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn key(&self, name: impl Into<String>) -> Path {
        let mut p = self.0.clone();
        p.push(Segment::Key(name.into()));
        Path(p)
    }

    pub fn index(&self, i: usize) -> Path {
        let mut p = self.0.clone();
        p.push(Segment::Index(i));
        Path(p)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Key(k) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{k}")?;
                }
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

/// Malformed configuration: wrong type at a locator, an unknown key, or an
/// I/O or YAML-syntax failure reading the document itself.
#[derive(Clone, Debug)]
pub struct ConfigError {
    path: Option<Path>,
    message: String,
}

impl ConfigError {
    pub fn at(path: Path, message: impl Into<String>) -> ConfigError {
        ConfigError {
            path: Some(path),
            message: message.into(),
        }
    }

    pub fn new(message: impl Into<String>) -> ConfigError {
        ConfigError {
            path: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{path}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for scope::ConfigError {
    fn from(e: ConfigError) -> Self {
        scope::ConfigError::new(e.to_string())
    }
}
