// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::BTreeMap;
use std::fmt;

/// An immutable (after construction) mapping from label name to label value,
/// carried by every metric and state cell.
///
/// Backed by a `BTreeMap` so that [`Registry::snapshot`](../registry/struct.Registry.html#method.snapshot)
/// enumerates cells in a deterministic order.
#[derive(Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> TagSet {
        TagSet(BTreeMap::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> TagSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        TagSet(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Composes `self` as the base and `overrides` as the per-cell tags:
    /// overlapping keys take the value from `overrides`.
    pub fn compose(&self, overrides: &TagSet) -> TagSet {
        let mut merged = self.0.clone();
        for (k, v) in &overrides.0 {
            merged.insert(k.clone(), v.clone());
        }
        TagSet(merged)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_override_wins() {
        let base = TagSet::from_pairs([("a", "1"), ("b", "2")]);
        let local = TagSet::from_pairs([("a", "9")]);
        let composed = base.compose(&local);
        assert_eq!(composed.get("a"), Some("9"));
        assert_eq!(composed.get("b"), Some("2"));
    }
}
