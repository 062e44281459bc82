use crate::classify::RdfValue;
use std::collections::HashSet;

/// Canonical keys of the values already materialized as store nodes during the
/// current import run.
///
/// Owned by the [`crate::importer::Importer`] and cleared at the start of every
/// file import, so it never carries knowledge across runs. The key is the
/// escaped value alone, so an IRI and a literal spelled the same share an entry.
#[derive(Debug, Default)]
pub struct DedupCache {
    keys: HashSet<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, value: &RdfValue) -> bool {
        self.keys.contains(value.key())
    }

    /// Records `value`; returns false if its key was already present.
    pub fn add(&mut self, value: &RdfValue) -> bool {
        self.keys.insert(value.key().to_string())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
