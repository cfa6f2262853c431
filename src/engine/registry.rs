//! In-memory registry keyed by composite key

use std::collections::BTreeMap;

use crate::model::{EntityKind, Record};

/// Ordered map of live records keyed by `<Kind>.<id>`.
///
/// The composite key namespaces identifiers per kind, so two records of
/// different kinds may share an identifier without colliding.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, Record>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite key for a kind/identifier pair
    pub fn composite_key(kind: EntityKind, id: &str) -> String {
        format!("{}.{}", kind.as_str(), id)
    }

    /// Composite key under which `record` registers
    pub fn key_of(record: &Record) -> String {
        Self::composite_key(record.kind, &record.id)
    }

    /// Insert (or overwrite) a record under its composite key, returning
    /// any displaced record.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.entries.insert(Self::key_of(&record), record)
    }

    /// Remove the record registered for a kind/identifier pair.
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> Option<Record> {
        self.entries.remove(&Self::composite_key(kind, id))
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Record> {
        self.entries.get(&Self::composite_key(kind, id))
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.entries.contains_key(&Self::composite_key(kind, id))
    }

    /// All entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.entries.iter()
    }

    /// All records in key order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.entries.values()
    }

    /// Records of one kind, in key order
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Record> {
        self.entries.values().filter(move |record| record.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Cloned view of the whole registry
    pub fn to_map(&self) -> BTreeMap<String, Record> {
        self.entries.clone()
    }

    /// Cloned view of one kind's entries
    pub fn map_of_kind(&self, kind: EntityKind) -> BTreeMap<String, Record> {
        self.entries
            .iter()
            .filter(|(_, record)| record.kind == kind)
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }
}

/// Filter accepted by [`crate::engine::StorageEngine::all_of`]: either a
/// typed kind or a raw tag resolved against the closed kind registry.
#[derive(Debug, Clone)]
pub enum KindFilter {
    Kind(EntityKind),
    Tag(String),
}

impl KindFilter {
    /// Resolve to a known kind. Unknown tags yield `None`.
    pub fn resolve(&self) -> Option<EntityKind> {
        match self {
            KindFilter::Kind(kind) => Some(*kind),
            KindFilter::Tag(tag) => EntityKind::from_tag(tag),
        }
    }
}

impl From<EntityKind> for KindFilter {
    fn from(kind: EntityKind) -> Self {
        KindFilter::Kind(kind)
    }
}

impl From<&str> for KindFilter {
    fn from(tag: &str) -> Self {
        KindFilter::Tag(tag.to_string())
    }
}

impl From<String> for KindFilter {
    fn from(tag: String) -> Self {
        KindFilter::Tag(tag)
    }
}
