//! Storage engine: the registry plus a durable backend

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::backend::{self, BackendResult, StorageBackend};
use crate::config::StoreConfig;
use crate::model::{EntityKind, Record};

use super::registry::{KindFilter, Registry};

/// Object store: every live record, mirrored to a durable backend on
/// flush.
///
/// Single-threaded by construction: every mutating operation takes
/// `&mut self`, so callers wanting concurrency wrap the engine in their
/// own lock.
pub struct StorageEngine {
    registry: Registry,
    backend: Box<dyn StorageBackend>,
}

impl StorageEngine {
    /// Engine over an explicit backend, starting empty.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            registry: Registry::new(),
            backend,
        }
    }

    /// Engine over the backend `config` selects, loaded from durable
    /// state.
    pub fn open(config: &StoreConfig) -> BackendResult<Self> {
        let mut engine = Self::new(backend::open(config)?);
        engine.restore()?;
        Ok(engine)
    }

    /// Every registered record, keyed by composite key.
    pub fn all(&self) -> BTreeMap<String, Record> {
        self.registry.to_map()
    }

    /// Registered records of one kind; accepts a typed kind or a raw
    /// tag. Unknown tags yield an empty map.
    pub fn all_of(&self, filter: impl Into<KindFilter>) -> BTreeMap<String, Record> {
        match filter.into().resolve() {
            Some(kind) => self.registry.map_of_kind(kind),
            None => BTreeMap::new(),
        }
    }

    /// Register (or overwrite) a record under its composite key.
    pub fn register(&mut self, record: &Record) {
        debug!(key = %Registry::key_of(record), "register");
        self.registry.insert(record.clone());
    }

    /// Write every registered record to the durable backend.
    pub fn flush(&mut self) -> BackendResult<()> {
        self.backend.save(&self.registry)?;
        info!(records = self.registry.len(), "flushed");
        Ok(())
    }

    /// Re-register every record found in durable state.
    ///
    /// Additive: existing registrations stay, loaded entries overwrite
    /// same-key ones. Missing durable state restores nothing.
    pub fn restore(&mut self) -> BackendResult<()> {
        let records = self.backend.reload()?;
        let count = records.len();
        for record in records {
            self.registry.insert(record);
        }
        info!(records = count, "restored");
        Ok(())
    }

    /// Drop a record from the registry. Unregistered records are a
    /// no-op; the durable layer keeps its copy until the next flush.
    pub fn discard(&mut self, record: &Record) {
        if self.registry.remove(record.kind, &record.id).is_some() {
            debug!(key = %Registry::key_of(record), "discard");
        }
    }

    /// Resynchronize with durable state: close the backend, clear the
    /// registry, reload. Records that vanished externally are dropped.
    pub fn reconnect(&mut self) -> BackendResult<()> {
        self.backend.close();
        self.registry.clear();
        self.restore()
    }

    /// Children of `parent` of kind `child`, resolved by the backend and
    /// ordered by `(created_at, id)`. Kind pairs with no declared link
    /// yield an empty list.
    pub fn children_of(&self, parent: &Record, child: EntityKind) -> BackendResult<Vec<Record>> {
        match parent.kind.child_link(child) {
            Some(link) => self.backend.children_of(&self.registry, parent, link),
            None => Ok(Vec::new()),
        }
    }

    /// Records of one kind read straight from durable state.
    pub fn query_by_kind(&self, kind: EntityKind) -> BackendResult<Vec<Record>> {
        self.backend.query_by_kind(kind)
    }

    /// Registered record for a kind/identifier pair, if any.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Record> {
        self.registry.get(kind, id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SnapshotBackend;
    use tempfile::TempDir;

    fn snapshot_engine(dir: &TempDir) -> StorageEngine {
        StorageEngine::new(Box::new(SnapshotBackend::new(
            dir.path().join("objects.json"),
        )))
    }

    fn named(kind: EntityKind, name: &str) -> Record {
        let mut record = Record::new(kind);
        record.set("name", name);
        record
    }

    #[test]
    fn test_register_and_all() {
        let dir = TempDir::new().unwrap();
        let mut engine = snapshot_engine(&dir);

        let city = named(EntityKind::City, "Paris");
        engine.register(&city);

        let all = engine.all();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&format!("City.{}", city.id)));
    }

    #[test]
    fn test_all_of_accepts_kind_and_tag() {
        let dir = TempDir::new().unwrap();
        let mut engine = snapshot_engine(&dir);
        engine.register(&named(EntityKind::City, "Paris"));
        engine.register(&named(EntityKind::State, "Nevada"));

        assert_eq!(engine.all_of(EntityKind::City).len(), 1);
        assert_eq!(engine.all_of("City").len(), 1);
        assert_eq!(engine.all_of("State").len(), 1);
    }

    #[test]
    fn test_unknown_tag_yields_empty() {
        let dir = TempDir::new().unwrap();
        let mut engine = snapshot_engine(&dir);
        engine.register(&named(EntityKind::City, "Paris"));

        assert!(engine.all_of("Dragon").is_empty());
    }

    #[test]
    fn test_flush_restore_roundtrip() {
        let dir = TempDir::new().unwrap();
        let city = named(EntityKind::City, "Paris");

        let mut writer = snapshot_engine(&dir);
        writer.register(&city);
        writer.flush().unwrap();

        let mut reader = snapshot_engine(&dir);
        reader.restore().unwrap();

        let held = reader.get(EntityKind::City, &city.id).unwrap();
        assert_eq!(held, &city);
    }

    #[test]
    fn test_restore_is_additive() {
        let dir = TempDir::new().unwrap();
        let persisted = named(EntityKind::State, "Nevada");

        let mut writer = snapshot_engine(&dir);
        writer.register(&persisted);
        writer.flush().unwrap();

        let mut engine = snapshot_engine(&dir);
        let live = named(EntityKind::City, "Paris");
        engine.register(&live);
        engine.restore().unwrap();

        assert_eq!(engine.len(), 2);
        assert!(engine.get(EntityKind::City, &live.id).is_some());
        assert!(engine.get(EntityKind::State, &persisted.id).is_some());
    }

    #[test]
    fn test_discard_unregistered_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut engine = snapshot_engine(&dir);
        engine.register(&named(EntityKind::City, "Paris"));

        engine.discard(&named(EntityKind::City, "Ghost"));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_reconnect_drops_vanished_records() {
        let dir = TempDir::new().unwrap();
        let kept = named(EntityKind::City, "Paris");
        let dropped = named(EntityKind::City, "Atlantis");

        let mut writer = snapshot_engine(&dir);
        writer.register(&kept);
        writer.register(&dropped);
        writer.flush().unwrap();

        let mut reader = snapshot_engine(&dir);
        reader.restore().unwrap();
        assert_eq!(reader.len(), 2);

        // another engine rewrites durable state without one record
        writer.discard(&dropped);
        writer.flush().unwrap();

        reader.reconnect().unwrap();
        assert_eq!(reader.len(), 1);
        assert!(reader.get(EntityKind::City, &dropped.id).is_none());
    }

    #[test]
    fn test_children_without_link_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut engine = snapshot_engine(&dir);
        let city = named(EntityKind::City, "Paris");
        engine.register(&city);

        // City declares no User children
        let children = engine.children_of(&city, EntityKind::User).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn test_record_persist_convenience() {
        let dir = TempDir::new().unwrap();
        let mut engine = snapshot_engine(&dir);

        let mut city = named(EntityKind::City, "Paris");
        let before = city.updated_at;
        city.persist(&mut engine).unwrap();

        assert!(city.updated_at >= before);
        assert!(engine.get(EntityKind::City, &city.id).is_some());

        let mut reader = snapshot_engine(&dir);
        reader.restore().unwrap();
        assert_eq!(reader.len(), 1);
    }
}
