//! Durable storage variants behind the engine
//!
//! # Design Principles
//!
//! - One trait, two variants: a JSON snapshot document and embedded SQLite
//! - The variant is selected once at startup; call sites never branch on it
//! - Missing durable state reads back as empty state, not an error
//! - Relationship resolution lives here, so each variant answers with its
//!   own mechanism (registry scan vs. SQL)

mod errors;
mod relational;
mod snapshot;
mod sql;

pub use errors::{BackendError, BackendResult};
pub use relational::RelationalBackend;
pub use snapshot::SnapshotBackend;

use crate::config::{StorageKind, StoreConfig};
use crate::engine::Registry;
use crate::model::{ChildLink, EntityKind, Record};

/// Capability set every durable backend provides.
pub trait StorageBackend {
    /// Durably write every registered record.
    fn save(&mut self, registry: &Registry) -> BackendResult<()>;

    /// Read durable state back as records. Missing durable state is
    /// success with no records.
    fn reload(&mut self) -> BackendResult<Vec<Record>>;

    /// Release backend resources ahead of a resynchronization.
    fn close(&mut self);

    /// Records of one kind straight from durable state, ordered by
    /// `(created_at, id)`.
    fn query_by_kind(&self, kind: EntityKind) -> BackendResult<Vec<Record>>;

    /// Records of `link.child` whose foreign key names `parent`, ordered
    /// by `(created_at, id)`.
    fn children_of(
        &self,
        registry: &Registry,
        parent: &Record,
        link: &ChildLink,
    ) -> BackendResult<Vec<Record>>;
}

/// Open the backend `config` selects.
pub fn open(config: &StoreConfig) -> BackendResult<Box<dyn StorageBackend>> {
    match config.storage {
        StorageKind::Snapshot => Ok(Box::new(SnapshotBackend::new(config.snapshot_path()))),
        StorageKind::Relational => Ok(Box::new(RelationalBackend::open(config)?)),
    }
}
