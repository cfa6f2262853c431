//! Snapshot backend: one JSON document for the whole registry
//!
//! The document maps composite keys to serialized records. Saves replace
//! the document through a temp sibling, fsync and rename, so a crash
//! leaves either the previous document or the new one intact, never a
//! mix of both.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::Registry;
use crate::model::{ChildLink, EntityKind, Record};

use super::errors::{BackendError, BackendResult};
use super::StorageBackend;

/// File-backed snapshot storage.
pub struct SnapshotBackend {
    path: PathBuf,
}

impl SnapshotBackend {
    /// Backend persisting to the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse the on-disk document. A missing file is an empty document;
    /// anything else unreadable is unavailability.
    fn read_document(&self) -> BackendResult<Map<String, Value>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(BackendError::unavailable(format!(
                    "read snapshot {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let document: Value = serde_json::from_str(&text).map_err(|e| {
            BackendError::unavailable(format!("parse snapshot {}: {}", self.path.display(), e))
        })?;
        match document {
            Value::Object(map) => Ok(map),
            _ => Err(BackendError::unavailable(format!(
                "snapshot {} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    /// Replace the on-disk document atomically.
    fn write_document(&self, document: &Map<String, Value>) -> BackendResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BackendError::unavailable(format!("create {}: {}", parent.display(), e))
            })?;
        }

        let text = serde_json::to_string_pretty(document)
            .map_err(|e| BackendError::unavailable(format!("serialize snapshot: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp)
            .map_err(|e| BackendError::unavailable(format!("create {}: {}", tmp.display(), e)))?;
        file.write_all(text.as_bytes())
            .map_err(|e| BackendError::unavailable(format!("write {}: {}", tmp.display(), e)))?;
        file.sync_all()
            .map_err(|e| BackendError::unavailable(format!("sync {}: {}", tmp.display(), e)))?;

        fs::rename(&tmp, &self.path).map_err(|e| {
            BackendError::unavailable(format!(
                "rename {} to {}: {}",
                tmp.display(),
                self.path.display(),
                e
            ))
        })?;
        self.sync_parent()
    }

    /// Make the rename itself durable.
    fn sync_parent(&self) -> BackendResult<()> {
        if let Some(parent) = self.path.parent() {
            if parent.as_os_str().is_empty() {
                return Ok(());
            }
            let dir = File::open(parent).map_err(|e| {
                BackendError::unavailable(format!("open {}: {}", parent.display(), e))
            })?;
            dir.sync_all().map_err(|e| {
                BackendError::unavailable(format!("sync {}: {}", parent.display(), e))
            })?;
        }
        Ok(())
    }

    /// Every record in the on-disk document.
    fn records_on_disk(&self) -> BackendResult<Vec<Record>> {
        let document = self.read_document()?;
        let mut records = Vec::with_capacity(document.len());
        for (key, entry) in document {
            let map = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(BackendError::unavailable(format!(
                        "snapshot entry {} is not an object",
                        key
                    )))
                }
            };
            records.push(Record::from_document(map)?);
        }
        Ok(records)
    }
}

impl StorageBackend for SnapshotBackend {
    fn save(&mut self, registry: &Registry) -> BackendResult<()> {
        let mut document = Map::new();
        for (key, record) in registry.iter() {
            document.insert(key.clone(), Value::Object(record.to_document()));
        }
        self.write_document(&document)?;
        debug!(records = registry.len(), path = %self.path.display(), "snapshot written");
        Ok(())
    }

    fn reload(&mut self) -> BackendResult<Vec<Record>> {
        self.records_on_disk()
    }

    fn close(&mut self) {
        // nothing held open between operations
        debug!(path = %self.path.display(), "snapshot closed");
    }

    fn query_by_kind(&self, kind: EntityKind) -> BackendResult<Vec<Record>> {
        let mut records: Vec<Record> = self
            .records_on_disk()?
            .into_iter()
            .filter(|record| record.kind == kind)
            .collect();
        records.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(records)
    }

    fn children_of(
        &self,
        registry: &Registry,
        parent: &Record,
        link: &ChildLink,
    ) -> BackendResult<Vec<Record>> {
        let mut children: Vec<Record> = registry
            .of_kind(link.child)
            .filter(|child| {
                child.get(link.foreign_key).and_then(|value| value.as_str())
                    == Some(parent.id.as_str())
            })
            .cloned()
            .collect();
        children.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(children)
    }
}
