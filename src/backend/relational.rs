//! Relational backend over embedded SQLite
//!
//! One table per entity kind, columns from the declarative kind schema,
//! foreign keys cascading on delete. Saving writes the whole registry in
//! a single transaction: rows absent from the registry are deleted, and
//! everything else is upserted parent-first. Off-schema attributes have
//! no column, so they live only in the registry (and in the snapshot
//! variant).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, warn};

use crate::config::{EnvMode, StoreConfig};
use crate::engine::Registry;
use crate::model::{
    format_timestamp, parse_timestamp, AttrValue, ChildLink, EntityKind, Record, RecordResult,
};

use super::errors::{BackendError, BackendResult};
use super::sql;
use super::StorageBackend;

/// SQLite-backed durable storage, one table per entity kind.
pub struct RelationalBackend {
    conn: Connection,
}

impl RelationalBackend {
    /// Open (creating if needed) the database file `config` names.
    ///
    /// In the `Test` environment every table is dropped and recreated,
    /// so each run starts from a clean database.
    pub fn open(config: &StoreConfig) -> BackendResult<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|e| {
            BackendError::unavailable(format!("create {}: {}", config.data_dir.display(), e))
        })?;
        let conn = Connection::open(config.database_path()).map_err(|e| {
            BackendError::unavailable(format!(
                "open database {}: {}",
                config.database_path().display(),
                e
            ))
        })?;
        Self::prepare(conn, config.environment)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> BackendResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BackendError::unavailable(format!("open in-memory database: {}", e)))?;
        Self::prepare(conn, EnvMode::Development)
    }

    fn prepare(conn: Connection, environment: EnvMode) -> BackendResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| BackendError::unavailable(format!("enable foreign keys: {}", e)))?;
        let backend = Self { conn };
        if environment == EnvMode::Test {
            backend.drop_tables()?;
        }
        backend.create_tables()?;
        Ok(backend)
    }

    fn create_tables(&self) -> BackendResult<()> {
        for kind in EntityKind::all() {
            self.conn.execute(&sql::create_table(*kind), []).map_err(|e| {
                BackendError::unavailable(format!("create table {}: {}", kind.table(), e))
            })?;
        }
        Ok(())
    }

    fn drop_tables(&self) -> BackendResult<()> {
        // children first so no drop ever leaves a dangling reference
        for kind in EntityKind::all().iter().rev() {
            self.conn.execute(&sql::drop_table(*kind), []).map_err(|e| {
                BackendError::unavailable(format!("drop table {}: {}", kind.table(), e))
            })?;
        }
        Ok(())
    }

    /// Rows present in the database but absent from the registry. Save
    /// deletes these; the cascade then removes their dependent rows.
    fn rows_absent_from(&self, registry: &Registry) -> BackendResult<Vec<(EntityKind, String)>> {
        let mut absent = Vec::new();
        for kind in EntityKind::all() {
            let mut stmt = self.conn.prepare(&sql::select_ids(*kind)).map_err(|e| {
                BackendError::unavailable(format!("list {} ids: {}", kind.table(), e))
            })?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| {
                    BackendError::unavailable(format!("list {} ids: {}", kind.table(), e))
                })?;
            for id in ids {
                let id = id.map_err(|e| {
                    BackendError::unavailable(format!("read {} id: {}", kind.table(), e))
                })?;
                if !registry.contains(*kind, &id) {
                    absent.push((*kind, id));
                }
            }
        }
        Ok(absent)
    }

    fn load_kind(&self, kind: EntityKind) -> BackendResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&sql::select_all(kind)).map_err(|e| {
            BackendError::unavailable(format!("query {}: {}", kind.table(), e))
        })?;
        let rows = stmt.query_map([], |row| raw_row(kind, row)).map_err(|e| {
            BackendError::unavailable(format!("query {}: {}", kind.table(), e))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| {
                BackendError::unavailable(format!("read {} row: {}", kind.table(), e))
            })?;
            records.push(raw.into_record(kind)?);
        }
        Ok(records)
    }
}

impl StorageBackend for RelationalBackend {
    fn save(&mut self, registry: &Registry) -> BackendResult<()> {
        let absent = self.rows_absent_from(registry)?;
        let victims = cascade_victims(registry, &absent);

        let tx = self
            .conn
            .transaction()
            .map_err(|e| BackendError::unavailable(format!("begin transaction: {}", e)))?;

        for (kind, id) in &absent {
            tx.execute(&sql::delete(*kind), params![id]).map_err(|e| {
                BackendError::unavailable(format!("delete from {}: {}", kind.table(), e))
            })?;
        }

        for kind in EntityKind::all() {
            let upsert = sql::upsert(*kind);
            let mut stmt = tx.prepare(&upsert).map_err(|e| {
                BackendError::unavailable(format!("prepare upsert for {}: {}", kind.table(), e))
            })?;
            for record in registry.of_kind(*kind) {
                if victims.contains(&Registry::key_of(record)) {
                    continue;
                }
                stmt.execute(params_from_iter(row_values(record)))
                    .map_err(|e| {
                        BackendError::unavailable(format!("write {}: {}", kind.table(), e))
                    })?;
            }
        }

        tx.commit()
            .map_err(|e| BackendError::unavailable(format!("commit: {}", e)))?;

        if !victims.is_empty() {
            warn!(
                skipped = victims.len(),
                "flush skipped records whose parent rows were deleted"
            );
        }
        debug!(records = registry.len(), "database written");
        Ok(())
    }

    fn reload(&mut self) -> BackendResult<Vec<Record>> {
        let mut records = Vec::new();
        for kind in EntityKind::all() {
            records.extend(self.load_kind(*kind)?);
        }
        Ok(records)
    }

    fn close(&mut self) {
        // the connection itself closes on drop
        debug!("database session closed");
    }

    fn query_by_kind(&self, kind: EntityKind) -> BackendResult<Vec<Record>> {
        self.load_kind(kind)
    }

    fn children_of(
        &self,
        _registry: &Registry,
        parent: &Record,
        link: &ChildLink,
    ) -> BackendResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&sql::select_children(link)).map_err(|e| {
            BackendError::unavailable(format!("query {}: {}", link.child.table(), e))
        })?;
        let rows = stmt
            .query_map(params![parent.id], |row| raw_row(link.child, row))
            .map_err(|e| {
                BackendError::unavailable(format!("query {}: {}", link.child.table(), e))
            })?;

        let mut children = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| {
                BackendError::unavailable(format!("read {} row: {}", link.child.table(), e))
            })?;
            children.push(raw.into_record(link.child)?);
        }
        Ok(children)
    }
}

/// Registry entries doomed by the rows about to be deleted: the cascade
/// removes their durable rows, so upserting them would either violate a
/// foreign key or resurrect data the caller just discarded.
fn cascade_victims(registry: &Registry, absent: &[(EntityKind, String)]) -> BTreeSet<String> {
    let mut victims = BTreeSet::new();
    let mut frontier: Vec<(EntityKind, String)> = absent.to_vec();
    while let Some((kind, id)) = frontier.pop() {
        for link in kind.children() {
            for child in registry.of_kind(link.child) {
                let points_here = child
                    .get(link.foreign_key)
                    .and_then(|value| value.as_str())
                    == Some(id.as_str());
                if points_here && victims.insert(Registry::key_of(child)) {
                    frontier.push((link.child, child.id.clone()));
                }
            }
        }
    }
    victims
}

/// Parameter values for one upsert, in column order. Undeclared and
/// unset attributes become NULL.
fn row_values(record: &Record) -> Vec<SqlValue> {
    let mut values = vec![
        SqlValue::Text(record.id.clone()),
        SqlValue::Text(format_timestamp(record.created_at)),
        SqlValue::Text(format_timestamp(record.updated_at)),
    ];
    for field in record.kind.fields() {
        values.push(match record.get(field.name) {
            Some(attr) => sql_value(attr),
            None => SqlValue::Null,
        });
    }
    values
}

/// Booleans store as INTEGER 0/1; SQLite has no boolean affinity, so
/// they reload as integers. No declared field is boolean.
fn sql_value(attr: &AttrValue) -> SqlValue {
    match attr {
        AttrValue::Str(s) => SqlValue::Text(s.clone()),
        AttrValue::Int(i) => SqlValue::Integer(*i),
        AttrValue::Float(f) => SqlValue::Real(*f),
        AttrValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
    }
}

fn attr_from_sql(value: SqlValue) -> Option<AttrValue> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(i) => Some(AttrValue::Int(i)),
        SqlValue::Real(f) => Some(AttrValue::Float(f)),
        SqlValue::Text(s) => Some(AttrValue::Str(s)),
        SqlValue::Blob(_) => None,
    }
}

/// One row read raw, before timestamps are parsed. Keeps SQL failures
/// and reconstruction failures in their own error variants.
struct RawRow {
    id: String,
    created_at: String,
    updated_at: String,
    attrs: Vec<(&'static str, SqlValue)>,
}

fn raw_row(kind: EntityKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    let mut attrs = Vec::with_capacity(kind.fields().len());
    for (i, field) in kind.fields().iter().enumerate() {
        attrs.push((field.name, row.get::<_, SqlValue>(3 + i)?));
    }
    Ok(RawRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        attrs,
    })
}

impl RawRow {
    fn into_record(self, kind: EntityKind) -> RecordResult<Record> {
        let mut attributes = BTreeMap::new();
        for (name, value) in self.attrs {
            if let Some(attr) = attr_from_sql(value) {
                attributes.insert(name.to_string(), attr);
            }
        }
        Ok(Record {
            id: self.id,
            kind,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            attributes,
        })
    }
}
