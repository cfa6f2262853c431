//! SQL rendering for the relational backend
//!
//! Every statement is rendered from the declarative kind schema, so the
//! entity tables can never drift from the attribute definitions.

use crate::model::{ChildLink, EntityKind};

/// Columns shared by every kind table, in select order.
const BASE_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

fn columns(kind: EntityKind) -> Vec<&'static str> {
    let mut columns = BASE_COLUMNS.to_vec();
    columns.extend(kind.fields().iter().map(|field| field.name));
    columns
}

fn column_list(kind: EntityKind) -> String {
    columns(kind).join(", ")
}

/// CREATE TABLE statement for one kind.
///
/// Foreign-key columns cascade on delete, so removing a parent row
/// removes its dependents inside the database.
pub fn create_table(kind: EntityKind) -> String {
    let mut definitions = vec![
        "id TEXT PRIMARY KEY".to_string(),
        "created_at TEXT NOT NULL".to_string(),
        "updated_at TEXT NOT NULL".to_string(),
    ];
    let mut constraints = Vec::new();
    for field in kind.fields() {
        definitions.push(format!("{} {}", field.name, field.ty.sql_type()));
        if let Some(parent) = field.references {
            constraints.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} (id) ON DELETE CASCADE",
                field.name,
                parent.table()
            ));
        }
    }
    definitions.extend(constraints);
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        kind.table(),
        definitions.join(", ")
    )
}

/// DROP TABLE statement for one kind.
pub fn drop_table(kind: EntityKind) -> String {
    format!("DROP TABLE IF EXISTS {}", kind.table())
}

/// Upsert for one kind; parameters follow [`columns`] order.
///
/// Never `INSERT OR REPLACE`: SQLite implements that as delete-then-
/// insert, which would fire the delete cascade on every overwrite of a
/// parent row.
pub fn upsert(kind: EntityKind) -> String {
    let columns = columns(kind);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .skip(1)
        .map(|column| format!("{} = excluded.{}", column, column))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
        kind.table(),
        columns.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

/// Every row of one kind's table.
pub fn select_all(kind: EntityKind) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY created_at, id",
        column_list(kind),
        kind.table()
    )
}

/// Every identifier in one kind's table.
pub fn select_ids(kind: EntityKind) -> String {
    format!("SELECT id FROM {}", kind.table())
}

/// Child rows whose foreign key names the parent identifier (`?1`).
pub fn select_children(link: &ChildLink) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = ?1 ORDER BY created_at, id",
        column_list(link.child),
        link.child.table(),
        link.foreign_key
    )
}

/// Delete one row by identifier (`?1`).
pub fn delete(kind: EntityKind) -> String {
    format!("DELETE FROM {} WHERE id = ?1", kind.table())
}
