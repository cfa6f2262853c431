//! Domain record type and its document form
//!
//! A record serializes to a single-level JSON document:
//!
//! ```text
//! {
//!   "__class__":  "City",                        (reserved type tag)
//!   "id":         "b54a...",                     (UUID v4 text)
//!   "created_at": "2024-03-01T09:30:00.000123",  (fixed format)
//!   "updated_at": "2024-03-01T09:30:00.000123",
//!   ...                                          (scalar attributes)
//! }
//! ```
//!
//! Timestamps always carry six fractional digits, and records truncate
//! their clock readings to whole microseconds, so every value survives a
//! serialize/reconstruct cycle exactly.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::backend::BackendResult;
use crate::engine::StorageEngine;

use super::errors::{RecordError, RecordResult};
use super::kind::EntityKind;
use super::value::AttrValue;

/// Reserved document key carrying the type tag
pub const CLASS_KEY: &str = "__class__";

/// Timestamp rendering used in persisted documents and database columns.
///
/// Spelled as a literal dot plus fixed-width `%6f` rather than `%.6f`:
/// both render identically, but `%.6f` treats the whole fraction as
/// optional when parsing, and a fraction-less string must not parse.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%6f";

/// Render a timestamp in the persisted format
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the persisted format.
///
/// `field` names the offending document key on failure.
pub fn parse_timestamp(field: &str, text: &str) -> RecordResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|_| {
        RecordError::MalformedTimestamp {
            field: field.to_string(),
            value: text.to_string(),
        }
    })
}

/// Current UTC time truncated to whole microseconds, matching the
/// persisted precision.
fn now_micros() -> NaiveDateTime {
    truncate_micros(Utc::now().naive_utc())
}

fn truncate_micros(ts: NaiveDateTime) -> NaiveDateTime {
    let micros = ts.and_utc().timestamp_micros();
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) => dt.naive_utc(),
        None => ts,
    }
}

fn timestamp_field(field: &str, value: Value) -> RecordResult<NaiveDateTime> {
    match value {
        Value::String(text) => parse_timestamp(field, &text),
        other => Err(RecordError::MalformedTimestamp {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// One entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Opaque unique identifier, assigned at creation (UUID v4 text)
    pub id: String,
    /// Kind this record instantiates
    pub kind: EntityKind,
    /// Creation timestamp (UTC, whole microseconds)
    pub created_at: NaiveDateTime,
    /// Last-modification timestamp (UTC, whole microseconds)
    pub updated_at: NaiveDateTime,
    /// Domain attributes, scalar values keyed by name
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Record {
    /// Fresh record with a generated identifier and current timestamps.
    pub fn new(kind: EntityKind) -> Self {
        let now = now_micros();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            created_at: now,
            updated_at: now,
            attributes: BTreeMap::new(),
        }
    }

    /// Build a record from caller-supplied attributes.
    ///
    /// `id`, `created_at` and `updated_at` are honored when supplied and
    /// generated when absent; a supplied identifier is never overwritten.
    /// The reserved type-tag key is skipped, null values mean an absent
    /// attribute, and every remaining value must be a scalar.
    pub fn with_attributes(
        kind: EntityKind,
        mut attributes: Map<String, Value>,
    ) -> RecordResult<Self> {
        attributes.remove(CLASS_KEY);

        let id = match attributes.remove("id") {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(RecordError::UnsupportedValue {
                    field: "id".to_string(),
                    detail: format!("expected a string identifier, got {}", other),
                })
            }
            None => Uuid::new_v4().to_string(),
        };
        let created_at = match attributes.remove("created_at") {
            Some(value) => timestamp_field("created_at", value)?,
            None => now_micros(),
        };
        let updated_at = match attributes.remove("updated_at") {
            Some(value) => timestamp_field("updated_at", value)?,
            None => now_micros(),
        };

        let mut scalars = BTreeMap::new();
        for (name, value) in attributes {
            if value.is_null() {
                continue;
            }
            match AttrValue::from_json(value) {
                Some(scalar) => {
                    scalars.insert(name, scalar);
                }
                None => {
                    return Err(RecordError::UnsupportedValue {
                        field: name,
                        detail: "expected a scalar value".to_string(),
                    })
                }
            }
        }

        Ok(Self {
            id,
            kind,
            created_at,
            updated_at,
            attributes: scalars,
        })
    }

    /// Rebuild a record from its persisted document.
    ///
    /// The reserved `__class__` key names the kind; tags outside the
    /// closed registry are rejected.
    pub fn from_document(mut doc: Map<String, Value>) -> RecordResult<Self> {
        let kind = match doc.remove(CLASS_KEY) {
            Some(Value::String(tag)) => {
                EntityKind::from_tag(&tag).ok_or(RecordError::UnknownKind(tag))?
            }
            Some(other) => {
                return Err(RecordError::UnsupportedValue {
                    field: CLASS_KEY.to_string(),
                    detail: format!("expected a string tag, got {}", other),
                })
            }
            None => {
                return Err(RecordError::UnsupportedValue {
                    field: CLASS_KEY.to_string(),
                    detail: "missing type tag".to_string(),
                })
            }
        };
        Self::with_attributes(kind, doc)
    }

    /// Serialized document form: every attribute plus identity, both
    /// timestamps and the type tag under the reserved key.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        for (name, value) in &self.attributes {
            doc.insert(name.clone(), value.to_json());
        }
        // identity fields win over any attribute using a reserved name
        doc.insert(
            CLASS_KEY.to_string(),
            Value::String(self.kind.as_str().to_string()),
        );
        doc.insert("id".to_string(), Value::String(self.id.clone()));
        doc.insert(
            "created_at".to_string(),
            Value::String(format_timestamp(self.created_at)),
        );
        doc.insert(
            "updated_at".to_string(),
            Value::String(format_timestamp(self.updated_at)),
        );
        doc
    }

    /// Set a domain attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Read a domain attribute.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Advance `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now_micros());
    }

    /// Stamp `updated_at`, register with the engine and flush.
    pub fn persist(&mut self, engine: &mut StorageEngine) -> BackendResult<()> {
        self.touch();
        engine.register(self);
        engine.flush()
    }

    /// Drop this record from the engine's registry.
    ///
    /// The durable layer keeps its copy until the next flush.
    pub fn remove(&self, engine: &mut StorageEngine) {
        engine.discard(self);
    }
}

/// Human-readable description: `[Kind] (id) {attributes}`.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes = serde_json::to_string(&self.attributes).map_err(|_| fmt::Error)?;
        write!(f, "[{}] ({}) {}", self.kind, self.id, attributes)
    }
}
