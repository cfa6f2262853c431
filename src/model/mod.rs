//! Domain records for the lodging model
//!
//! A [`Record`] is one entity instance: identifier, creation and
//! modification timestamps, a kind from the closed [`EntityKind`]
//! registry, and a flat map of scalar attributes. Records serialize to a
//! single-level document whose reserved `__class__` key carries the kind
//! tag; the same document rebuilds the record on restore.

mod errors;
mod kind;
mod record;
mod value;

pub use errors::{RecordError, RecordResult};
pub use kind::{AttrType, ChildLink, EntityKind, FieldSpec};
pub use record::{format_timestamp, parse_timestamp, Record, CLASS_KEY, TIMESTAMP_FORMAT};
pub use value::AttrValue;
