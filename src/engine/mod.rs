//! Object store over a durable backend
//!
//! # Design Principles
//!
//! - The registry is authoritative between flushes
//! - Composite keys (`<Kind>.<id>`) namespace identifiers per kind
//! - Durable writes happen only on an explicit flush
//! - Restore is additive; reconnect resynchronizes from scratch

mod registry;
mod store;

pub use registry::{KindFilter, Registry};
pub use store::StorageEngine;
