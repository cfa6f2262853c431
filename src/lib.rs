//! staydb - object persistence for a lodging domain
//!
//! An in-process registry of typed records, flushed to and restored from
//! durable storage. Two interchangeable backends: a single JSON snapshot
//! document and an embedded SQLite database, selected by configuration.

pub mod backend;
pub mod config;
pub mod engine;
pub mod model;
