//! Engine contract tests
//!
//! Behaviors the engine guarantees regardless of the durable backend
//! behind it. Every test runs against both variants: the JSON snapshot
//! document and an in-memory SQLite database.

use staydb::backend::{RelationalBackend, SnapshotBackend};
use staydb::engine::StorageEngine;
use staydb::model::{parse_timestamp, EntityKind, Record};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn engines(dir: &TempDir) -> Vec<(&'static str, StorageEngine)> {
    let snapshot = StorageEngine::new(Box::new(SnapshotBackend::new(
        dir.path().join("objects.json"),
    )));
    let relational =
        StorageEngine::new(Box::new(RelationalBackend::open_in_memory().unwrap()));
    vec![("snapshot", snapshot), ("relational", relational)]
}

fn named(kind: EntityKind, name: &str) -> Record {
    let mut record = Record::new(kind);
    record.set("name", name);
    record
}

fn city_of(state: &Record, name: &str) -> Record {
    let mut city = named(EntityKind::City, name);
    city.set("state_id", state.id.as_str());
    city
}

fn at(timestamp: &str) -> chrono::NaiveDateTime {
    parse_timestamp("created_at", timestamp).unwrap()
}

// =============================================================================
// Identifier Stability
// =============================================================================

/// A record keeps its identifier across repeated persists.
#[test]
fn test_identifier_stable_across_persists() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let mut city = named(EntityKind::City, "Paris");
        let id = city.id.clone();

        city.persist(&mut engine).unwrap();
        city.set("name", "Paris 2e");
        city.persist(&mut engine).unwrap();

        assert_eq!(city.id, id, "{}: identifier must not change", label);
        let durable = engine.query_by_kind(EntityKind::City).unwrap();
        assert_eq!(durable.len(), 1, "{}: one durable row", label);
        assert_eq!(durable[0].id, id, "{}: durable identifier matches", label);
    }
}

// =============================================================================
// Timestamp Semantics
// =============================================================================

/// `updated_at` never regresses; `created_at` never changes.
#[test]
fn test_updated_at_monotonic() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let mut user = named(EntityKind::User, "ada");
        user.persist(&mut engine).unwrap();
        let created = user.created_at;
        let first_updated = user.updated_at;

        user.set("email", "ada@example.com");
        user.persist(&mut engine).unwrap();

        assert!(
            user.updated_at >= first_updated,
            "{}: updated_at must never regress",
            label
        );
        assert_eq!(user.created_at, created, "{}: created_at is fixed", label);
    }
}

/// Timestamps survive a durable round trip to the microsecond.
#[test]
fn test_timestamps_roundtrip_exactly() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let mut city = named(EntityKind::City, "Paris");
        city.persist(&mut engine).unwrap();

        let durable = engine.query_by_kind(EntityKind::City).unwrap();
        assert_eq!(durable[0].created_at, city.created_at, "{}", label);
        assert_eq!(durable[0].updated_at, city.updated_at, "{}", label);
    }
}

// =============================================================================
// Filter Correctness
// =============================================================================

/// Kind filters return exactly the matching records.
#[test]
fn test_filter_by_kind_and_tag() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        engine.register(&named(EntityKind::City, "Paris"));
        engine.register(&named(EntityKind::City, "Lyon"));
        engine.register(&named(EntityKind::State, "Nevada"));

        assert_eq!(engine.all().len(), 3, "{}", label);
        assert_eq!(engine.all_of(EntityKind::City).len(), 2, "{}", label);
        assert_eq!(engine.all_of("City").len(), 2, "{}", label);
        assert_eq!(engine.all_of("State").len(), 1, "{}", label);
    }
}

/// A tag outside the closed kind registry filters to nothing.
#[test]
fn test_unknown_tag_filters_to_empty() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        engine.register(&named(EntityKind::City, "Paris"));
        assert!(engine.all_of("Dragon").is_empty(), "{}", label);
        assert!(engine.all_of("city").is_empty(), "{}: tags are exact", label);
    }
}

// =============================================================================
// Registration Semantics
// =============================================================================

/// Registering the same composite key twice overwrites in place.
#[test]
fn test_register_overwrites_same_key() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let mut state = named(EntityKind::State, "Nevada");
        engine.register(&state);
        state.set("name", "Nevada II");
        engine.register(&state);

        assert_eq!(engine.len(), 1, "{}", label);
        let held = engine.get(EntityKind::State, &state.id).unwrap();
        assert_eq!(held.get("name"), state.get("name"), "{}", label);
    }
}

/// Discard followed by flush removes the record durably.
#[test]
fn test_discard_then_flush_removes_durably() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let doomed = named(EntityKind::State, "Atlantis");
        let kept = named(EntityKind::State, "Nevada");
        engine.register(&doomed);
        engine.register(&kept);
        engine.flush().unwrap();

        engine.discard(&doomed);
        engine.flush().unwrap();

        let durable = engine.query_by_kind(EntityKind::State).unwrap();
        assert_eq!(durable.len(), 1, "{}", label);
        assert_eq!(durable[0].id, kept.id, "{}", label);
    }
}

// =============================================================================
// Relationship Resolution
// =============================================================================

/// Children resolve through the declared link, exactly and only.
#[test]
fn test_children_resolution() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let nevada = named(EntityKind::State, "Nevada");
        let vegas = city_of(&nevada, "Las Vegas");
        let reno = city_of(&nevada, "Reno");
        let ohio = named(EntityKind::State, "Ohio");
        let columbus = city_of(&ohio, "Columbus");

        for record in [&nevada, &vegas, &reno, &ohio, &columbus] {
            engine.register(record);
        }
        engine.flush().unwrap();

        let children = engine.children_of(&nevada, EntityKind::City).unwrap();
        assert_eq!(children.len(), 2, "{}", label);
        assert!(
            children.iter().all(|c| c.id == vegas.id || c.id == reno.id),
            "{}: only Nevada's cities",
            label
        );
    }
}

/// Children come back ordered by creation time, then identifier.
#[test]
fn test_children_ordered_by_creation() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let nevada = named(EntityKind::State, "Nevada");
        let mut early = city_of(&nevada, "Reno");
        early.created_at = at("2020-06-01T00:00:00.000000");
        let mut late = city_of(&nevada, "Las Vegas");
        late.created_at = at("2021-06-01T00:00:00.000000");

        engine.register(&nevada);
        engine.register(&late);
        engine.register(&early);
        engine.flush().unwrap();

        let children = engine.children_of(&nevada, EntityKind::City).unwrap();
        let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![early.id.as_str(), late.id.as_str()], "{}", label);
    }
}

/// A parent with no children of the asked kind resolves to nothing.
#[test]
fn test_childless_parent_resolves_empty() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let nevada = named(EntityKind::State, "Nevada");
        engine.register(&nevada);
        engine.flush().unwrap();

        let children = engine.children_of(&nevada, EntityKind::City).unwrap();
        assert!(children.is_empty(), "{}", label);

        // State declares no Review link at all
        let children = engine.children_of(&nevada, EntityKind::Review).unwrap();
        assert!(children.is_empty(), "{}", label);
    }
}

// =============================================================================
// Durable Round Trip
// =============================================================================

/// A record with declared attributes reconstructs identically.
#[test]
fn test_declared_attributes_roundtrip() {
    let dir = TempDir::new().unwrap();
    for (label, mut engine) in engines(&dir) {
        let mut place = Record::new(EntityKind::Place);
        place
            .set("name", "Loft")
            .set("description", "Quiet, sunny")
            .set("number_rooms", 2)
            .set("max_guest", 4)
            .set("price_by_night", 120)
            .set("latitude", 48.85)
            .set("longitude", 2.35);
        place.persist(&mut engine).unwrap();

        let durable = engine.query_by_kind(EntityKind::Place).unwrap();
        assert_eq!(durable.len(), 1, "{}", label);
        assert_eq!(&durable[0], &place, "{}: lossless round trip", label);
    }
}
