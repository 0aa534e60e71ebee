//! Shared setup for index integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ordix::{generate_create_string, IndexDescriptor, SortedIndex};
use ordix_core::{Direction, RecordId, Value};
use ordix_storage::backends::{RedbConfig, RedbEngine};
use ordix_storage::{StorageEngine, Transaction};

pub type Index = SortedIndex<RedbEngine>;

/// A descriptor over fields `f0, f1, ...` with the given directions.
pub fn descriptor(name: &str, unique: bool, directions: &[Direction]) -> IndexDescriptor {
    directions
        .iter()
        .enumerate()
        .fold(IndexDescriptor::new(1, name, "test.coll"), |d, (i, dir)| {
            d.with_field(format!("f{i}"), *dir)
        })
        .with_unique(unique)
}

/// An in-memory engine with an initialized, empty index.
pub fn setup(unique: bool, directions: &[Direction]) -> (Arc<RedbEngine>, Index) {
    setup_with_config(RedbConfig::new(), unique, directions)
}

pub fn setup_with_config(
    config: RedbConfig,
    unique: bool,
    directions: &[Direction],
) -> (Arc<RedbEngine>, Index) {
    let engine =
        Arc::new(RedbEngine::in_memory_with_config(config).expect("failed to create engine"));
    let descriptor = descriptor("idx", unique, directions);
    let config = generate_create_string(RedbEngine::NAME, "", "", &descriptor)
        .expect("failed to build create string");
    let index = SortedIndex::new(Arc::clone(&engine), descriptor, config);

    let mut tx = engine.begin_write().expect("failed to begin write");
    index.init_as_empty(&mut tx).expect("failed to init index");
    tx.commit().expect("failed to commit");

    (engine, index)
}

pub fn int(i: i64) -> Vec<Value> {
    vec![Value::Int(i)]
}

pub fn rid(n: u64) -> RecordId {
    RecordId::new(n)
}

/// Insert `(key, id)` pairs in one committed transaction.
pub fn insert_all(engine: &RedbEngine, index: &Index, entries: &[(Vec<Value>, u64)]) {
    let mut tx = engine.begin_write().expect("failed to begin write");
    for (key, id) in entries {
        index.insert(&mut tx, key, rid(*id), false).expect("failed to insert");
    }
    tx.commit().expect("failed to commit");
}
