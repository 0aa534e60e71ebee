//! Bulk builder ordering, duplicate policy and exclusivity.

mod common;

use common::{insert_all, int, rid, setup, Index};
use ordix::{CursorDirection, IndexError};
use ordix_core::{Direction, RecordId};
use ordix_storage::backends::RedbEngine;
use ordix_storage::{StorageEngine, Transaction};

const ASC: &[Direction] = &[Direction::Ascending];

fn contents(engine: &RedbEngine, index: &Index) -> Vec<(i64, RecordId)> {
    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    let mut out = Vec::new();
    while let Some(e) = cursor.next().expect("next failed") {
        let key = index.decode_key(&e.key).expect("decode failed");
        out.push((key[0].as_int().expect("not an int"), e.record_id));
    }
    out
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_out_of_order_keys_are_rejected() {
    let (engine, index) = setup(true, ASC);
    let mut tx = engine.begin_write().expect("failed to begin write");

    let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
    builder.add(&int(3), rid(3)).expect("first add failed");

    let err = builder.add(&int(1), rid(1)).expect_err("smaller key accepted");
    assert!(matches!(err, IndexError::OutOfOrderInsert { .. }));
    assert!(err.to_string().contains("{ f0: 3 }"), "{err}");
    assert!(matches!(builder.add(&int(2), rid(2)), Err(IndexError::OutOfOrderInsert { .. })));

    assert_eq!(builder.len(), 1);
    assert_eq!(builder.commit().expect("commit failed"), 1);
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(3, rid(3))]);
}

#[test]
fn test_sorted_load() {
    let (engine, index) = setup(false, ASC);
    let mut tx = engine.begin_write().expect("failed to begin write");

    let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
    assert!(builder.is_empty());
    for i in 0..100 {
        builder.add(&int(i / 2), rid(i.unsigned_abs())).expect("add failed");
    }
    assert_eq!(builder.commit().expect("commit failed"), 100);
    tx.commit().expect("failed to commit");

    let loaded = contents(&engine, &index);
    assert_eq!(loaded.len(), 100);
    assert_eq!(loaded[0], (0, rid(0)));
    assert_eq!(loaded[99], (49, rid(99)));

    let tx = engine.begin_read().expect("failed to begin read");
    assert!(index.full_validate(&tx, true).expect("validate failed").valid);
}

// ============================================================================
// Equal keys
// ============================================================================

#[test]
fn test_unique_equal_keys_without_dups() {
    let (engine, index) = setup(true, ASC);
    let mut tx = engine.begin_write().expect("failed to begin write");

    let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
    builder.add(&int(1), rid(10)).expect("add failed");
    assert!(builder.add(&int(1), rid(11)).expect_err("duplicate accepted").is_duplicate_key());
    builder.add(&int(2), rid(20)).expect("add failed");
    builder.commit().expect("commit failed");
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(1, rid(10)), (2, rid(20))]);
}

#[test]
fn test_unique_equal_keys_with_dups_keep_last() {
    let (engine, index) = setup(true, ASC);
    let mut tx = engine.begin_write().expect("failed to begin write");

    let mut builder = index.bulk_builder(&mut tx, true).expect("failed to start bulk build");
    builder.add(&int(1), rid(10)).expect("add failed");
    builder.add(&int(1), rid(11)).expect("add failed");
    builder.add(&int(1), rid(12)).expect("add failed");
    assert_eq!(builder.len(), 1);
    builder.commit().expect("commit failed");
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(1, rid(12))]);
}

#[test]
fn test_unique_build_without_dups_keeps_existing_bindings() {
    let (engine, index) = setup(true, ASC);
    insert_all(&engine, &index, &[(int(5), 1)]);

    let mut tx = engine.begin_write().expect("failed to begin write");
    let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
    builder.add(&int(3), rid(3)).expect("add failed");
    builder.add(&int(5), rid(2)).expect("add failed");

    let err = builder.commit().expect_err("existing key rebound");
    assert!(err.is_duplicate_key());
    assert!(err.to_string().contains("{ f0: 5 }"), "{err}");
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(5, rid(1))]);
    let tx = engine.begin_read().expect("failed to begin read");
    assert_eq!(index.find_record(&tx, &int(5)).expect("lookup failed"), Some(rid(1)));
}

#[test]
fn test_unique_build_tolerates_matching_existing_bindings() {
    let (engine, index) = setup(true, ASC);
    insert_all(&engine, &index, &[(int(5), 1)]);

    let mut tx = engine.begin_write().expect("failed to begin write");
    let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
    builder.add(&int(5), rid(1)).expect("add failed");
    builder.add(&int(6), rid(6)).expect("add failed");
    assert_eq!(builder.commit().expect("commit failed"), 2);
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(5, rid(1)), (6, rid(6))]);
}

#[test]
fn test_unique_build_with_dups_rebinds_existing_key() {
    let (engine, index) = setup(true, ASC);
    insert_all(&engine, &index, &[(int(5), 1)]);

    let mut tx = engine.begin_write().expect("failed to begin write");
    let mut builder = index.bulk_builder(&mut tx, true).expect("failed to start bulk build");
    builder.add(&int(5), rid(2)).expect("add failed");
    builder.commit().expect("commit failed");
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(5, rid(2))]);
}

#[test]
fn test_standard_equal_keys_need_increasing_ids() {
    let (engine, index) = setup(false, ASC);
    let mut tx = engine.begin_write().expect("failed to begin write");

    let mut builder = index.bulk_builder(&mut tx, true).expect("failed to start bulk build");
    builder.add(&int(1), rid(5)).expect("add failed");
    builder.add(&int(1), rid(6)).expect("add failed");
    assert!(matches!(builder.add(&int(1), rid(6)), Err(IndexError::OutOfOrderInsert { .. })));
    assert!(matches!(builder.add(&int(1), rid(2)), Err(IndexError::OutOfOrderInsert { .. })));
    builder.commit().expect("commit failed");
    tx.commit().expect("failed to commit");

    assert_eq!(contents(&engine, &index), vec![(1, rid(5)), (1, rid(6))]);
}

// ============================================================================
// Abandoned builds and exclusivity
// ============================================================================

#[test]
fn test_abort_and_drop_write_nothing() {
    let (engine, index) = setup(false, ASC);
    let mut tx = engine.begin_write().expect("failed to begin write");

    let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
    builder.add(&int(1), rid(1)).expect("add failed");
    builder.abort();

    {
        let mut builder = index.bulk_builder(&mut tx, false).expect("failed to start bulk build");
        builder.add(&int(2), rid(2)).expect("add failed");
    }

    assert!(index.is_empty(&tx).expect("is_empty failed"));
    tx.commit().expect("failed to commit");
    assert!(contents(&engine, &index).is_empty());
}

#[test]
fn test_builder_excludes_other_writers() {
    let (engine, index) = setup(true, ASC);
    let mut write = engine.begin_write().expect("failed to begin write");
    let mut other = engine.begin_read().expect("failed to begin read");

    let builder = index.bulk_builder(&mut write, false).expect("failed to start bulk build");

    assert!(matches!(
        index.bulk_builder(&mut other, false),
        Err(IndexError::BulkLoadInProgress { .. })
    ));
    assert!(matches!(
        index.insert(&mut other, &int(1), rid(1), false),
        Err(IndexError::BulkLoadInProgress { .. })
    ));
    assert!(matches!(
        index.unindex(&mut other, &int(1), rid(1), false),
        Err(IndexError::BulkLoadInProgress { .. })
    ));

    // Reads are unaffected
    assert_eq!(index.find_record(&other, &int(1)).expect("lookup failed"), None);

    drop(builder);
    index.insert(&mut write, &int(1), rid(1), false).expect("insert after build failed");
    write.commit().expect("failed to commit");
}
