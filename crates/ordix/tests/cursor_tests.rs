//! Cursor positioning and iteration.

mod common;

use common::{insert_all, int, rid, setup, Index};
use ordix::{CursorDirection, IndexCursor, IndexError};
use ordix_core::{Direction, RecordId, Value};
use ordix_storage::backends::RedbEngine;
use ordix_storage::{StorageEngine, Transaction};

const ASC: &[Direction] = &[Direction::Ascending];

fn drain<T: Transaction>(cursor: &mut IndexCursor<'_, RedbEngine, T>) -> Vec<RecordId> {
    let mut ids = Vec::new();
    while let Some(e) = cursor.next().expect("next failed") {
        ids.push(e.record_id);
    }
    ids
}

fn keys_of<T: Transaction>(index: &Index, cursor: &mut IndexCursor<'_, RedbEngine, T>) -> Vec<i64> {
    let mut keys = Vec::new();
    while let Some(e) = cursor.next().expect("next failed") {
        let key = index.decode_key(&e.key).expect("decode failed");
        keys.push(key[0].as_int().expect("not an int"));
    }
    keys
}

/// A standard index holding keys 10, 20, 20, 20, 30 with ids 1..=5.
fn populated() -> (std::sync::Arc<RedbEngine>, Index) {
    let (engine, index) = setup(false, ASC);
    insert_all(
        &engine,
        &index,
        &[(int(10), 1), (int(20), 2), (int(20), 3), (int(20), 4), (int(30), 5)],
    );
    (engine, index)
}

// ============================================================================
// Empty index
// ============================================================================

#[test]
fn test_empty_index() {
    let (engine, index) = setup(true, ASC);
    let tx = engine.begin_read().expect("failed to begin read");

    for direction in [CursorDirection::Forward, CursorDirection::Backward] {
        let mut cursor = index.cursor(&tx, direction).expect("failed to open cursor");
        assert_eq!(cursor.direction(), direction);
        assert_eq!(cursor.seek(&int(0), true).expect("seek failed"), None);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next().expect("next failed"), None);
        assert!(cursor.current().is_none());
    }
}

// ============================================================================
// Full scans
// ============================================================================

#[test]
fn test_forward_and_backward_scan() {
    let (engine, index) = populated();
    let tx = engine.begin_read().expect("failed to begin read");

    let mut forward = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    assert_eq!(drain(&mut forward), [1, 2, 3, 4, 5].map(rid));

    let mut backward = index.cursor(&tx, CursorDirection::Backward).expect("failed to open cursor");
    assert_eq!(drain(&mut backward), [5, 4, 3, 2, 1].map(rid));
}

#[test]
fn test_scan_across_storage_batches() {
    let (engine, index) = setup(true, ASC);
    let entries: Vec<_> = (0u32..2500).map(|i| (int(i64::from(i)), u64::from(i))).collect();
    insert_all(&engine, &index, &entries);

    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Backward).expect("failed to open cursor");
    let ids = drain(&mut cursor);
    assert_eq!(ids.len(), 2500);
    assert_eq!(ids.first(), Some(&rid(2499)));
    assert_eq!(ids.last(), Some(&rid(0)));
}

#[test]
fn test_descending_field_reverses_order() {
    let (engine, index) = setup(true, &[Direction::Descending]);
    insert_all(&engine, &index, &[(int(1), 1), (int(2), 2), (int(3), 3)]);

    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    assert_eq!(keys_of(&index, &mut cursor), vec![3, 2, 1]);

    // "Past 2" in index order is toward smaller values
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    let entry = cursor.seek(&int(2), false).expect("seek failed").expect("no entry past 2");
    assert_eq!(entry.record_id, rid(1));
}

#[test]
fn test_mixed_types_sort_by_type() {
    let (engine, index) = setup(true, ASC);
    insert_all(
        &engine,
        &index,
        &[
            (vec![Value::from("a")], 1),
            (vec![Value::Int(-5)], 2),
            (vec![Value::Null], 3),
            (vec![Value::Bool(true)], 4),
        ],
    );

    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    assert_eq!(drain(&mut cursor), [3, 4, 2, 1].map(rid));
}

// ============================================================================
// Seeks
// ============================================================================

#[test]
fn test_forward_seek() {
    let (engine, index) = populated();
    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");

    let first = cursor.seek(&int(20), true).expect("seek failed").expect("no entry");
    assert_eq!(first.record_id, rid(2));
    assert_eq!(cursor.current(), Some(&first));
    assert_eq!(drain(&mut cursor), [3, 4, 5].map(rid));

    let after = cursor.seek(&int(20), false).expect("seek failed").expect("no entry");
    assert_eq!(after.record_id, rid(5));

    // Between keys, inclusive and exclusive agree
    let mid = cursor.seek(&int(15), true).expect("seek failed").expect("no entry");
    assert_eq!(mid.record_id, rid(2));
    let mid = cursor.seek(&int(15), false).expect("seek failed").expect("no entry");
    assert_eq!(mid.record_id, rid(2));

    assert_eq!(cursor.seek(&int(30), false).expect("seek failed"), None);
    assert_eq!(cursor.seek(&int(31), true).expect("seek failed"), None);
}

#[test]
fn test_backward_seek() {
    let (engine, index) = populated();
    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Backward).expect("failed to open cursor");

    // Inclusive lands on the last record under the key
    let at = cursor.seek(&int(20), true).expect("seek failed").expect("no entry");
    assert_eq!(at.record_id, rid(4));
    assert_eq!(drain(&mut cursor), [3, 2, 1].map(rid));

    let before = cursor.seek(&int(20), false).expect("seek failed").expect("no entry");
    assert_eq!(before.record_id, rid(1));

    let top = cursor.seek(&int(99), true).expect("seek failed").expect("no entry");
    assert_eq!(top.record_id, rid(5));

    assert_eq!(cursor.seek(&int(10), false).expect("seek failed"), None);
}

#[test]
fn test_seek_rejects_bad_key() {
    let (engine, index) = populated();
    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");

    let err = cursor.seek(&[Value::Int(1), Value::Int(2)], true).expect_err("bad key accepted");
    assert!(matches!(err, IndexError::InvalidKey(_)));
}

// ============================================================================
// Exhaustion and repositioning
// ============================================================================

#[test]
fn test_exhaustion_is_sticky() {
    let (engine, index) = populated();
    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");

    cursor.seek(&int(30), true).expect("seek failed");
    assert_eq!(cursor.next().expect("next failed"), None);
    assert!(cursor.is_exhausted());
    assert_eq!(cursor.next().expect("next failed"), None);
    assert_eq!(cursor.next().expect("next failed"), None);
    assert!(cursor.current().is_none());

    let again = cursor.seek(&int(10), true).expect("seek failed").expect("no entry");
    assert_eq!(again.record_id, rid(1));
    assert!(!cursor.is_exhausted());
}

#[test]
fn test_seek_to_start() {
    let (engine, index) = populated();
    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Backward).expect("failed to open cursor");

    assert_eq!(drain(&mut cursor).len(), 5);
    cursor.seek_to_start().expect("seek_to_start failed");
    assert!(cursor.current().is_none());
    assert_eq!(drain(&mut cursor), [5, 4, 3, 2, 1].map(rid));
}

#[test]
fn test_cursor_sees_own_writes() {
    let (engine, index) = populated();
    let mut tx = engine.begin_write().expect("failed to begin write");
    index.insert(&mut tx, &int(25), rid(9), false).expect("insert failed");
    index.unindex(&mut tx, &int(10), rid(1), false).expect("unindex failed");

    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    assert_eq!(keys_of(&index, &mut cursor), vec![20, 20, 20, 25, 30]);
}
