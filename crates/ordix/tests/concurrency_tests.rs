//! Multi-threaded use of one index.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use common::{insert_all, int, rid, setup, setup_with_config};
use ordix::{CursorDirection, IndexError};
use ordix_core::Direction;
use ordix_storage::backends::RedbConfig;
use ordix_storage::{StorageEngine, StorageError, Transaction};

const ASC: &[Direction] = &[Direction::Ascending];
const THREADS: u64 = 8;

#[test]
fn test_one_context_per_thread() {
    let (engine, index) = setup(false, ASC);

    thread::scope(|s| {
        for t in 0..THREADS {
            let engine = &engine;
            let index = &index;
            s.spawn(move || {
                let tx = engine.begin_read().expect("failed to begin read");
                for _ in 0..10 {
                    index.find_record(&tx, &int(0)).expect("lookup failed");
                }
                index.dup_key_check(&tx, &int(i64::try_from(t).expect("small")), rid(t))
                    .expect("dup check failed");
            });
        }
    });

    assert_eq!(index.thread_contexts(), usize::try_from(THREADS).expect("small"));
    assert_eq!(engine.open_sessions(), index.thread_contexts());
}

#[test]
fn test_racing_unique_inserts_admit_one() {
    let (engine, index) = setup(true, ASC);
    let winners = AtomicUsize::new(0);
    let losers = AtomicUsize::new(0);

    thread::scope(|s| {
        for t in 0..THREADS {
            let (engine, index, winners, losers) = (&engine, &index, &winners, &losers);
            s.spawn(move || {
                let mut tx = engine.begin_write().expect("failed to begin write");
                match index.insert(&mut tx, &int(42), rid(t), false) {
                    Ok(()) => {
                        tx.commit().expect("failed to commit");
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        assert!(e.is_duplicate_key(), "unexpected error: {e}");
                        losers.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(losers.load(Ordering::SeqCst), usize::try_from(THREADS - 1).expect("small"));

    let tx = engine.begin_read().expect("failed to begin read");
    let report = index.full_validate(&tx, true).expect("validate failed");
    assert_eq!(report.num_keys, Some(1));
}

#[test]
fn test_parallel_standard_inserts() {
    let (engine, index) = setup(false, ASC);

    thread::scope(|s| {
        for t in 0..THREADS {
            let (engine, index) = (&engine, &index);
            s.spawn(move || {
                for i in 0..25 {
                    let mut tx = engine.begin_write().expect("failed to begin write");
                    index.insert(&mut tx, &int(i), rid(t * 100 + i.unsigned_abs()), false)
                        .expect("insert failed");
                    tx.commit().expect("failed to commit");
                }
            });
        }
    });

    let tx = engine.begin_read().expect("failed to begin read");
    let mut cursor = index.cursor(&tx, CursorDirection::Forward).expect("failed to open cursor");
    let mut count = 0;
    let mut last = None;
    while let Some(e) = cursor.next().expect("next failed") {
        let entry = (e.key, e.record_id);
        assert!(last.as_ref().map_or(true, |l| *l < entry), "scan out of order");
        last = Some(entry);
        count += 1;
    }
    assert_eq!(count, THREADS * 25);
}

#[test]
fn test_session_cap_surfaces_as_context_unavailable() {
    let (engine, index) = setup_with_config(RedbConfig::new().max_sessions(2), false, ASC);

    for t in 0..2 {
        let (engine, index) = (&engine, &index);
        thread::scope(|s| {
            s.spawn(move || insert_all(engine, index, &[(int(t), t.unsigned_abs())]));
        });
    }
    assert_eq!(engine.open_sessions(), 2);

    let err = thread::scope(|s| {
        s.spawn(|| {
            let tx = engine.begin_read().expect("failed to begin read");
            index.find_record(&tx, &int(0)).expect_err("third context created")
        })
        .join()
        .expect("thread panicked")
    });
    assert!(matches!(err, IndexError::ContextUnavailable(StorageError::ResourceExhausted(_))));
    assert_eq!(index.thread_contexts(), 2);
}

#[test]
fn test_dropping_index_releases_sessions() {
    let (engine, index) = setup(false, ASC);

    thread::scope(|s| {
        for _ in 0..3 {
            let (engine, index) = (&engine, &index);
            s.spawn(move || {
                let tx = engine.begin_read().expect("failed to begin read");
                index.is_empty(&tx).expect("is_empty failed");
                index.find_record(&tx, &int(1)).expect("lookup failed");
            });
        }
    });
    assert_eq!(engine.open_sessions(), 3);

    drop(index);
    assert_eq!(engine.open_sessions(), 0);
}
