//! Public-surface tests: the retry driver, futures, snapshots, and
//! concurrent commit behavior.

use std::sync::atomic::{AtomicUsize, Ordering};

use tinyfdb::prelude::*;

fn key(name: &str) -> Tuple {
    Tuple::new().push(name)
}

// ============================================================================
// transact
// ============================================================================

#[test]
fn transact_returns_the_closure_value() {
    let db = Database::open_default();
    let got = db.transact(|_tx| Ok("hello world")).unwrap();
    assert_eq!(got, "hello world");
}

#[test]
fn transact_does_not_retry_plain_errors() {
    let db = Database::open_default();
    let calls = AtomicUsize::new(0);
    let err = db
        .transact::<()>(|_tx| {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(Error::Internal("mocked error".into()))
        })
        .unwrap_err();
    assert_eq!(err, Error::Internal("mocked error".into()));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn transact_retries_retryable_errors_up_to_the_budget() {
    let db = Database::open_default();
    let calls = AtomicUsize::new(0);
    let err = db
        .transact::<()>(|_tx| {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(Error::Conflict("mocked conflict".into()))
        })
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(calls.load(Ordering::Relaxed), tinyfdb::MAX_TRANSACT_RETRIES);
}

#[test]
fn transact_retries_commit_conflicts_with_a_fresh_transaction() {
    let db = Database::open_default();
    db.transact(|tx| {
        tx.set(&key("k"), b"initial");
        Ok(())
    })
    .unwrap();

    let calls = AtomicUsize::new(0);
    db.transact(|tx| {
        let attempt = calls.fetch_add(1, Ordering::Relaxed);
        // Pin this transaction's snapshot and taints first.
        let _ = tx.get(&key("k")).get()?;
        if attempt == 0 {
            // A peer overwrites the key mid-transaction; our commit must
            // fail and the driver must re-run us in a fresh transaction.
            let peer = db.create_transaction();
            peer.set(&key("k"), b"peer");
            peer.commit().get()?;
        }
        tx.set(&key("k"), b"mine");
        Ok(())
    })
    .unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 2);

    let tx = db.create_transaction();
    assert_eq!(tx.get(&key("k")).get().unwrap(), Some(b"mine".to_vec()));
}

// ============================================================================
// Futures
// ============================================================================

#[test]
fn futures_are_ready_on_construction() {
    let db = Database::open_default();
    let tx = db.create_transaction();

    let fut = tx.get(&key("missing"));
    assert!(fut.is_ready());
    fut.block_until_ready();
    assert_eq!(fut.get().unwrap(), None);
    // get is repeatable.
    assert_eq!(fut.get().unwrap(), None);

    let commit = tx.commit();
    assert!(commit.is_ready());
    commit.get().unwrap();
}

#[test]
fn get_with_malformed_key_fails_through_the_future() {
    let db = Database::open_default();
    let tx = db.create_transaction();
    let err = tx.get(b"\xfe").get().unwrap_err();
    assert!(err.is_invalid_input(), "got {err}");
}

#[test]
fn set_with_malformed_key_fails_at_commit() {
    let db = Database::open_default();
    let tx = db.create_transaction();
    tx.set(b"\xfe\x01", b"v");
    let err = tx.commit().get().unwrap_err();
    assert!(err.is_invalid_input(), "got {err}");
    assert!(!err.is_retryable());
}

// ============================================================================
// Read semantics
// ============================================================================

#[test]
fn absence_and_deletion_read_the_same() {
    let db = Database::open_default();
    db.transact(|tx| {
        tx.set(&key("gone"), b"v");
        Ok(())
    })
    .unwrap();
    db.transact(|tx| {
        tx.clear_range(&key("gone"), &key("gonf"));
        Ok(())
    })
    .unwrap();

    let tx = db.create_transaction();
    assert_eq!(tx.get(&key("gone")).get().unwrap(), None);
    assert_eq!(tx.get(&key("never-written")).get().unwrap(), None);
}

#[test]
fn reads_do_not_observe_buffered_writes() {
    let db = Database::open_default();
    let tx = db.create_transaction();
    tx.set(&key("k"), b"buffered");
    // Reads go to the committed store; the private buffer is invisible
    // until commit.
    assert_eq!(tx.get(&key("k")).get().unwrap(), None);
}

#[test]
fn snapshot_reads_are_repeatable_under_concurrent_commits() {
    let db = Database::open_default();
    db.transact(|tx| {
        tx.set(&key("k"), b"old");
        Ok(())
    })
    .unwrap();

    let tx = db.create_transaction();
    assert_eq!(tx.get(&key("k")).get().unwrap(), Some(b"old".to_vec()));

    db.transact(|peer| {
        peer.set(&key("k"), b"new");
        Ok(())
    })
    .unwrap();

    assert_eq!(tx.get(&key("k")).get().unwrap(), Some(b"old".to_vec()));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_increments_converge_through_retries() {
    const THREADS: usize = 4;
    const INCREMENTS: usize = 8;

    let db = Database::open_default();
    let counter = key("counter");

    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            let db = db.clone();
            let counter = counter.clone();
            scope.spawn(move || {
                let mut done = 0;
                while done < INCREMENTS {
                    let result = db.transact(|tx| {
                        let current = tx
                            .get(&counter)
                            .get()?
                            .map(|raw| u64::from_le_bytes(raw.try_into().unwrap()))
                            .unwrap_or(0);
                        tx.set(&counter, &(current + 1).to_le_bytes());
                        Ok(())
                    });
                    if result.is_ok() {
                        done += 1;
                    }
                }
            });
        }
    });

    let tx = db.create_transaction();
    let raw = tx.get(&counter).get().unwrap().unwrap();
    let total = u64::from_le_bytes(raw.try_into().unwrap());
    assert_eq!(total, (THREADS * INCREMENTS) as u64);
}

#[test]
fn race_traces_reach_a_configured_sink() {
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let db = Database::open_default();
    let buf = SharedBuf::default();
    db.debug().set_race_trace_sink(Some(Box::new(buf.clone())));

    let t1 = db.create_transaction();
    t1.set(&key("contested"), b"v1");
    let t2 = db.create_transaction();
    t2.set(&key("contested"), b"v2");
    t2.commit().get().unwrap_err();
    t1.commit().get().unwrap();

    let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    assert!(out.contains("contested"), "sink saw: {out}");
}
