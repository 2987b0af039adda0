//! The process-local database: one mutex over all shared state.
//!
//! Everything concurrent transactions contend on — the versioned store,
//! the live-transaction taint tables, the commit sequence and the race
//! sink — sits in [`State`] behind a single `parking_lot::Mutex`. Commit
//! acquires it once, which makes commit the linearization point and keeps
//! cross-transaction taint propagation race-free without any per-
//! transaction locking.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tinyfdb_storage::VersionedStore;

use crate::taint::TaintTable;
use crate::transaction::Transaction;

/// Identifier of a live transaction within one database.
pub(crate) type TxnId = u64;

/// Writer receiving race diagnostics. Configured through
/// [`Database::set_race_trace_sink`].
pub type RaceSink = Box<dyn Write + Send>;

pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    next_txn_id: AtomicU64,
}

pub(crate) struct State {
    pub(crate) store: VersionedStore,
    pub(crate) live: FxHashMap<TxnId, TaintTable>,
    /// Last assigned commit sequence. Starts at 1; the first writing
    /// commit assigns 2. A fresh transaction snapshots the current value.
    pub(crate) seq: u64,
    pub(crate) race_sink: Option<RaceSink>,
}

/// An in-memory database emulating FoundationDB transaction semantics.
///
/// Cloning is cheap and every clone addresses the same database.
#[derive(Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// An empty database.
    pub fn new() -> Self {
        Database {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    store: VersionedStore::new(),
                    live: FxHashMap::default(),
                    seq: 1,
                    race_sink: None,
                }),
                next_txn_id: AtomicU64::new(1),
            }),
        }
    }

    /// Begin a transaction. No sequence is assigned until it commits with
    /// a non-empty write buffer.
    pub fn create_transaction(&self) -> Transaction {
        let id = self.shared.next_txn_id.fetch_add(1, Ordering::Relaxed);
        self.shared
            .state
            .lock()
            .live
            .insert(id, TaintTable::default());
        tracing::trace!(txn = id, "transaction started");
        Transaction::new(Arc::clone(&self.shared), id)
    }

    /// Install (or clear) the writer that receives race diagnostics.
    ///
    /// While a sink is installed, every taint records a call-site trace
    /// and a failing commit dumps the traces for the contested key.
    /// Without a sink nothing is captured and semantics are unchanged.
    pub fn set_race_trace_sink(&self, sink: Option<RaceSink>) {
        self.shared.state.lock().race_sink = sink;
    }

    /// The last assigned commit sequence.
    pub fn commit_seq(&self) -> u64 {
        self.shared.state.lock().seq
    }

    /// Number of transactions that are neither committed nor cancelled.
    pub fn live_transactions(&self) -> usize {
        self.shared.state.lock().live.len()
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Database")
            .field("entries", &state.store.len())
            .field("live", &state.live.len())
            .field("seq", &state.seq)
            .finish()
    }
}
