//! Transactions: a private write buffer, a lazy snapshot, and taints.
//!
//! A transaction is a handle meant for one logical caller; concurrent
//! transactions coordinate only through the database mutex. Reads go to
//! the store filtered by the snapshot sequence; writes stay in the
//! private buffer until commit merges them under the next sequence.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tinyfdb_storage::{StoredKey, Value};
use tinyfdb_tuple::Tuple;

use crate::database::{Shared, TxnId};
use crate::error::{Error, Result};
use crate::iterator::{RangeOptions, RangeResult};
use crate::selector::KeySelector;
use crate::taint::TaintSet;

/// Lifecycle of a transaction. Terminal states permit no further
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// Accepting operations.
    Active,
    /// Commit succeeded and the writes are in the store.
    Committed,
    /// Cancelled, committed empty, or failed commit.
    Cancelled,
}

#[derive(Debug)]
struct Inner {
    /// Pending writes by canonical packed user key. `None` = tombstone.
    writes: BTreeMap<Vec<u8>, Value>,
    /// Snapshot sequence; 0 until the first read fixes it.
    read_seq: u64,
    status: TxnStatus,
    /// First input error from an operation with no in-line error channel;
    /// reported by commit.
    deferred: Option<Error>,
}

/// A transaction on a [`crate::Database`].
///
/// Not safe for concurrent use by its owner; one thread per transaction.
pub struct Transaction {
    shared: Arc<Shared>,
    id: TxnId,
    inner: Mutex<Inner>,
}

impl Transaction {
    pub(crate) fn new(shared: Arc<Shared>, id: TxnId) -> Self {
        Transaction {
            shared,
            id,
            inner: Mutex::new(Inner {
                writes: BTreeMap::new(),
                read_seq: 0,
                status: TxnStatus::Active,
                deferred: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TxnStatus {
        self.inner.lock().status
    }

    /// Buffer a write of `value` under `key`.
    ///
    /// `key` must be a valid packed tuple; a malformed key is reported by
    /// `commit`, since this operation has no error channel of its own.
    pub fn set(&self, key: &[u8], value: &[u8]) {
        let canonical = match canonical_key(key) {
            Ok(k) => k,
            Err(e) => return self.defer(e),
        };
        {
            let mut inner = self.inner.lock();
            if inner.status != TxnStatus::Active {
                return;
            }
            inner.writes.insert(canonical.clone(), Some(value.to_vec()));
        }
        self.set_taint(canonical, TaintSet::WRITE);
    }

    /// Read the value of `key` at this transaction's snapshot.
    ///
    /// Returns `None` both for keys never written and for keys whose
    /// latest visible version is a tombstone; absence and deletion are
    /// indistinguishable. A successful lookup records a read taint.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let canonical = canonical_key(key)?;
        let mut found: Option<Value> = None;
        self.ascend(&StoredKey::new(canonical.clone(), 0), |stored, value| {
            if stored.key != canonical {
                return false;
            }
            // Keep scanning: a later entry is a higher sequence of the
            // same key, still within the snapshot.
            found = Some(value.clone());
            true
        });
        match found {
            Some(value) => {
                self.set_taint(canonical, TaintSet::READ);
                Ok(value)
            }
            None => Ok(None),
        }
    }

    /// Tombstone every user key in `[begin, end)` whose latest visible
    /// version is live.
    ///
    /// Keys already tombstoned are not re-tombstoned: their pending write
    /// (if any) is dropped and their READ/WRITE taints cleared, so
    /// re-clearing cannot manufacture a race with a concurrent writer of
    /// a version this transaction cannot see. CONFLICT taints already
    /// propagated by committed peers are preserved.
    pub fn clear_range(&self, begin: &[u8], end: &[u8]) {
        let begin = match canonical_key(begin) {
            Ok(k) => k,
            Err(e) => return self.defer(e),
        };
        let end = match canonical_key(end) {
            Ok(k) => k,
            Err(e) => return self.defer(e),
        };

        // Collapse the version walk to one action per user key: versions
        // arrive sequence-ascending, so the last one wins.
        let mut actions: Vec<(Vec<u8>, bool)> = Vec::new();
        self.ascend(&StoredKey::new(begin, 0), |stored, value| {
            if stored.key.as_slice() >= end.as_slice() {
                return false;
            }
            let tombstone = value.is_none();
            match actions.last_mut() {
                Some((key, action)) if *key == stored.key => *action = tombstone,
                _ => actions.push((stored.key.clone(), tombstone)),
            }
            true
        });

        for (key, already_tombstoned) in actions {
            if already_tombstoned {
                {
                    let mut inner = self.inner.lock();
                    if inner.status != TxnStatus::Active {
                        return;
                    }
                    inner.writes.remove(&key);
                }
                let mut state = self.shared.state.lock();
                if let Some(table) = state.live.get_mut(&self.id) {
                    if let Some(taint) = table.taints.get_mut(&key) {
                        let rest = taint.without(TaintSet::READ | TaintSet::WRITE);
                        if rest.is_empty() {
                            table.taints.remove(&key);
                        } else {
                            *taint = rest;
                        }
                    }
                }
            } else {
                {
                    let mut inner = self.inner.lock();
                    if inner.status != TxnStatus::Active {
                        return;
                    }
                    inner.writes.insert(key.clone(), None);
                }
                self.set_taint(key, TaintSet::WRITE);
            }
        }
    }

    /// Build a range read over `[begin, end)` as resolved by the two
    /// selectors. Fixes the snapshot now, so the scan is consistent with
    /// every other read of this transaction.
    pub fn get_range(
        &self,
        begin: KeySelector,
        end: KeySelector,
        options: RangeOptions,
    ) -> RangeResult<'_> {
        self.snapshot_seq();
        RangeResult::new(self, begin, end, options)
    }

    /// Commit the buffered writes.
    ///
    /// An empty commit cancels and succeeds without assigning a sequence.
    /// Otherwise, under the database mutex: fail with a retryable error if
    /// any own-tainted key has been overwritten by a committed peer, or if
    /// a still-live peer holds a write taint on a key this transaction
    /// wrote; then tag every other live transaction with CONFLICT on each
    /// written key, assign the next sequence and merge the write buffer
    /// into the store.
    pub fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.status != TxnStatus::Active {
            return Err(Error::NotActive);
        }
        if let Some(err) = inner.deferred.take() {
            inner.status = TxnStatus::Cancelled;
            inner.writes.clear();
            drop(inner);
            self.unregister();
            return Err(err);
        }
        if inner.writes.is_empty() {
            inner.status = TxnStatus::Cancelled;
            drop(inner);
            self.unregister();
            return Ok(());
        }

        let mut state = self.shared.state.lock();
        let state = &mut *state;
        // Removing our own table up front unregisters the transaction and
        // leaves `live` holding exactly the peers to tag below.
        let table = state.live.remove(&self.id).unwrap_or_default();

        for (key, taint) in &table.taints {
            if !taint.contains(TaintSet::CONFLICT)
                || !taint.intersects(TaintSet::READ | TaintSet::WRITE)
            {
                continue;
            }
            let shown = display_key(key);
            if let Some(sink) = state.race_sink.as_mut() {
                let _ = writeln!(sink, "*** tinyfdb races for key {shown} ***");
                for trace in table.traces.get(key).into_iter().flatten() {
                    let _ = writeln!(sink, "Race {trace}");
                }
            }
            tracing::warn!(txn = self.id, key = %shown, "commit failed on write race");
            inner.status = TxnStatus::Cancelled;
            inner.writes.clear();
            return Err(Error::WriteRace { key: shown });
        }

        // A still-live peer that wrote one of our keys was there first:
        // its buffered write and ours race, and it would not learn about
        // us until its own commit. The one in the middle of commit backs
        // off instead.
        for (key, taint) in &table.taints {
            if !taint.contains(TaintSet::WRITE) {
                continue;
            }
            let contested = state.live.values().any(|peer| {
                peer.taints
                    .get(key)
                    .is_some_and(|t| t.contains(TaintSet::WRITE))
            });
            if contested {
                let shown = display_key(key);
                if let Some(sink) = state.race_sink.as_mut() {
                    let _ = writeln!(sink, "*** tinyfdb races for key {shown} ***");
                    for trace in table.traces.get(key).into_iter().flatten() {
                        let _ = writeln!(sink, "Race {trace}");
                    }
                }
                tracing::warn!(txn = self.id, key = %shown, "commit failed on live peer write");
                inner.status = TxnStatus::Cancelled;
                inner.writes.clear();
                return Err(Error::WriteRace { key: shown });
            }
        }

        // Post-flight propagation: we did not conflict; the still-live
        // peers now will, on every key we are about to write.
        let capture = state.race_sink.is_some();
        for (key, taint) in &table.taints {
            if !taint.contains(TaintSet::WRITE) {
                continue;
            }
            for peer in state.live.values_mut() {
                *peer.taints.entry(key.clone()).or_default() |= TaintSet::CONFLICT;
                if capture {
                    if let Some(traces) = table.traces.get(key) {
                        peer.traces
                            .entry(key.clone())
                            .or_default()
                            .extend(traces.iter().cloned());
                    }
                }
            }
        }

        state.seq = match state.seq.checked_add(1) {
            Some(seq) => seq,
            None => panic!("commit sequence wrapped around"),
        };
        let seq = state.seq;
        let writes = std::mem::take(&mut inner.writes);
        tracing::debug!(txn = self.id, seq, keys = writes.len(), "commit applied");
        for (key, value) in writes {
            state.store.set(StoredKey::new(key, seq), value);
        }
        inner.status = TxnStatus::Committed;
        Ok(())
    }

    /// Discard the transaction. Idempotent; a no-op after commit.
    pub fn cancel(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.status != TxnStatus::Active {
                return;
            }
            inner.status = TxnStatus::Cancelled;
            inner.writes.clear();
        }
        self.unregister();
    }

    /// The snapshot sequence, fixed to the current commit sequence on
    /// first use and never changed afterwards.
    pub fn snapshot_seq(&self) -> u64 {
        let mut inner = self.inner.lock();
        if inner.read_seq == 0 {
            inner.read_seq = self.shared.state.lock().seq;
        }
        inner.read_seq
    }

    /// Walk store entries with stored key >= `pivot` in ascending order,
    /// skipping versions committed after this transaction's snapshot.
    pub(crate) fn ascend<F>(&self, pivot: &StoredKey, mut visit: F)
    where
        F: FnMut(&StoredKey, &Value) -> bool,
    {
        let seq = self.snapshot_seq();
        let state = self.shared.state.lock();
        state.store.ascend(pivot, |stored, value| {
            if stored.seq > seq {
                return true;
            }
            visit(stored, value)
        });
    }

    /// Descending counterpart of [`Transaction::ascend`].
    pub(crate) fn descend<F>(&self, pivot: &StoredKey, mut visit: F)
    where
        F: FnMut(&StoredKey, &Value) -> bool,
    {
        let seq = self.snapshot_seq();
        let state = self.shared.state.lock();
        state.store.descend(pivot, |stored, value| {
            if stored.seq > seq {
                return true;
            }
            visit(stored, value)
        });
    }

    /// Record a taint for `key`, capturing a call-site trace while a race
    /// sink is configured. A no-op once the transaction left the live set.
    pub(crate) fn set_taint(&self, key: Vec<u8>, taint: TaintSet) {
        let mut state = self.shared.state.lock();
        let capture = state.race_sink.is_some();
        let Some(table) = state.live.get_mut(&self.id) else {
            return;
        };
        *table.taints.entry(key.clone()).or_default() |= taint;
        if capture {
            let trace = format!("{} at\n{}", taint, Backtrace::force_capture());
            table.traces.entry(key).or_default().push(trace);
        }
    }

    /// Record an input error hit while preparing an operation's arguments
    /// outside the engine (e.g. packing a key). Reported by commit, like
    /// any other deferred input error.
    pub fn record_input_error(&self, err: tinyfdb_tuple::TupleError) {
        self.defer(Error::InvalidKey(err));
    }

    fn defer(&self, err: Error) {
        let mut inner = self.inner.lock();
        if inner.deferred.is_none() {
            inner.deferred = Some(err);
        }
    }

    fn unregister(&self) {
        self.shared.state.lock().live.remove(&self.id);
    }

    #[cfg(test)]
    pub(crate) fn id(&self) -> TxnId {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn writes_snapshot(&self) -> Vec<(Vec<u8>, Value)> {
        let inner = self.inner.lock();
        inner.writes.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &inner.status)
            .field("writes", &inner.writes.len())
            .field("read_seq", &inner.read_seq)
            .finish()
    }
}

/// Decode and re-encode a key argument, rejecting anything that is not a
/// valid packed tuple and normalizing the encoding so taints, writes and
/// stored keys all agree on one byte form per user key.
fn canonical_key(key: &[u8]) -> Result<Vec<u8>> {
    let tuple = Tuple::unpack(key)?;
    Ok(tuple.pack()?)
}

/// Render a packed key for diagnostics, falling back to hex when it does
/// not decode.
fn display_key(key: &[u8]) -> String {
    match Tuple::unpack(key) {
        Ok(tuple) => tuple.to_string(),
        Err(_) => {
            let mut out = String::with_capacity(2 + key.len() * 2);
            out.push_str("0x");
            for b in key {
                out.push_str(&format!("{b:02x}"));
            }
            out
        }
    }
}
