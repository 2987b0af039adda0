//! Snapshot range reads driven by key selectors.
//!
//! The iterator repeatedly scans the store from a moving pivot. Within
//! one scan it resolves the bound selectors against the candidate user
//! keys, collapses the versions of the matched user key to the highest
//! sequence visible at the snapshot, and skips tombstoned keys. Every
//! emitted key is read-tainted.

use tinyfdb_storage::{StoredKey, Value};

use crate::selector::{KeyMatcher, KeySelector, MatchResult};
use crate::taint::TaintSet;
use crate::transaction::Transaction;

/// Advisory streaming mode. Carried for API compatibility; the iterator
/// always scans on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamingMode {
    /// Deliver the whole range as fast as possible.
    WantAll,
    /// Balance latency and bandwidth.
    #[default]
    Iterator,
    /// Deliver exactly the row limit in one batch.
    Exact,
    /// Small batches.
    Small,
    /// Medium batches.
    Medium,
    /// Large batches.
    Large,
    /// Maximize single-client throughput.
    Serial,
}

/// Options for a range read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeOptions {
    /// Maximum number of key-value pairs to return; 0 means no limit.
    pub limit: usize,
    /// Walk the range in descending key order. With a limit, the last
    /// `limit` pairs of the range are returned.
    pub reverse: bool,
    /// Advisory streaming mode; ignored.
    pub mode: StreamingMode,
}

/// One key-value pair of a range read. The key is the packed user key,
/// without the trailing commit sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Packed user key.
    pub key: Vec<u8>,
    /// The value. Tombstoned keys are never emitted.
    pub value: Vec<u8>,
}

/// A lazily evaluated range read bound to its transaction.
#[derive(Debug)]
pub struct RangeResult<'a> {
    txn: &'a Transaction,
    begin: KeySelector,
    end: KeySelector,
    options: RangeOptions,
}

impl<'a> RangeResult<'a> {
    pub(crate) fn new(
        txn: &'a Transaction,
        begin: KeySelector,
        end: KeySelector,
        options: RangeOptions,
    ) -> Self {
        RangeResult {
            txn,
            begin,
            end,
            options,
        }
    }

    /// Start iterating. Each call starts over from the range boundary.
    pub fn iterator(&self) -> RangeIterator<'a> {
        let reverse = self.options.reverse;
        let (scan, stop) = if reverse {
            // Scanning walks down from the end bound; the begin selector
            // turns into the stop check. Flipping or_equal keeps the
            // half-open [begin, end) semantics under inverted comparisons.
            (flip(self.end.clone()), flip(self.begin.clone()))
        } else {
            (self.begin.clone(), self.end.clone())
        };
        let pivot = if reverse {
            StoredKey::new(scan.key.clone(), u64::MAX)
        } else {
            StoredKey::new(scan.key.clone(), 0)
        };
        RangeIterator {
            txn: self.txn,
            next: KeyMatcher::new(scan, reverse),
            end: KeyMatcher::new(stop, reverse),
            pivot,
            reverse,
            limit: self.options.limit,
            emitted: 0,
            finished: false,
            current: None,
        }
    }
}

/// Mirror a selector for a descending candidate stream.
fn flip(mut sel: KeySelector) -> KeySelector {
    if sel.offset != 0 {
        sel.or_equal = !sel.or_equal;
    }
    sel
}

/// Iterator over a [`RangeResult`].
#[derive(Debug)]
pub struct RangeIterator<'a> {
    txn: &'a Transaction,
    /// Resolver for the next key to emit; rebuilt after every emit.
    next: KeyMatcher,
    /// Resolver for the far bound; crossing it ends the iteration.
    end: KeyMatcher,
    pivot: StoredKey,
    reverse: bool,
    limit: usize,
    emitted: usize,
    finished: bool,
    current: Option<KeyValue>,
}

impl RangeIterator<'_> {
    /// Move to the next key-value pair. Returns false when the range is
    /// exhausted or the limit is reached.
    pub fn advance(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.limit != 0 && self.emitted >= self.limit {
            self.finished = true;
            return false;
        }

        loop {
            let mut prev: Option<(StoredKey, Value)> = None;
            let mut found: Option<(StoredKey, Value)> = None;
            {
                let next = &mut self.next;
                let end = &mut self.end;
                let reverse = self.reverse;
                let mut last_fed: Option<Vec<u8>> = None;
                let visit = |stored: &StoredKey, value: &Value| -> bool {
                    if let Some((found_key, found_value)) = &mut found {
                        // The matched user key: collapse to the highest
                        // visible sequence. Ascending scans see it last;
                        // descending scans saw it first.
                        if stored.key != found_key.key {
                            return false;
                        }
                        if !reverse {
                            *found_key = stored.clone();
                            *found_value = value.clone();
                        }
                        return true;
                    }
                    if reverse {
                        // Feed each user key once: descending order puts
                        // its highest visible sequence first.
                        if last_fed.as_deref() == Some(stored.key.as_slice()) {
                            return true;
                        }
                        last_fed = Some(stored.key.clone());
                    }
                    if end.feed(&stored.key) != MatchResult::NoMatch {
                        return false;
                    }
                    match next.feed(&stored.key) {
                        MatchResult::NoMatch => {
                            prev = Some((stored.clone(), value.clone()));
                            true
                        }
                        MatchResult::MatchPrev => {
                            found = prev.take();
                            false
                        }
                        MatchResult::MatchCurrent => {
                            found = Some((stored.clone(), value.clone()));
                            true
                        }
                    }
                };
                if self.reverse {
                    self.txn.descend(&self.pivot, visit);
                } else {
                    self.txn.ascend(&self.pivot, visit);
                }
            }

            if found.is_none() && self.next.end() == MatchResult::MatchPrev {
                found = prev;
            }
            let Some((stored, value)) = found else {
                self.finished = true;
                return false;
            };

            self.re_anchor(&stored);

            let Some(bytes) = value else {
                // Tombstone: the key is deleted as of the snapshot. Move
                // past it and scan again.
                continue;
            };

            self.txn.set_taint(stored.key.clone(), TaintSet::READ);
            self.current = Some(KeyValue {
                key: stored.key,
                value: bytes,
            });
            self.emitted += 1;
            return true;
        }
    }

    /// The pair selected by the last successful [`RangeIterator::advance`].
    pub fn get(&self) -> Option<&KeyValue> {
        self.current.as_ref()
    }

    /// Reposition so the next scan starts strictly past the key just
    /// resolved.
    fn re_anchor(&mut self, stored: &StoredKey) {
        if self.reverse {
            // The emitted key itself consumes the first advance of the
            // two-step selector, so the scan lands one user key below.
            let sel = KeySelector {
                key: stored.key.clone(),
                or_equal: false,
                offset: 2,
            };
            self.pivot = StoredKey::new(stored.key.clone(), stored.seq);
            self.next = KeyMatcher::new(sel, true);
        } else {
            // Byte successor: past every stored version of the user key,
            // before any other user key.
            let mut succ = stored.key.clone();
            succ.push(0x00);
            self.pivot = StoredKey::new(succ.clone(), 0);
            self.next = KeyMatcher::new(KeySelector::first_greater_or_equal(succ), false);
        }
    }
}

impl Iterator for RangeIterator<'_> {
    type Item = KeyValue;

    fn next(&mut self) -> Option<KeyValue> {
        if self.advance() {
            self.current.clone()
        } else {
            None
        }
    }
}
