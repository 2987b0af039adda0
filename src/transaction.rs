//! The public transaction handle and range-read surface.

use tinyfdb_engine::{KeyValue, RangeOptions};
use tinyfdb_tuple::TupleError;

use crate::error::{Error, Result};
use crate::future::{FutureUnit, FutureValue};
use crate::keys::{KeyLike, RangeLike};

/// A transaction on a [`crate::Database`].
///
/// All reads observe the snapshot fixed at the transaction's first read;
/// writes stay private until [`Transaction::commit`]. A transaction is
/// not safe for concurrent use by its owner — one thread per transaction.
/// Concurrent transactions coordinate through the database and surface
/// write-write races as retryable commit errors.
#[derive(Debug)]
pub struct Transaction {
    pub(crate) inner: tinyfdb_engine::Transaction,
}

impl Transaction {
    /// Read the value of `key`, or `None` when absent or deleted.
    pub fn get(&self, key: impl KeyLike) -> FutureValue {
        let result = match key.to_key() {
            Ok(k) => self.inner.get(&k).map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };
        FutureValue::ready(result)
    }

    /// Buffer a write of `value` under `key`.
    ///
    /// Malformed keys are reported by `commit`; this operation has no
    /// error channel of its own.
    pub fn set(&self, key: impl KeyLike, value: &[u8]) {
        match key.to_key() {
            Ok(k) => self.inner.set(&k, value),
            Err(e) => self.inner.record_input_error(e),
        }
    }

    /// Delete every key in `[begin, end)` as of this transaction's
    /// snapshot.
    pub fn clear_range(&self, begin: impl KeyLike, end: impl KeyLike) {
        let begin = match begin.to_key() {
            Ok(k) => k,
            Err(e) => return self.inner.record_input_error(e),
        };
        let end = match end.to_key() {
            Ok(k) => k,
            Err(e) => return self.inner.record_input_error(e),
        };
        self.inner.clear_range(&begin, &end);
    }

    /// Read the keys selected by `range`, in order.
    ///
    /// Fixes the snapshot immediately, so the scan is consistent with the
    /// transaction's other reads even if peers commit before iteration.
    pub fn get_range(&self, range: impl RangeLike, options: RangeOptions) -> RangeResult<'_> {
        let inner = match range.to_selectors() {
            Ok((begin, end)) => Ok(self.inner.get_range(begin, end, options)),
            Err(e) => Err(e),
        };
        RangeResult { inner }
    }

    /// Commit the buffered writes.
    ///
    /// A conflict with a concurrent transaction surfaces here as a
    /// retryable [`Error::Conflict`]; deferred input errors surface as
    /// [`Error::InvalidKey`]. Committing with no writes succeeds without
    /// writing anything.
    pub fn commit(&self) -> FutureUnit {
        FutureUnit::ready(self.inner.commit().map_err(Error::from))
    }

    /// Discard the transaction. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

/// A lazily evaluated range read.
#[derive(Debug)]
pub struct RangeResult<'a> {
    inner: std::result::Result<tinyfdb_engine::RangeResult<'a>, TupleError>,
}

impl<'a> RangeResult<'a> {
    /// Start iterating. Each call starts over from the range boundary.
    pub fn iterator(&self) -> RangeIterator<'a> {
        match &self.inner {
            Ok(rr) => RangeIterator {
                state: IterState::Scanning(rr.iterator()),
            },
            Err(e) => RangeIterator {
                state: IterState::Failed(Some(e.clone())),
            },
        }
    }
}

#[derive(Debug)]
enum IterState<'a> {
    Scanning(tinyfdb_engine::RangeIterator<'a>),
    /// The range arguments were malformed; the error is yielded once.
    Failed(Option<TupleError>),
}

/// Iterator over a [`RangeResult`].
#[derive(Debug)]
pub struct RangeIterator<'a> {
    state: IterState<'a>,
}

impl RangeIterator<'_> {
    /// Move to the next key-value pair. `Ok(false)` means the range is
    /// exhausted; malformed range arguments surface here.
    pub fn advance(&mut self) -> Result<bool> {
        match &mut self.state {
            IterState::Scanning(iter) => Ok(iter.advance()),
            IterState::Failed(err) => match err.take() {
                Some(e) => Err(Error::from(e)),
                None => Ok(false),
            },
        }
    }

    /// The pair selected by the last successful [`RangeIterator::advance`].
    /// The key is the packed user key.
    pub fn get(&self) -> Option<&KeyValue> {
        match &self.state {
            IterState::Scanning(iter) => iter.get(),
            IterState::Failed(_) => None,
        }
    }
}

impl Iterator for RangeIterator<'_> {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Result<KeyValue>> {
        match self.advance() {
            Ok(true) => self.get().cloned().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
