//! The database entry point and the retry driver.

use std::io::Write;

use crate::error::Result;
use crate::transaction::Transaction;

/// Retry budget of [`Database::transact`].
pub const MAX_TRANSACT_RETRIES: usize = 10;

/// Name of the environment variable that enables the default race-trace
/// sink (standard error) when set to a non-empty value.
pub const RACE_TRACEBACK_ENV: &str = "TINYFDB_RACE_TRACEBACK";

/// A process-local database emulating FoundationDB transaction semantics.
///
/// Cloning is cheap and every clone addresses the same database. All data
/// lives in memory and dies with the last clone; there is no durability.
///
/// # Example
///
/// ```
/// use tinyfdb::prelude::*;
///
/// let db = Database::open_default();
/// let key = Tuple::new().push("akey");
///
/// db.transact(|tx| {
///     tx.set(&key, b"avalue");
///     Ok(())
/// })?;
///
/// let tx = db.create_transaction();
/// assert_eq!(tx.get(&key).get()?, Some(b"avalue".to_vec()));
/// # Ok::<(), tinyfdb::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    engine: tinyfdb_engine::Database,
}

impl Database {
    /// Open a fresh in-memory database. Cannot fail.
    ///
    /// When [`RACE_TRACEBACK_ENV`] is set to a non-empty value, race
    /// diagnostics go to standard error.
    pub fn open_default() -> Database {
        let engine = tinyfdb_engine::Database::new();
        if std::env::var(RACE_TRACEBACK_ENV).is_ok_and(|v| !v.is_empty()) {
            engine.set_race_trace_sink(Some(Box::new(std::io::stderr())));
        }
        Database { engine }
    }

    /// Begin a transaction.
    pub fn create_transaction(&self) -> Transaction {
        Transaction {
            inner: self.engine.create_transaction(),
        }
    }

    /// Run `f` inside a transaction, committing on success.
    ///
    /// When the closure or the commit fails with a retryable conflict,
    /// the closure is re-run in a fresh transaction, up to
    /// [`MAX_TRANSACT_RETRIES`] attempts. Any other error cancels the
    /// transaction and is returned as-is.
    pub fn transact<T>(&self, mut f: impl FnMut(&Transaction) -> Result<T>) -> Result<T> {
        for attempt in 0..MAX_TRANSACT_RETRIES {
            let txn = self.create_transaction();
            match f(&txn) {
                Ok(value) => match txn.commit().get() {
                    Ok(()) => return Ok(value),
                    Err(err) if err.is_retryable() && attempt + 1 < MAX_TRANSACT_RETRIES => {
                        tracing::debug!(attempt, %err, "retrying after commit conflict");
                        continue;
                    }
                    Err(err) => return Err(err),
                },
                Err(err) => {
                    txn.cancel();
                    if err.is_retryable() && attempt + 1 < MAX_TRANSACT_RETRIES {
                        tracing::debug!(attempt, %err, "retrying after retryable closure error");
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        unreachable!("transact loop returns within the retry budget")
    }

    /// Diagnostic hooks.
    pub fn debug(&self) -> DatabaseDebug<'_> {
        DatabaseDebug { db: self }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::open_default()
    }
}

/// Diagnostic surface of a [`Database`].
pub struct DatabaseDebug<'a> {
    db: &'a Database,
}

impl DatabaseDebug<'_> {
    /// Install (or clear) the writer receiving race diagnostics.
    ///
    /// While installed, every read/write taint captures a call-site trace
    /// and a conflicting commit dumps the traces for the contested key.
    /// The channel has no effect on semantics.
    pub fn set_race_trace_sink(&self, sink: Option<Box<dyn Write + Send>>) {
        self.db.engine.set_race_trace_sink(sink);
    }
}
