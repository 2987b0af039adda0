//! # tinyfdb
//!
//! An in-process, embeddable key-value store that emulates the
//! transaction semantics of a FoundationDB cluster, for tests and small
//! tools. Clients open a process-local database, begin transactions,
//! read and write tuple-encoded keys, and commit; concurrent transactions
//! that touch the same keys fail with a retryable conflict, so client
//! code exercises the same retry paths it would run against a real
//! cluster.
//!
//! ## Quick Start
//!
//! ```
//! use tinyfdb::prelude::*;
//!
//! let db = Database::open_default();
//!
//! // The retry driver re-runs the closure on conflicts.
//! db.transact(|tx| {
//!     tx.set(&Tuple::new().push("user").push(1i64), b"alice");
//!     tx.set(&Tuple::new().push("user").push(2i64), b"bob");
//!     Ok(())
//! })?;
//!
//! // Range-read every key under the ("user",) prefix.
//! let tx = db.create_transaction();
//! let users = Tuple::new().push("user");
//! for kv in tx.get_range(&users, RangeOptions::default()).iterator() {
//!     let kv = kv?;
//!     println!("{:?} = {:?}", Tuple::unpack(&kv.key), kv.value);
//! }
//! # Ok::<(), tinyfdb::Error>(())
//! ```
//!
//! ## Semantics
//!
//! - **Snapshot reads.** A transaction's first read fixes its snapshot;
//!   everything committed later is invisible to it.
//! - **Optimistic concurrency.** Writes stay private until commit, which
//!   detects write-write races and fails with a retryable error; the
//!   losing side retries via [`Database::transact`].
//! - **Ordered tuple keys.** Keys are [`tuple::Tuple`]s in their
//!   order-preserving packed form, so range reads follow tuple order.
//!
//! Durability, replication and real asynchrony are explicitly out of
//! scope; returned futures are ready on construction.

#![warn(missing_docs)]

mod database;
mod error;
mod future;
mod keys;
mod transaction;

pub mod prelude;

/// The tuple layer: element model and order-preserving codec.
pub mod tuple {
    pub use tinyfdb_tuple::{
        BigInt, Element, Tuple, TupleError, Versionstamp, INCOMPLETE_TRANSACTION_VERSION,
    };
}

pub use database::{Database, DatabaseDebug, MAX_TRANSACT_RETRIES, RACE_TRACEBACK_ENV};
pub use error::{Error, Result};
pub use future::{FutureUnit, FutureValue};
pub use keys::{Key, KeyLike, KeyRange, RangeLike, SelectorRange};
pub use transaction::{RangeIterator, RangeResult, Transaction};

// Engine types that appear in the public API.
pub use tinyfdb_engine::{KeySelector, KeyValue, RangeOptions, StreamingMode};
