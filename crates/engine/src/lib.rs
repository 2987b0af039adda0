//! Transaction engine for tinyfdb.
//!
//! This crate implements the coupled core of the emulator:
//!
//! - [`Database`]: the versioned store, the live-transaction registry and
//!   the commit sequence, all behind one mutex.
//! - [`Transaction`]: optimistic concurrency control with per-key taints;
//!   write-write races surface as retryable errors at commit.
//! - [`KeySelector`] resolution and the snapshot [`RangeIterator`] with
//!   tombstone handling, limits and reverse iteration.

#![warn(missing_docs)]

mod database;
mod error;
mod iterator;
mod selector;
mod taint;
mod transaction;


pub use database::{Database, RaceSink};
pub use error::{Error, Result};
pub use iterator::{KeyValue, RangeIterator, RangeOptions, RangeResult, StreamingMode};
pub use selector::KeySelector;
pub use taint::{TaintSet, TaintTable};
pub use transaction::{Transaction, TxnStatus};
