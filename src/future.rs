//! Eager futures.
//!
//! Every operation completes while it runs; these wrappers only preserve
//! the shape of an asynchronous API so callers keep their blocking-get
//! call sites. `block_until_ready` is a no-op and `is_ready` is always
//! true.

use crate::error::Result;

/// A future holding an optional value, ready on construction.
#[derive(Debug, Clone)]
pub struct FutureValue {
    result: Result<Option<Vec<u8>>>,
}

impl FutureValue {
    pub(crate) fn ready(result: Result<Option<Vec<u8>>>) -> Self {
        FutureValue { result }
    }

    /// The value (`None` when the key is absent or deleted), or the error
    /// of the operation that produced this future.
    pub fn get(&self) -> Result<Option<Vec<u8>>> {
        self.result.clone()
    }

    /// Blocks until the future is ready. Always a no-op here.
    pub fn block_until_ready(&self) {}

    /// Whether the future is ready. Always true.
    pub fn is_ready(&self) -> bool {
        true
    }
}

/// A future holding only completion, ready on construction.
#[derive(Debug, Clone)]
pub struct FutureUnit {
    result: Result<()>,
}

impl FutureUnit {
    pub(crate) fn ready(result: Result<()>) -> Self {
        FutureUnit { result }
    }

    /// The error of the operation that produced this future, if any.
    pub fn get(&self) -> Result<()> {
        self.result.clone()
    }

    /// Blocks until the future is ready. Always a no-op here.
    pub fn block_until_ready(&self) {}

    /// Whether the future is ready. Always true.
    pub fn is_ready(&self) -> bool {
        true
    }
}
