//! Convenience re-exports for the common surface.
//!
//! ```
//! use tinyfdb::prelude::*;
//!
//! let db = Database::open_default();
//! # let _ = db;
//! ```

pub use crate::tuple::{Element, Tuple};
pub use crate::{
    Database, Error, KeyRange, KeySelector, KeyValue, RangeOptions, Result, SelectorRange,
    StreamingMode, Transaction,
};
