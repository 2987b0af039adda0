//! Order-preserving tuple codec, bit-compatible with the FoundationDB
//! Tuple Layer.
//!
//! A [`Tuple`] is a sequence of heterogeneous [`Element`]s with two faces:
//!
//! 1. **Structural comparison** without encoding: `Tuple` and `Element`
//!    implement a total `Ord`.
//! 2. **An order-preserving binary encoding**: for any two packable tuples,
//!    comparing the tuples and comparing their packed bytes give the same
//!    sign, and `unpack(pack(t))` equals `t` modulo integer normalization.
//!
//! The agreement of those two faces is what the rest of the system leans
//! on: stored keys can be ordered as raw bytes while the public surface
//! talks tuples.

#![warn(missing_docs)]

mod element;
mod error;
mod pack;
mod tuple;
mod unpack;

pub use element::{BigInt, Element, Versionstamp, INCOMPLETE_TRANSACTION_VERSION};
pub use error::TupleError;
pub use tuple::Tuple;
