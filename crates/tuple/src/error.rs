//! Error type for tuple packing and unpacking.

use thiserror::Error;

/// Errors produced by the tuple codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TupleError {
    /// The encoded input ended in the middle of an element.
    #[error("truncated tuple encoding at offset {0}")]
    Truncated(usize),

    /// The input contains a byte that is not a known element type code.
    #[error("unknown element type code {code:#04x} at offset {offset}")]
    UnknownTypeCode {
        /// The offending byte.
        code: u8,
        /// Byte offset of the code in the input.
        offset: usize,
    },

    /// A string element holds bytes that are not valid UTF-8.
    #[error("string element is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// An integer magnitude does not fit the arbitrary-precision encoding.
    #[error("integer magnitude of {0} bytes exceeds the encodable maximum of 255")]
    IntTooLarge(usize),

    /// `pack` was called on a tuple holding an incomplete versionstamp.
    #[error("tuple contains an incomplete versionstamp; use pack_with_versionstamp")]
    IncompleteVersionstamp,

    /// More than one incomplete versionstamp is present.
    #[error("tuple contains more than one incomplete versionstamp")]
    MultipleIncompleteVersionstamps,

    /// `pack_with_versionstamp` was called without an incomplete versionstamp.
    #[error("tuple contains no incomplete versionstamp")]
    MissingVersionstamp,
}
