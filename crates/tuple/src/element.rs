//! The tuple element union and its total order.
//!
//! Every value that can appear in a tuple is one arm of [`Element`]. The
//! `Ord` implementation is the structural comparator: elements of the same
//! class compare by their native order, elements of different classes
//! compare by a fixed rank table. The ranks are the wire type codes, which
//! is what makes structural order and packed byte order agree bit-exactly.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Tuple;

/// Transaction-version bytes marking a versionstamp as incomplete.
///
/// The real version is filled in at commit time by a cluster; this library
/// only recognizes the marker so keys carrying it are handled explicitly.
pub const INCOMPLETE_TRANSACTION_VERSION: [u8; 10] = [0xFF; 10];

/// A FoundationDB versionstamp: a 10-byte transaction version ordered
/// before a 2-byte user version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Versionstamp {
    /// Commit-time transaction version. All `0xFF` means incomplete.
    pub transaction_version: [u8; 10],
    /// Application-chosen ordering within a transaction.
    pub user_version: u16,
}

impl Versionstamp {
    /// A versionstamp with a known transaction version.
    pub fn complete(transaction_version: [u8; 10], user_version: u16) -> Self {
        Versionstamp {
            transaction_version,
            user_version,
        }
    }

    /// The incomplete marker, to be completed at commit time.
    pub fn incomplete(user_version: u16) -> Self {
        Versionstamp {
            transaction_version: INCOMPLETE_TRANSACTION_VERSION,
            user_version,
        }
    }

    /// Whether the transaction version has been filled in.
    pub fn is_complete(&self) -> bool {
        self.transaction_version != INCOMPLETE_TRANSACTION_VERSION
    }
}

impl fmt::Display for Versionstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Versionstamp(")?;
        for b in &self.transaction_version {
            write!(f, "{b:02x}")?;
        }
        write!(f, ", {})", self.user_version)
    }
}

/// An arbitrary-precision integer as sign plus big-endian magnitude.
///
/// The codec never does arithmetic on these; compare, encode and decode
/// only need the raw magnitude bytes. Zero is canonically non-negative
/// with an empty magnitude.
#[derive(Debug, Clone, Hash, Serialize, Deserialize)]
pub struct BigInt {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigInt {
    /// Build from a sign and big-endian magnitude, trimming leading zeros.
    pub fn new(negative: bool, magnitude: impl Into<Vec<u8>>) -> Self {
        let mut magnitude = magnitude.into();
        let zeros = magnitude.iter().take_while(|b| **b == 0).count();
        magnitude.drain(..zeros);
        BigInt {
            negative: negative && !magnitude.is_empty(),
            magnitude,
        }
    }

    /// True when the value is zero.
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// True for values below zero.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Big-endian magnitude without leading zeros.
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }
}

impl From<i64> for BigInt {
    fn from(v: i64) -> Self {
        BigInt::new(v < 0, v.unsigned_abs().to_be_bytes())
    }
}

impl From<u64> for BigInt {
    fn from(v: u64) -> Self {
        BigInt::new(false, v.to_be_bytes())
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "0x")?;
        if self.magnitude.is_empty() {
            return write!(f, "00");
        }
        for b in &self.magnitude {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// One element of a tuple.
///
/// Equality follows the structural comparator, so integer arms that encode
/// to the same bytes are equal: `Element::Int(5) == Element::Uint(5)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    /// The null element; sorts before everything else.
    Nil,
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer, for values above `i64::MAX`.
    Uint(u64),
    /// Arbitrary-precision integer, for values outside 64 bits.
    BigInt(BigInt),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// Unicode string.
    String(String),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// 16-byte UUID.
    Uuid(Uuid),
    /// Versionstamp.
    Versionstamp(Versionstamp),
    /// Nested tuple.
    Tuple(Tuple),
}

impl Element {
    /// Cross-class rank, taken from the wire type codes so that rank order
    /// and encoded byte order always agree. The three integer arms share
    /// the zero-integer code because they share one encoding family.
    fn type_rank(&self) -> u8 {
        match self {
            Element::Nil => 0x00,
            Element::Bytes(_) => 0x01,
            Element::String(_) => 0x02,
            Element::Tuple(_) => 0x05,
            Element::Int(_) | Element::Uint(_) | Element::BigInt(_) => 0x14,
            Element::Float(_) => 0x20,
            Element::Double(_) => 0x21,
            Element::Bool(_) => 0x26,
            Element::Uuid(_) => 0x30,
            Element::Versionstamp(_) => 0x33,
        }
    }

    fn is_int(&self) -> bool {
        matches!(
            self,
            Element::Int(_) | Element::Uint(_) | Element::BigInt(_)
        )
    }

    /// Sign and big-endian magnitude of an integer arm.
    pub(crate) fn int_sign_magnitude(&self) -> (i8, Cow<'_, [u8]>) {
        fn trimmed(bytes: [u8; 8]) -> Cow<'static, [u8]> {
            let zeros = bytes.iter().take_while(|b| **b == 0).count();
            Cow::Owned(bytes[zeros..].to_vec())
        }

        match self {
            Element::Int(0) => (0, Cow::Borrowed(&[])),
            Element::Int(i) if *i > 0 => (1, trimmed((*i as u64).to_be_bytes())),
            Element::Int(i) => (-1, trimmed(i.unsigned_abs().to_be_bytes())),
            Element::Uint(0) => (0, Cow::Borrowed(&[])),
            Element::Uint(u) => (1, trimmed(u.to_be_bytes())),
            Element::BigInt(b) if b.is_zero() => (0, Cow::Borrowed(&[])),
            Element::BigInt(b) => {
                let sign = if b.is_negative() { -1 } else { 1 };
                (sign, Cow::Borrowed(b.magnitude()))
            }
            _ => unreachable!("int_sign_magnitude on non-integer element"),
        }
    }
}

fn cmp_int(a: &Element, b: &Element) -> Ordering {
    let (sa, ma) = a.int_sign_magnitude();
    let (sb, mb) = b.int_sign_magnitude();
    match sa.cmp(&sb) {
        Ordering::Equal => {}
        other => return other,
    }
    // Same sign: longer magnitude means larger absolute value.
    let by_magnitude = ma
        .len()
        .cmp(&mb.len())
        .then_with(|| ma.as_ref().cmp(mb.as_ref()));
    if sa < 0 {
        by_magnitude.reverse()
    } else {
        by_magnitude
    }
}

/// Bit pattern of an f32 under the order-preserving sign transform.
pub(crate) fn f32_order_bits(f: f32) -> u32 {
    let bits = f.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000
    }
}

/// Bit pattern of an f64 under the order-preserving sign transform.
pub(crate) fn f64_order_bits(f: f64) -> u64 {
    let bits = f.to_bits();
    if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

impl Ord for Element {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Element::Nil, Element::Nil) => Ordering::Equal,
            (Element::Bytes(a), Element::Bytes(b)) => a.cmp(b),
            (Element::String(a), Element::String(b)) => a.cmp(b),
            (Element::Tuple(a), Element::Tuple(b)) => a.cmp(b),
            (Element::Float(a), Element::Float(b)) => {
                f32_order_bits(*a).cmp(&f32_order_bits(*b))
            }
            (Element::Double(a), Element::Double(b)) => {
                f64_order_bits(*a).cmp(&f64_order_bits(*b))
            }
            (Element::Bool(a), Element::Bool(b)) => a.cmp(b),
            (Element::Uuid(a), Element::Uuid(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Element::Versionstamp(a), Element::Versionstamp(b)) => a.cmp(b),
            (a, b) if a.is_int() && b.is_int() => cmp_int(a, b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Element {}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Nil => write!(f, "<nil>"),
            Element::Int(i) => write!(f, "{i}"),
            Element::Uint(u) => write!(f, "{u}"),
            Element::BigInt(b) => write!(f, "{b}"),
            Element::Bytes(bs) => {
                write!(f, "b\"")?;
                for b in bs {
                    write!(f, "\\x{b:02x}")?;
                }
                write!(f, "\"")
            }
            Element::String(s) => write!(f, "{s:?}"),
            Element::Float(v) => write!(f, "{v}"),
            Element::Double(v) => write!(f, "{v}"),
            Element::Bool(b) => write!(f, "{b}"),
            Element::Uuid(u) => write!(f, "UUID({u})"),
            Element::Versionstamp(v) => write!(f, "{v}"),
            Element::Tuple(t) => write!(f, "{t}"),
        }
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Element::Int(v)
    }
}

impl From<i32> for Element {
    fn from(v: i32) -> Self {
        Element::Int(v as i64)
    }
}

impl From<u64> for Element {
    fn from(v: u64) -> Self {
        if v <= i64::MAX as u64 {
            Element::Int(v as i64)
        } else {
            Element::Uint(v)
        }
    }
}

impl From<BigInt> for Element {
    fn from(v: BigInt) -> Self {
        Element::BigInt(v)
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::String(v.to_owned())
    }
}

impl From<String> for Element {
    fn from(v: String) -> Self {
        Element::String(v)
    }
}

impl From<Vec<u8>> for Element {
    fn from(v: Vec<u8>) -> Self {
        Element::Bytes(v)
    }
}

impl From<&[u8]> for Element {
    fn from(v: &[u8]) -> Self {
        Element::Bytes(v.to_vec())
    }
}

impl From<f32> for Element {
    fn from(v: f32) -> Self {
        Element::Float(v)
    }
}

impl From<f64> for Element {
    fn from(v: f64) -> Self {
        Element::Double(v)
    }
}

impl From<bool> for Element {
    fn from(v: bool) -> Self {
        Element::Bool(v)
    }
}

impl From<Uuid> for Element {
    fn from(v: Uuid) -> Self {
        Element::Uuid(v)
    }
}

impl From<Versionstamp> for Element {
    fn from(v: Versionstamp) -> Self {
        Element::Versionstamp(v)
    }
}

impl From<Tuple> for Element {
    fn from(v: Tuple) -> Self {
        Element::Tuple(v)
    }
}
