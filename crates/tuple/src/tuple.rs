//! The tuple type: an ordered sequence of elements with a total order and
//! an order-preserving binary encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::TupleError;
use crate::{pack, unpack};

/// An ordered sequence of heterogeneous elements.
///
/// Tuples compare element-wise; when one tuple is a prefix of the other,
/// the shorter sorts first. The packed byte form preserves this order
/// exactly, so sorting packed keys and sorting tuples agree.
///
/// # Example
///
/// ```
/// use tinyfdb_tuple::Tuple;
///
/// let t = Tuple::new().push("users").push(42i64);
/// let packed = t.pack().unwrap();
/// assert_eq!(Tuple::unpack(&packed).unwrap(), t);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple(Vec<Element>);

impl Tuple {
    /// An empty tuple. Sorts before every non-empty tuple.
    pub fn new() -> Self {
        Tuple(Vec::new())
    }

    /// Build from an element vector.
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Tuple(elements)
    }

    /// Append one element, builder style.
    pub fn push(mut self, element: impl Into<Element>) -> Self {
        self.0.push(element.into());
        self
    }

    /// The elements in order.
    pub fn elements(&self) -> &[Element] {
        &self.0
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the tuple has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.0.iter()
    }

    /// Encode into the order-preserving byte form.
    ///
    /// Fails if the tuple holds an incomplete versionstamp; those must go
    /// through [`Tuple::pack_with_versionstamp`].
    pub fn pack(&self) -> Result<Vec<u8>, TupleError> {
        pack::pack_tuple(self)
    }

    /// Encode for a versionstamp operation: exactly one incomplete
    /// versionstamp must be present, and its byte offset (relative to the
    /// start of `prefix`) is appended as a little-endian u32 trailer.
    pub fn pack_with_versionstamp(&self, prefix: &[u8]) -> Result<Vec<u8>, TupleError> {
        pack::pack_tuple_with_versionstamp(self, prefix)
    }

    /// Whether exactly one incomplete versionstamp is present. More than
    /// one is an error.
    pub fn has_incomplete_versionstamp(&self) -> Result<bool, TupleError> {
        let n = pack::count_incomplete_versionstamps(self.elements());
        if n > 1 {
            return Err(TupleError::MultipleIncompleteVersionstamps);
        }
        Ok(n == 1)
    }

    /// Decode a packed tuple.
    ///
    /// Integers normalize to the smallest arm that holds the value
    /// ([`Element::Int`], then [`Element::Uint`], then
    /// [`Element::BigInt`]), so `unpack(pack(t))` equals `t` under the
    /// structural comparator.
    pub fn unpack(bytes: &[u8]) -> Result<Tuple, TupleError> {
        unpack::unpack_tuple(bytes)
    }

    /// Byte bounds of the half-open key range covering every tuple this
    /// tuple strictly prefixes. The end bound is a range marker, not
    /// itself a packed tuple.
    pub fn range_keys(&self) -> Result<(Vec<u8>, Vec<u8>), TupleError> {
        let packed = self.pack()?;
        let mut begin = packed.clone();
        begin.push(0x00);
        let mut end = packed;
        end.push(0xFF);
        Ok((begin, end))
    }
}

impl From<Vec<Element>> for Tuple {
    fn from(elements: Vec<Element>) -> Self {
        Tuple(elements)
    }
}

impl FromIterator<Element> for Tuple {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Tuple(iter.into_iter().collect())
    }
}

impl IntoIterator for Tuple {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, ")")
    }
}
