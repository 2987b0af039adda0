//! Key-like and range-like arguments.
//!
//! The public surface accepts two shapes of key input (raw packed bytes
//! or tuples) and two shapes of range input (a pair of keys or a pair of
//! selectors). [`KeyLike`] and [`RangeLike`] flatten those into the one
//! form the engine understands. Tuples satisfy both.

use tinyfdb_engine::KeySelector;
use tinyfdb_tuple::{Tuple, TupleError};

/// A packed key in its raw byte form.
pub type Key = Vec<u8>;

/// Anything usable as a key: produces the packed byte form.
pub trait KeyLike {
    /// The packed key bytes.
    fn to_key(&self) -> Result<Vec<u8>, TupleError>;
}

impl KeyLike for Vec<u8> {
    fn to_key(&self) -> Result<Vec<u8>, TupleError> {
        Ok(self.clone())
    }
}

impl KeyLike for &Vec<u8> {
    fn to_key(&self) -> Result<Vec<u8>, TupleError> {
        Ok((*self).clone())
    }
}

impl KeyLike for &[u8] {
    fn to_key(&self) -> Result<Vec<u8>, TupleError> {
        Ok(self.to_vec())
    }
}

impl<const N: usize> KeyLike for &[u8; N] {
    fn to_key(&self) -> Result<Vec<u8>, TupleError> {
        Ok(self.to_vec())
    }
}

impl KeyLike for Tuple {
    fn to_key(&self) -> Result<Vec<u8>, TupleError> {
        self.pack()
    }
}

impl KeyLike for &Tuple {
    fn to_key(&self) -> Result<Vec<u8>, TupleError> {
        self.pack()
    }
}

/// Anything usable as a range: produces the two bound selectors.
pub trait RangeLike {
    /// Begin and end selectors of the half-open range.
    fn to_selectors(&self) -> Result<(KeySelector, KeySelector), TupleError>;
}

/// A half-open range `[begin, end)` between two keys.
#[derive(Debug, Clone, Copy)]
pub struct KeyRange<B, E> {
    /// Inclusive beginning of the range.
    pub begin: B,
    /// Exclusive end of the range.
    pub end: E,
}

impl<B: KeyLike, E: KeyLike> RangeLike for KeyRange<B, E> {
    fn to_selectors(&self) -> Result<(KeySelector, KeySelector), TupleError> {
        Ok((
            KeySelector::first_greater_or_equal(self.begin.to_key()?),
            KeySelector::first_greater_or_equal(self.end.to_key()?),
        ))
    }
}

/// A range described directly by two selectors.
#[derive(Debug, Clone)]
pub struct SelectorRange {
    /// Selector resolving the inclusive beginning.
    pub begin: KeySelector,
    /// Selector resolving the exclusive end.
    pub end: KeySelector,
}

impl RangeLike for SelectorRange {
    fn to_selectors(&self) -> Result<(KeySelector, KeySelector), TupleError> {
        Ok((self.begin.clone(), self.end.clone()))
    }
}

/// A tuple ranges over every tuple it strictly prefixes.
impl RangeLike for Tuple {
    fn to_selectors(&self) -> Result<(KeySelector, KeySelector), TupleError> {
        let (begin, end) = self.range_keys()?;
        Ok((
            KeySelector::first_greater_or_equal(begin),
            KeySelector::first_greater_or_equal(end),
        ))
    }
}

impl RangeLike for &Tuple {
    fn to_selectors(&self) -> Result<(KeySelector, KeySelector), TupleError> {
        (*self).to_selectors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bytes_pass_through() {
        assert_eq!(b"\x15\x01".to_key().unwrap(), vec![0x15, 0x01]);
        assert_eq!(vec![0x00u8].to_key().unwrap(), vec![0x00]);
    }

    #[test]
    fn tuples_pack() {
        let t = Tuple::new().push("k");
        assert_eq!(t.to_key().unwrap(), t.pack().unwrap());
    }

    #[test]
    fn key_range_resolves_to_first_greater_or_equal() {
        let (begin, end) = KeyRange {
            begin: b"\x15\x01",
            end: b"\x15\x04",
        }
        .to_selectors()
        .unwrap();
        assert_eq!(begin, KeySelector::first_greater_or_equal(vec![0x15, 0x01]));
        assert_eq!(end, KeySelector::first_greater_or_equal(vec![0x15, 0x04]));
    }

    #[test]
    fn tuple_range_brackets_strict_extensions() {
        let t = Tuple::new().push("p");
        let (begin, end) = t.to_selectors().unwrap();
        let packed = t.pack().unwrap();
        assert!(begin.key.as_slice() > packed.as_slice());
        assert!(end.key.as_slice() > begin.key.as_slice());
    }
}
