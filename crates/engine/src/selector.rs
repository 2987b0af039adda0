//! Key selectors and the stateful selector resolver.
//!
//! A selector names a key by its relation to a reference key. Resolving
//! one against the store needs a one-item look-ahead: "last key less
//! than K" is only known once a key at or past K shows up, at which
//! point the answer is the *previous* candidate.

use std::cmp::Ordering;

/// A key named relative to a reference key.
///
/// With `offset >= 1`: skip to the first key past `key` (strictly past
/// when `or_equal`, at-or-past otherwise), then `offset - 1` keys
/// further. With `offset == 0`: the last key before `key` (at-or-before
/// when `or_equal`, strictly before otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySelector {
    /// Reference key, in packed byte form.
    pub key: Vec<u8>,
    /// Flips which side of `key` the reference predicate includes.
    pub or_equal: bool,
    /// How many keys past (or before) the reference to select.
    pub offset: i32,
}

impl KeySelector {
    /// The least key at or past `key`.
    pub fn first_greater_or_equal(key: impl Into<Vec<u8>>) -> Self {
        KeySelector {
            key: key.into(),
            or_equal: false,
            offset: 1,
        }
    }

    /// The least key strictly past `key`.
    pub fn first_greater_than(key: impl Into<Vec<u8>>) -> Self {
        KeySelector {
            key: key.into(),
            or_equal: true,
            offset: 1,
        }
    }

    /// The greatest key strictly before `key`.
    pub fn last_less_than(key: impl Into<Vec<u8>>) -> Self {
        KeySelector {
            key: key.into(),
            or_equal: false,
            offset: 0,
        }
    }

    /// The greatest key at or before `key`.
    pub fn last_less_or_equal(key: impl Into<Vec<u8>>) -> Self {
        KeySelector {
            key: key.into(),
            or_equal: true,
            offset: 0,
        }
    }
}

/// Outcome of feeding one candidate to a [`KeyMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchResult {
    /// Keep feeding candidates.
    NoMatch,
    /// The previous candidate is the selected key.
    MatchPrev,
    /// The candidate just fed is the selected key.
    MatchCurrent,
}

/// Stateful resolver for one [`KeySelector`].
///
/// Expects a monotonically non-decreasing candidate stream (non-
/// increasing in reverse mode). After the first non-`NoMatch` result the
/// matcher must not be fed again; if the stream runs dry first, call
/// [`KeyMatcher::end`].
#[derive(Debug)]
pub(crate) struct KeyMatcher {
    sel: KeySelector,
    /// Inverts every comparison, for descending candidate streams.
    reverse: bool,
    advanced: i32,
    has_prev: bool,
}

impl KeyMatcher {
    pub(crate) fn new(sel: KeySelector, reverse: bool) -> Self {
        KeyMatcher {
            sel,
            reverse,
            advanced: 0,
            has_prev: false,
        }
    }

    pub(crate) fn feed(&mut self, key: &[u8]) -> MatchResult {
        let mut cmp = key.cmp(self.sel.key.as_slice());
        if self.reverse {
            cmp = cmp.reverse();
        }

        if self.sel.offset == 0 {
            // Looking for the last earlier (or equal) key.
            self.has_prev = cmp == Ordering::Less || (self.sel.or_equal && cmp == Ordering::Equal);
            if self.has_prev {
                MatchResult::NoMatch
            } else {
                MatchResult::MatchPrev
            }
        } else {
            // Looking for the first later (or equal) key.
            if cmp == Ordering::Less || (self.sel.or_equal && cmp == Ordering::Equal) {
                return MatchResult::NoMatch;
            }
            self.advanced += 1;
            if self.advanced < self.sel.offset {
                MatchResult::NoMatch
            } else {
                MatchResult::MatchCurrent
            }
        }
    }

    /// Resolve a stream that ended without a match. May answer
    /// `MatchPrev`, never `MatchCurrent`.
    pub(crate) fn end(&mut self) -> MatchResult {
        if self.has_prev {
            self.has_prev = false;
            MatchResult::MatchPrev
        } else {
            MatchResult::NoMatch
        }
    }
}
