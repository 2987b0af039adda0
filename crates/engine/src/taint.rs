//! Per-key taint flags and the per-transaction taint table.
//!
//! A taint records, for one key, that the owning transaction read it,
//! wrote it, and/or that a peer has since committed a write to it
//! (CONFLICT). Taint tables live inside the database mutex; the database
//! is their sole owner, including when a committing transaction tags its
//! peers.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use rustc_hash::FxHashMap;

/// A small flag set over {READ, WRITE, CONFLICT}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaintSet(u8);

impl TaintSet {
    /// The transaction read the key.
    pub const READ: TaintSet = TaintSet(1);
    /// The transaction wrote (or tombstoned) the key.
    pub const WRITE: TaintSet = TaintSet(1 << 1);
    /// A peer committed a write to the key after this transaction touched it.
    pub const CONFLICT: TaintSet = TaintSet(1 << 2);

    /// No flags.
    pub const fn empty() -> Self {
        TaintSet(0)
    }

    /// True when no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag of `other` is set in `self`.
    pub fn contains(self, other: TaintSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any flag of `other` is set in `self`.
    pub fn intersects(self, other: TaintSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Set the flags of `other`.
    pub fn insert(&mut self, other: TaintSet) {
        self.0 |= other.0;
    }

    /// The flags of `self` without those of `other`.
    #[must_use]
    pub fn without(self, other: TaintSet) -> TaintSet {
        TaintSet(self.0 & !other.0)
    }
}

impl BitOr for TaintSet {
    type Output = TaintSet;

    fn bitor(self, rhs: TaintSet) -> TaintSet {
        TaintSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for TaintSet {
    fn bitor_assign(&mut self, rhs: TaintSet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for TaintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        let mut first = true;
        for (flag, name) in [
            (TaintSet::READ, "read"),
            (TaintSet::WRITE, "write"),
            (TaintSet::CONFLICT, "conflict"),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Per-transaction taint state, keyed by canonical packed user key.
///
/// `taints` is ordered so commit walks and race dumps are deterministic.
/// `traces` is only populated while a race-trace sink is configured.
#[derive(Debug, Default)]
pub struct TaintTable {
    /// Flag set per key.
    pub taints: BTreeMap<Vec<u8>, TaintSet>,
    /// Captured call-site traces per key, for race diagnostics.
    pub traces: FxHashMap<Vec<u8>, Vec<String>>,
}
