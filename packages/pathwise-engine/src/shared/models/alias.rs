//! Approximate alias signatures
//!
//! An `AliasSig` is the opaque identity of a heap location as supplied by
//! the points-to provider: a set of abstract object identifiers. The engine
//! only ever intersects and compares signatures; it never interprets the
//! identifiers. An empty signature means the provider had nothing for the
//! location (typical for primitive-typed and static fields), in which case
//! the owning field alone identifies the location.

use rustc_hash::FxHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Value-typed approximate identity of a heap location
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AliasSig {
    ids: BTreeSet<u64>,
}

impl AliasSig {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Signature with no points-to information
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Non-empty overlap test; empty signatures never intersect anything
    pub fn intersects(&self, other: &AliasSig) -> bool {
        if self.ids.len() > other.ids.len() {
            return other.intersects(self);
        }
        self.ids.iter().any(|id| other.ids.contains(id))
    }

    /// Stable discriminator for symbol strings; identical across runs for
    /// identical signatures (the set is ordered)
    pub fn discriminator(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for id in &self.ids {
            id.hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl fmt::Display for AliasSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{{}}")
        } else {
            write!(f, "{{{:x}}}", self.discriminator())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_requires_overlap() {
        let a = AliasSig::new([1, 2, 3]);
        let b = AliasSig::new([3, 4]);
        let c = AliasSig::new([5]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn empty_never_intersects() {
        let a = AliasSig::new([1]);
        let empty = AliasSig::empty();
        assert!(!empty.intersects(&a));
        assert!(!a.intersects(&empty));
        assert!(!empty.intersects(&AliasSig::empty()));
    }

    #[test]
    fn discriminator_is_order_independent() {
        let a = AliasSig::new([7, 1, 9]);
        let b = AliasSig::new([9, 7, 1]);
        assert_eq!(a.discriminator(), b.discriminator());
    }
}
