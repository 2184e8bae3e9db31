//! Hexside bit encoding.
//!
//! Every hexside a route can use gets a bit position the first time it is
//! seen. A route's track then becomes a small array of 32-bit words, and
//! two routes share track exactly when their arrays intersect.
//!
//! Routes that use no hexside at all (a single path between two nodes on
//! one tile, or a route that is only one city) are encoded by their node
//! keys instead. That keeps them from colliding with each other, at the
//! cost of reporting a conflict for two such routes that merely share a
//! city.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use tinyvec::TinyVec;

use crate::board::{EdgeId, NodeId};

const WORD_BITS: u32 = 32;

/// Key for one bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HexsideKey {
    Edge(EdgeId),
    Node(NodeId),
}

/// A growable set of bit positions.
///
/// Equality and hashing ignore trailing zero words, so a field that grew
/// and was never set past its old length still matches a shorter one.
#[derive(Clone, Default)]
pub struct Bitfield {
    words: TinyVec<[u32; 8]>,
}

impl Bitfield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bit(&mut self, bit: u32) {
        let word = (bit / WORD_BITS) as usize;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u32 << (bit % WORD_BITS);
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.words
            .get((bit / WORD_BITS) as usize)
            .is_some_and(|word| word & (1u32 << (bit % WORD_BITS)) != 0)
    }

    /// Whether any bit is set in both fields.
    pub fn conflicts(&self, other: &Bitfield) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Union of both fields, as long as the longer input.
    pub fn merge(&self, other: &Bitfield) -> Bitfield {
        let mut merged = self.clone();
        merged.merge_in(other);
        merged
    }

    pub fn merge_in(&mut self, other: &Bitfield) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= *theirs;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Number of set bits.
    pub fn count(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// Iterates the set bit positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..WORD_BITS)
                .filter(move |&bit| word & (1u32 << bit) != 0)
                .map(move |bit| index as u32 * WORD_BITS + bit)
        })
    }

    /// The words up to and including the last non-zero one.
    pub fn words(&self) -> &[u32] {
        let len = self
            .words
            .iter()
            .rposition(|word| *word != 0)
            .map_or(0, |last| last + 1);
        &self.words[..len]
    }
}

impl PartialEq for Bitfield {
    fn eq(&self, other: &Self) -> bool {
        self.words() == other.words()
    }
}

impl Eq for Bitfield {}

impl Hash for Bitfield {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words().hash(state);
    }
}

impl fmt::Debug for Bitfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u32> for Bitfield {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut field = Bitfield::new();
        for bit in iter {
            field.set_bit(bit);
        }
        field
    }
}

/// Assigns bit positions to hexside keys on first sight.
///
/// One table is shared by every route of a computation so that equal track
/// always encodes to equal bits.
#[derive(Debug, Default)]
pub struct HexsideBits {
    bits: HashMap<HexsideKey, u32>,
    next: u32,
}

impl HexsideBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bit for `key`, assigning the next free one if unseen.
    pub fn bit_for(&mut self, key: HexsideKey) -> u32 {
        let next = &mut self.next;
        *self.bits.entry(key).or_insert_with(|| {
            let bit = *next;
            *next += 1;
            bit
        })
    }

    #[cfg(test)]
    fn get(&self, key: HexsideKey) -> Option<u32> {
        self.bits.get(&key).copied()
    }

    pub fn encode(&mut self, keys: impl IntoIterator<Item = HexsideKey>) -> Bitfield {
        let mut field = Bitfield::new();
        for key in keys {
            field.set_bit(self.bit_for(key));
        }
        field
    }

    /// Number of distinct keys assigned so far.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn set_and_contains_across_words() {
        let mut field = Bitfield::new();
        field.set_bit(3);
        field.set_bit(40);
        field.set_bit(300);

        assert!(field.contains(3));
        assert!(field.contains(40));
        assert!(field.contains(300));
        assert!(!field.contains(4));
        assert!(!field.contains(1000));
        assert_eq!(field.count(), 3);
        assert_eq!(field.iter().collect::<Vec<_>>(), vec![3, 40, 300]);
    }

    #[test]
    fn conflicts_only_on_shared_bits() {
        let a: Bitfield = [1, 33].into_iter().collect();
        let b: Bitfield = [2, 34].into_iter().collect();
        let c: Bitfield = [33].into_iter().collect();

        assert!(!a.conflicts(&b));
        assert!(a.conflicts(&c));
        assert!(c.conflicts(&a));
        assert!(!Bitfield::new().conflicts(&a));
    }

    #[test]
    fn merge_keeps_longer_length() {
        let short: Bitfield = [1].into_iter().collect();
        let long: Bitfield = [100].into_iter().collect();

        let merged = short.merge(&long);
        assert!(merged.contains(1));
        assert!(merged.contains(100));
        assert_eq!(merged.words().len(), 4);
        assert_eq!(merged, long.merge(&short));
    }

    #[test]
    fn equality_ignores_trailing_zero_words() {
        let mut padded = Bitfield::new();
        padded.words.resize(8, 0);
        let mut grown: Bitfield = [5].into_iter().collect();
        grown.merge_in(&padded);
        let plain: Bitfield = [5].into_iter().collect();

        assert_eq!(grown, plain);
        let set: HashSet<Bitfield> = [grown, plain].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn table_assigns_stable_bits() {
        let mut table = HexsideBits::new();
        let a = table.bit_for(HexsideKey::Edge(EdgeId(7)));
        let b = table.bit_for(HexsideKey::Node(NodeId(7)));
        let again = table.bit_for(HexsideKey::Edge(EdgeId(7)));

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(again, a);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(HexsideKey::Node(NodeId(7))), Some(1));
        assert_eq!(table.get(HexsideKey::Node(NodeId(8))), None);
    }

    #[test]
    fn encode_is_order_independent() {
        let mut table = HexsideBits::new();
        let forward = table.encode([
            HexsideKey::Edge(EdgeId(1)),
            HexsideKey::Edge(EdgeId(2)),
        ]);
        let backward = table.encode([
            HexsideKey::Edge(EdgeId(2)),
            HexsideKey::Edge(EdgeId(1)),
        ]);
        assert_eq!(forward, backward);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn bits() -> impl Strategy<Value = BTreeSet<u32>> {
        proptest::collection::btree_set(0u32..512, 0..24)
    }

    proptest! {
        /// Conflict is exactly set intersection.
        #[test]
        fn conflicts_matches_intersection(a in bits(), b in bits()) {
            let fa: Bitfield = a.iter().copied().collect();
            let fb: Bitfield = b.iter().copied().collect();
            prop_assert_eq!(fa.conflicts(&fb), !a.is_disjoint(&b));
        }

        /// Merge is set union.
        #[test]
        fn merge_matches_union(a in bits(), b in bits()) {
            let fa: Bitfield = a.iter().copied().collect();
            let fb: Bitfield = b.iter().copied().collect();
            let union: Vec<u32> = a.union(&b).copied().collect();
            prop_assert_eq!(fa.merge(&fb).iter().collect::<Vec<_>>(), union);
        }

        /// A merged field conflicts with anything either input conflicts with.
        #[test]
        fn merge_preserves_conflicts(a in bits(), b in bits(), c in bits()) {
            let fa: Bitfield = a.iter().copied().collect();
            let fb: Bitfield = b.iter().copied().collect();
            let fc: Bitfield = c.iter().copied().collect();
            let merged = fa.merge(&fb);
            prop_assert_eq!(
                merged.conflicts(&fc),
                fa.conflicts(&fc) || fb.conflicts(&fc)
            );
        }

        /// Equal bit sets compare and count equal however they were built.
        #[test]
        fn insertion_order_is_irrelevant(a in bits()) {
            let forward: Bitfield = a.iter().copied().collect();
            let backward: Bitfield = a.iter().rev().copied().collect();
            prop_assert_eq!(forward.count() as usize, a.len());
            prop_assert_eq!(forward, backward);
        }
    }
}
