//! # Bit Indexer
//!
//! Tracks which storage blocks of an archetype are full.
//!
//! One bit per block: 1 = full, 0 = has room. Finding a block with room is a
//! scan for the first word that is not all ones, then `trailing_zeros`.

/// Bitset over block indices.
#[derive(Clone, Debug, Default)]
pub struct BitIndexer {
    /// 64 blocks per u64.
    bits: Vec<u64>,
    /// Number of indices tracked.
    tracking: usize,
    /// Cached count of set bits.
    set_count: usize,
}

impl BitIndexer {
    /// Creates an indexer tracking `tracking` indices, all unset.
    #[must_use]
    pub fn new(tracking: usize) -> Self {
        Self {
            bits: vec![0u64; (tracking + 63) / 64],
            tracking,
            set_count: 0,
        }
    }

    /// Number of tracked indices.
    #[inline]
    #[must_use]
    pub const fn tracking(&self) -> usize {
        self.tracking
    }

    /// Number of set indices.
    #[inline]
    #[must_use]
    pub const fn set_count(&self) -> usize {
        self.set_count
    }

    /// Marks an index. Out-of-range indices are ignored.
    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.tracking, "Index out of bounds");
        if index >= self.tracking {
            return;
        }
        let mask = 1u64 << (index % 64);
        let word = &mut self.bits[index / 64];
        if *word & mask == 0 {
            *word |= mask;
            self.set_count += 1;
        }
    }

    /// Clears an index. Out-of-range indices are ignored.
    #[inline]
    pub fn unset(&mut self, index: usize) {
        if index >= self.tracking {
            return;
        }
        let mask = 1u64 << (index % 64);
        let word = &mut self.bits[index / 64];
        if *word & mask != 0 {
            *word &= !mask;
            self.set_count -= 1;
        }
    }

    /// Checks if an index is set.
    #[inline]
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        index < self.tracking && (self.bits[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Returns the lowest unset index, if any.
    #[inline]
    #[must_use]
    pub fn first_unset(&self) -> Option<usize> {
        if self.set_count == self.tracking {
            return None;
        }
        self.bits
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(i, word)| i * 64 + (!word).trailing_zeros() as usize)
            .filter(|index| *index < self.tracking)
    }

    /// Extends tracking to `tracking` indices. New indices start unset.
    ///
    /// Shrinking is not supported; a smaller value is ignored.
    pub fn grow(&mut self, tracking: usize) {
        if tracking <= self.tracking {
            return;
        }
        self.bits.resize((tracking + 63) / 64, 0);
        self.tracking = tracking;
    }
}

/// Yields the indices of set bits in a word, lowest first.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SetBits(pub(crate) u64);

impl Iterator for SetBits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_unset_skips_full() {
        let mut indexer = BitIndexer::new(130);
        assert_eq!(indexer.first_unset(), Some(0));

        for i in 0..70 {
            indexer.set(i);
        }
        assert_eq!(indexer.first_unset(), Some(70));
        assert_eq!(indexer.set_count(), 70);

        indexer.unset(3);
        assert_eq!(indexer.first_unset(), Some(3));
        assert!(!indexer.is_set(3));
        assert!(indexer.is_set(4));
    }

    #[test]
    fn test_all_set_returns_none() {
        let mut indexer = BitIndexer::new(5);
        for i in 0..5 {
            indexer.set(i);
        }
        assert_eq!(indexer.first_unset(), None);

        indexer.grow(10);
        assert_eq!(indexer.tracking(), 10);
        assert_eq!(indexer.first_unset(), Some(5));
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut indexer = BitIndexer::new(8);
        indexer.set(2);
        indexer.set(2);
        assert_eq!(indexer.set_count(), 1);
        indexer.unset(2);
        indexer.unset(2);
        assert_eq!(indexer.set_count(), 0);
    }

    #[test]
    fn test_set_bits_iteration() {
        let bits: Vec<usize> = SetBits(0b1010_0001).collect();
        assert_eq!(bits, vec![0, 5, 7]);
        assert_eq!(SetBits(0).count(), 0);
    }
}
