//! # Composition Masks
//!
//! A [`CompositionMask`] is the canonical "set of component types" value.
//! It keys archetypes (exact match) and filters queries (superset test).
//!
//! ## Layout
//!
//! - `active_chunks`: one bit per 64-bit word that has any bit set
//! - `words`: the bit words, trimmed so the last word is never zero
//!
//! Because the representation is canonical, equality is plain word
//! comparison and the hash can be cached eagerly on every mutation.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ecs::{Component, ComponentCode, ComponentId, ComponentRegistry};
use crate::error::{EcsError, EcsResult};
use crate::memory::SetBits;

const HASH_SEED: u64 = 0xcbf2_9ce4_8422_2325;
const HASH_MULTIPLIER: u64 = 0x5170_cc1b_7272_20a9;

/// Growable bitset of component codes.
#[derive(Clone, Debug)]
pub struct CompositionMask {
    /// Bit `c` set iff `words[c] != 0`.
    active_chunks: u64,
    words: Vec<u64>,
    /// Cached hash of `words`, refreshed on every mutation.
    hash: u64,
}

impl CompositionMask {
    /// Creates an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active_chunks: 0,
            words: Vec::new(),
            hash: hash_words(&[]),
        }
    }

    /// Adds a code. Adding an already present code has no effect.
    ///
    /// # Returns
    ///
    /// `true` if the mask changed.
    pub fn add(&mut self, code: ComponentCode) -> bool {
        let (chunk, bit) = (code.chunk(), code.bit());
        if self.words.len() <= chunk {
            self.words.resize(chunk + 1, 0);
        }

        let mask = 1u64 << bit;
        if self.words[chunk] & mask != 0 {
            return false;
        }

        self.words[chunk] |= mask;
        self.active_chunks |= 1u64 << chunk;
        self.rehash();
        true
    }

    /// Removes a code. Removing an absent code has no effect.
    ///
    /// # Returns
    ///
    /// `true` if the mask changed.
    pub fn remove(&mut self, code: ComponentCode) -> bool {
        let (chunk, bit) = (code.chunk(), code.bit());
        let Some(word) = self.words.get_mut(chunk) else {
            return false;
        };

        let mask = 1u64 << bit;
        if *word & mask == 0 {
            return false;
        }

        *word &= !mask;
        if *word == 0 {
            self.active_chunks &= !(1u64 << chunk);
            while self.words.last() == Some(&0) {
                self.words.pop();
            }
        }
        self.rehash();
        true
    }

    /// Returns a copy of this mask with `code` added.
    #[must_use]
    pub fn with(mut self, code: ComponentCode) -> Self {
        self.add(code);
        self
    }

    /// Superset test: true iff every code in `other` is also in `self`.
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        if other.active_chunks & !self.active_chunks != 0 {
            return false;
        }
        other
            .words
            .iter()
            .enumerate()
            .filter(|(_, word)| **word != 0)
            .all(|(chunk, word)| {
                self.words
                    .get(chunk)
                    .is_some_and(|mine| mine & word == *word)
            })
    }

    /// Checks a single code.
    #[inline]
    #[must_use]
    pub fn contains_code(&self, code: ComponentCode) -> bool {
        self.words
            .get(code.chunk())
            .is_some_and(|word| (word >> code.bit()) & 1 == 1)
    }

    /// Exact equality of chunk activity and every bit word.
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.active_chunks == other.active_chunks && self.words == other.words
    }

    /// True if no code is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active_chunks == 0
    }

    /// Number of codes set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Bitset of non-empty chunk words.
    #[inline]
    #[must_use]
    pub const fn active_chunks(&self) -> u64 {
        self.active_chunks
    }

    /// The cached structural hash.
    #[inline]
    #[must_use]
    pub const fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Iterates over the codes in ascending id order.
    pub fn codes(&self) -> impl Iterator<Item = ComponentCode> + '_ {
        self.words.iter().enumerate().flat_map(|(chunk, &word)| {
            SetBits(word).filter_map(move |bit| ComponentCode::from_id(((chunk << 6) | bit) as ComponentId))
        })
    }

    /// Renders one chunk word as 64 binary digits, most significant first.
    #[must_use]
    pub fn chunk_bits(&self, chunk: usize) -> String {
        format!("{:064b}", self.words.get(chunk).copied().unwrap_or(0))
    }

    #[inline]
    fn rehash(&mut self) {
        self.hash = hash_words(&self.words);
    }
}

fn hash_words(words: &[u64]) -> u64 {
    let mut hash = HASH_SEED;
    for (chunk, word) in words.iter().enumerate() {
        if *word == 0 {
            continue;
        }
        hash = (hash.rotate_left(5) ^ (chunk as u64) ^ word).wrapping_mul(HASH_MULTIPLIER);
    }
    hash
}

impl Default for CompositionMask {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CompositionMask {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for CompositionMask {}

impl Hash for CompositionMask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl FromIterator<ComponentCode> for CompositionMask {
    fn from_iter<I: IntoIterator<Item = ComponentCode>>(iter: I) -> Self {
        let mut mask = Self::new();
        for code in iter {
            mask.add(code);
        }
        mask
    }
}

impl fmt::Display for CompositionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, code) in self.codes().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{code}")?;
        }
        write!(f, "}}")
    }
}

/// Chain-builds a mask from component types and validates it on `build`.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use slilib_ecs::{Component, ComponentRegistry};
///
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// let mut registry = ComponentRegistry::new(64, 128);
/// registry.register::<Health>().unwrap();
/// let mask = registry.mask_builder().with::<Health>().build().unwrap();
/// assert_eq!(mask.len(), 1);
/// ```
pub struct MaskBuilder<'a> {
    registry: &'a ComponentRegistry,
    mask: CompositionMask,
    /// First lookup failure; reported by `build`.
    error: Option<EcsError>,
}

impl<'a> MaskBuilder<'a> {
    /// Starts an empty mask against `registry`.
    #[must_use]
    pub fn new(registry: &'a ComponentRegistry) -> Self {
        Self {
            registry,
            mask: CompositionMask::new(),
            error: None,
        }
    }

    /// Adds the code of a registered component type.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        if self.error.is_none() {
            match self.registry.info_of::<T>() {
                Ok(info) => {
                    self.mask.add(info.code);
                }
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Adds the code of a registered component id.
    #[must_use]
    pub fn with_id(mut self, id: ComponentId) -> Self {
        if self.error.is_none() {
            match self.registry.info(id) {
                Ok(info) => {
                    self.mask.add(info.code);
                }
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Finishes the mask.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure, or [`EcsError::InvalidMask`] if the
    /// mask references components the registry does not know.
    pub fn build(self) -> EcsResult<CompositionMask> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.registry.valid_mask(&self.mask) {
            return Err(EcsError::InvalidMask);
        }
        Ok(self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};
    use std::collections::HashSet;

    #[allow(dead_code)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    #[repr(C)]
    struct Mass(f32);
    impl Component for Mass {}

    #[allow(dead_code)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    #[repr(C)]
    struct Charge(f32);
    impl Component for Charge {}

    fn code(id: ComponentId) -> ComponentCode {
        ComponentCode::from_id(id).unwrap()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut once = CompositionMask::new();
        once.add(code(5));

        let mut twice = CompositionMask::new();
        assert!(twice.add(code(5)));
        assert!(!twice.add(code(5)));

        assert_eq!(once, twice);
        assert_eq!(once.hash_value(), twice.hash_value());
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_remove_keeps_other_bits_in_chunk() {
        let mut mask: CompositionMask = [code(1), code(2), code(100)].into_iter().collect();
        assert!(mask.remove(code(1)));
        assert!(mask.contains_code(code(2)));
        assert_eq!(mask.active_chunks(), 0b11);

        assert!(mask.remove(code(100)));
        assert_eq!(mask.active_chunks(), 0b01);
        assert!(!mask.remove(code(100)));
        assert!(!mask.remove(code(4000)));
    }

    #[test]
    fn test_remove_restores_equality_and_hash() {
        let base: CompositionMask = [code(0), code(3)].into_iter().collect();
        let mut grown = base.clone().with(code(700));
        assert_ne!(base, grown);

        grown.remove(code(700));
        assert_eq!(base, grown);
        assert_eq!(base.hash_value(), grown.hash_value());
    }

    #[test]
    fn test_contains_is_superset() {
        let small: CompositionMask = [code(1)].into_iter().collect();
        let big: CompositionMask = [code(1), code(2), code(70)].into_iter().collect();
        let other: CompositionMask = [code(3)].into_iter().collect();

        assert!(big.contains(&small));
        assert!(!small.contains(&big));
        assert!(!big.contains(&other));
        assert!(big.contains(&CompositionMask::new()));
        assert!(big.contains(&big));
    }

    #[test]
    fn test_mutual_containment_is_equality() {
        let a: CompositionMask = [code(9), code(200)].into_iter().collect();
        let b: CompositionMask = [code(200), code(9)].into_iter().collect();
        assert!(a.contains(&b) && b.contains(&a));
        assert!(a.matches(&b));

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_codes_and_display() {
        let mask: CompositionMask = [code(65), code(1), code(5)].into_iter().collect();
        let ids: Vec<_> = mask.codes().map(ComponentCode::to_id).collect();
        assert_eq!(ids, vec![1, 5, 65]);
        assert_eq!(mask.to_string(), "{0|1, 0|5, 1|1}");
        assert!(mask.chunk_bits(0).ends_with("100010"));
        assert_eq!(mask.chunk_bits(9), "0".repeat(64));
    }

    #[test]
    fn test_builder_validates() {
        let mut registry = ComponentRegistry::new(8, 16);
        registry.register::<Mass>().unwrap();

        let mask = registry.mask_builder().with::<Mass>().build().unwrap();
        assert_eq!(mask.len(), 1);

        let err = registry.mask_builder().with::<Charge>().build().err();
        assert!(matches!(err, Some(EcsError::ComponentTypeNotFound { .. })));

        let err = registry.mask_builder().with_id(3).build().err();
        assert_eq!(err, Some(EcsError::ComponentIdNotFound(3)));
    }
}
