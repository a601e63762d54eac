//! # Mask Containment Cache
//!
//! Every mask seen by the archetype registry (archetype keys and query
//! filters alike) gets an entry. When a mask is first inserted it is compared
//! against every existing entry once in each direction, so resolving a query
//! later is a walk over a precomputed superset list.

use std::collections::HashMap;

use super::archetype::ArchetypeId;
use super::mask::CompositionMask;

#[derive(Clone, Debug)]
struct MaskEntry {
    mask: CompositionMask,
    archetype: Option<ArchetypeId>,
    /// Entries whose mask this one contains.
    contains: Vec<usize>,
    /// Entries whose mask contains this one.
    contained_in: Vec<usize>,
}

/// Incrementally built superset/subset graph over masks.
#[derive(Clone, Debug, Default)]
pub struct MaskCache {
    lookup: HashMap<CompositionMask, usize>,
    entries: Vec<MaskEntry>,
}

impl MaskCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `mask` if unseen and returns its entry index.
    ///
    /// O(existing masks) on first insertion, O(1) afterwards.
    pub fn insert(&mut self, mask: &CompositionMask) -> usize {
        if let Some(&index) = self.lookup.get(mask) {
            return index;
        }

        let index = self.entries.len();
        let mut entry = MaskEntry {
            mask: mask.clone(),
            archetype: None,
            contains: Vec::new(),
            contained_in: Vec::new(),
        };

        for (other_index, other) in self.entries.iter_mut().enumerate() {
            if mask.contains(&other.mask) {
                entry.contains.push(other_index);
                other.contained_in.push(index);
            }
            if other.mask.contains(mask) {
                other.contains.push(index);
                entry.contained_in.push(other_index);
            }
        }

        self.entries.push(entry);
        self.lookup.insert(mask.clone(), index);
        index
    }

    /// Records that `mask` keys an archetype.
    pub fn set_archetype(&mut self, mask: &CompositionMask, archetype: ArchetypeId) {
        let index = self.insert(mask);
        self.entries[index].archetype = Some(archetype);
    }

    /// Every archetype whose mask contains `mask`, in ascending id order.
    ///
    /// Inserts `mask` first if it has not been seen.
    pub fn matching_archetypes(&mut self, mask: &CompositionMask) -> Vec<ArchetypeId> {
        let index = self.insert(mask);
        let entry = &self.entries[index];

        let mut archetypes: Vec<ArchetypeId> = entry
            .contained_in
            .iter()
            .filter_map(|&other| self.entries[other].archetype)
            .chain(entry.archetype)
            .collect();
        archetypes.sort_unstable();
        archetypes
    }

    /// Number of masks that `mask` is a strict superset of, if known.
    #[must_use]
    pub fn subset_count(&self, mask: &CompositionMask) -> Option<usize> {
        self.lookup
            .get(mask)
            .map(|&index| self.entries[index].contains.len())
    }

    /// Number of masks that strictly contain `mask`, if known.
    #[must_use]
    pub fn superset_count(&self, mask: &CompositionMask) -> Option<usize> {
        self.lookup
            .get(mask)
            .map(|&index| self.entries[index].contained_in.len())
    }

    /// Number of distinct masks seen.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no mask has been seen.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentCode;

    fn mask(ids: &[u32]) -> CompositionMask {
        ids.iter()
            .map(|&id| ComponentCode::from_id(id).unwrap())
            .collect()
    }

    #[test]
    fn test_links_both_directions() {
        let mut cache = MaskCache::new();
        cache.insert(&mask(&[0]));
        cache.insert(&mask(&[0, 1]));
        cache.insert(&mask(&[2]));
        cache.insert(&mask(&[0, 1, 2]));

        assert_eq!(cache.superset_count(&mask(&[0])), Some(2));
        assert_eq!(cache.subset_count(&mask(&[0, 1, 2])), Some(3));
        assert_eq!(cache.superset_count(&mask(&[2])), Some(1));
        assert_eq!(cache.subset_count(&mask(&[5])), None);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut cache = MaskCache::new();
        let first = cache.insert(&mask(&[3, 4]));
        let second = cache.insert(&mask(&[4, 3]));
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_matching_archetypes() {
        let mut cache = MaskCache::new();
        cache.set_archetype(&mask(&[0, 1]), ArchetypeId::new(1));
        cache.set_archetype(&mask(&[0]), ArchetypeId::new(0));
        cache.set_archetype(&mask(&[1]), ArchetypeId::new(2));

        assert_eq!(
            cache.matching_archetypes(&mask(&[0])),
            vec![ArchetypeId::new(0), ArchetypeId::new(1)]
        );
        assert_eq!(cache.matching_archetypes(&mask(&[0, 2])), vec![]);

        cache.set_archetype(&mask(&[0, 2]), ArchetypeId::new(3));
        assert_eq!(
            cache.matching_archetypes(&mask(&[0])),
            vec![ArchetypeId::new(0), ArchetypeId::new(1), ArchetypeId::new(3)]
        );
        assert_eq!(
            cache.matching_archetypes(&CompositionMask::new()).len(),
            4
        );
    }
}
