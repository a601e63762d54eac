//! # Queries
//!
//! A [`Query`] is a resolved list of archetypes whose masks contain the
//! query mask. It holds ids, not references, so it stays valid across
//! mutations; call [`Query::refresh`] to pick up archetypes created since.

use super::archetype::ArchetypeId;
use super::archetype_registry::ArchetypeRegistry;
use super::chunk::Chunk;
use super::mask::CompositionMask;

/// Refreshable set of archetypes matching a mask.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use slilib_ecs::{Component, EcsConfig, EntityBuilder, World};
///
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position { x: f32, y: f32, z: f32 }
/// impl Component for Position {}
///
/// let mut world = World::new(EcsConfig::compact()).unwrap();
/// world.register::<Position>().unwrap();
/// world.spawn(EntityBuilder::new().with(Position { x: 0.0, y: 0.0, z: 0.0 })).unwrap();
///
/// let mask = world.mask_builder().with::<Position>().build().unwrap();
/// let query = world.query(&mask);
/// query.for_each_chunk_mut(world.archetypes_mut(), |chunk| {
///     for pos in chunk.slice_mut::<Position>().unwrap() {
///         pos.x += 1.0;
///     }
/// });
/// assert_eq!(query.entity_count(world.archetypes()), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    mask: CompositionMask,
    archetypes: Vec<ArchetypeId>,
}

impl Query {
    pub(crate) fn new(mask: CompositionMask, archetypes: Vec<ArchetypeId>) -> Self {
        Self { mask, archetypes }
    }

    /// The query mask.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> &CompositionMask {
        &self.mask
    }

    /// Matching archetypes, in ascending id order.
    #[inline]
    #[must_use]
    pub fn archetype_ids(&self) -> &[ArchetypeId] {
        &self.archetypes
    }

    /// Re-resolves against the registry, flushing parked removals first.
    pub fn refresh(&mut self, registry: &mut ArchetypeRegistry) {
        registry.flush();
        self.archetypes = registry.matching_archetypes(&self.mask);
    }

    /// Every block of every matching archetype.
    ///
    /// Removals parked since the last flush still occupy their slots here;
    /// [`Query::refresh`] or [`ArchetypeRegistry::flush`] releases them.
    pub fn chunks<'r>(&'r self, registry: &'r ArchetypeRegistry) -> impl Iterator<Item = &'r Chunk> {
        self.archetypes
            .iter()
            .filter_map(|&id| registry.archetype(id))
            .flat_map(|archetype| archetype.chunks().iter())
    }

    /// Calls `f` on every block of every matching archetype.
    pub fn for_each_chunk<F>(&self, registry: &ArchetypeRegistry, mut f: F)
    where
        F: FnMut(&Chunk),
    {
        for chunk in self.chunks(registry) {
            f(chunk);
        }
    }

    /// Calls `f` on every block of every matching archetype, mutably.
    pub fn for_each_chunk_mut<F>(&self, registry: &mut ArchetypeRegistry, mut f: F)
    where
        F: FnMut(&mut Chunk),
    {
        for &id in &self.archetypes {
            if let Some(archetype) = registry.archetype_mut(id) {
                for chunk in archetype.chunks_mut() {
                    f(chunk);
                }
            }
        }
    }

    /// Occupied slots across every matching archetype.
    ///
    /// Counts parked removals until they are flushed.
    #[must_use]
    pub fn entity_count(&self, registry: &ArchetypeRegistry) -> usize {
        self.archetypes
            .iter()
            .filter_map(|&id| registry.archetype(id))
            .map(|archetype| archetype.len())
            .sum()
    }
}
