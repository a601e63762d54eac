//! # Archetypes
//!
//! An [`Archetype`] owns every storage block for one composition mask.
//!
//! ## Block routing
//!
//! A [`BitIndexer`] marks full blocks. Placement takes the lowest block with
//! room; when every block is full the archetype grows by a fixed number of
//! blocks (its initial block count), doubling total capacity on the first
//! expansion and growing linearly after that.

use std::any::{type_name, TypeId};
use std::fmt;

use super::chunk::Chunk;
use super::component::{Component, ComponentInfo};
use super::entity::{EntityId, EntityInfo};
use super::mask::CompositionMask;
use super::storage::ComponentSetTemplate;
use crate::error::{EcsError, EcsResult};
use crate::memory::BitIndexer;

/// Index of an archetype within the [`crate::ArchetypeRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Wraps a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entity's component values copied out as raw bytes.
///
/// Used to carry data across an archetype migration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxedEntity {
    entity: EntityId,
    components: Vec<(ComponentInfo, Box<[u8]>)>,
}

impl BoxedEntity {
    /// The boxed entity.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Iterates over `(info, bytes)` pairs in component id order.
    pub fn components(&self) -> impl Iterator<Item = (&ComponentInfo, &[u8])> {
        self.components.iter().map(|(info, bytes)| (info, &**bytes))
    }

    /// Decodes the boxed `T`, if present.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<T> {
        self.components
            .iter()
            .find(|(info, _)| info.type_id == TypeId::of::<T>())
            .map(|(_, bytes)| bytemuck::pod_read_unaligned(bytes))
    }

    /// Number of boxed components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if nothing was boxed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// All storage blocks for one composition mask.
pub struct Archetype {
    id: ArchetypeId,
    template: ComponentSetTemplate,
    chunks: Vec<Chunk>,
    /// Bit set = block is full.
    full: BitIndexer,
    /// Blocks added per expansion.
    expand_by: usize,
    entity_count: usize,
}

impl Archetype {
    /// Creates an archetype with `initial_blocks` empty blocks.
    ///
    /// # Panics
    ///
    /// Panics if `initial_blocks` is zero.
    #[must_use]
    pub fn new(id: ArchetypeId, template: ComponentSetTemplate, initial_blocks: usize) -> Self {
        assert!(initial_blocks > 0, "Initial blocks must be greater than zero");

        let chunks = (0..initial_blocks)
            .map(|index| Chunk::new(index, template.instantiate()))
            .collect();
        Self {
            id,
            template,
            chunks,
            full: BitIndexer::new(initial_blocks),
            expand_by: initial_blocks,
            entity_count: 0,
        }
    }

    /// Places `entity` in the lowest block with room, expanding if needed.
    pub(crate) fn add(&mut self, entity: EntityId) -> EntityInfo {
        loop {
            let Some(chunk_index) = self.full.first_unset() else {
                self.expand();
                continue;
            };

            let chunk = &mut self.chunks[chunk_index];
            let Some(local) = chunk.add_entity(entity) else {
                self.full.set(chunk_index);
                continue;
            };
            if chunk.is_full() {
                self.full.set(chunk_index);
            }

            self.entity_count += 1;
            tracing::trace!(
                "placed entity {} in archetype {} chunk {} slot {}",
                entity,
                self.id,
                chunk_index,
                local
            );
            return EntityInfo {
                id: entity,
                archetype: self.id,
                chunk: chunk_index,
                local,
            };
        }
    }

    /// Frees the slot described by `info`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WrongArchetype`] if `info` names another archetype
    /// - [`EcsError::ChunkOutOfRange`] if the block does not exist
    /// - any error from [`Chunk`] slot validation
    pub(crate) fn remove(&mut self, info: &EntityInfo) -> EcsResult<()> {
        self.check_archetype(info)?;
        let chunk = self
            .chunks
            .get_mut(info.chunk)
            .ok_or(EcsError::ChunkOutOfRange {
                archetype: self.id,
                chunk: info.chunk,
            })?;

        chunk.remove_entity(info.local, info.id)?;
        self.full.unset(info.chunk);
        self.entity_count -= 1;
        tracing::trace!(
            "removed entity {} from archetype {} chunk {} slot {}",
            info.id,
            self.id,
            info.chunk,
            info.local
        );
        Ok(())
    }

    /// Appends `expand_by` empty blocks.
    pub fn expand(&mut self) {
        let start = self.chunks.len();
        let end = start + self.expand_by;
        self.chunks
            .extend((start..end).map(|index| Chunk::new(index, self.template.instantiate())));
        self.full.grow(end);
        tracing::debug!(
            "archetype {} expanded from {} to {} chunks",
            self.id,
            start,
            end
        );
    }

    /// Typed access by location.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not stored here or `info` does not describe a live
    /// slot of this archetype. Use [`Archetype::try_get`] when either is possible.
    #[inline]
    #[must_use]
    pub fn get<T: Component>(&self, info: &EntityInfo) -> &T {
        match self.try_get(info) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Mutable typed access by location.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Archetype::get`].
    #[inline]
    pub fn get_mut<T: Component>(&mut self, info: &EntityInfo) -> &mut T {
        match self.try_get_mut(info) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Typed access by location.
    ///
    /// # Errors
    ///
    /// Returns a location error for a stale or foreign `info`, or
    /// [`EcsError::ComponentNotInArchetype`] if `T` is not stored here.
    pub fn try_get<T: Component>(&self, info: &EntityInfo) -> EcsResult<&T> {
        let chunk = self.live_chunk(info)?;
        chunk.get::<T>(info.local).ok_or(EcsError::ComponentNotInArchetype {
            type_name: type_name::<T>(),
            archetype: self.id,
        })
    }

    /// Mutable typed access by location.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Archetype::try_get`].
    pub fn try_get_mut<T: Component>(&mut self, info: &EntityInfo) -> EcsResult<&mut T> {
        self.live_chunk(info)?;
        let id = self.id;
        self.chunks[info.chunk]
            .get_mut::<T>(info.local)
            .ok_or(EcsError::ComponentNotInArchetype {
                type_name: type_name::<T>(),
                archetype: id,
            })
    }

    /// Copies out every component of the entity at `info`.
    ///
    /// # Errors
    ///
    /// Returns a location error for a stale or foreign `info`.
    pub fn box_entity(&self, info: &EntityInfo) -> EcsResult<BoxedEntity> {
        let chunk = self.live_chunk(info)?;
        Ok(BoxedEntity {
            entity: info.id,
            components: chunk.read_slot(info.local),
        })
    }

    /// Writes back every boxed component that this archetype stores.
    ///
    /// Components absent from this archetype are skipped.
    ///
    /// # Errors
    ///
    /// Returns a location error for a stale or foreign `info`.
    pub fn unbox_entity(&mut self, info: &EntityInfo, boxed: &BoxedEntity) -> EcsResult<()> {
        self.live_chunk(info)?;
        let chunk = &mut self.chunks[info.chunk];
        for (component, bytes) in &boxed.components {
            if self.template.mask().contains_code(component.code) {
                chunk.write_bytes(component.id, info.local, bytes);
            }
        }
        Ok(())
    }

    /// Overwrites one component from raw bytes.
    ///
    /// # Errors
    ///
    /// - a location error for a stale or foreign `info`
    /// - [`EcsError::ComponentNotInArchetype`] if the component is not stored here
    /// - [`EcsError::SizeMismatch`] if `bytes` is not the component size
    pub fn write_component(
        &mut self,
        info: &EntityInfo,
        component: &ComponentInfo,
        bytes: &[u8],
    ) -> EcsResult<()> {
        self.live_chunk(info)?;
        if !self.template.mask().contains_code(component.code) {
            return Err(EcsError::ComponentNotInArchetype {
                type_name: component.type_name,
                archetype: self.id,
            });
        }
        if bytes.len() != component.size {
            return Err(EcsError::SizeMismatch {
                component: component.id,
                expected: component.size,
                actual: bytes.len(),
            });
        }
        self.chunks[info.chunk].write_bytes(component.id, info.local, bytes);
        Ok(())
    }

    fn check_archetype(&self, info: &EntityInfo) -> EcsResult<()> {
        if info.archetype == self.id {
            Ok(())
        } else {
            Err(EcsError::WrongArchetype {
                expected: self.id,
                actual: info.archetype,
            })
        }
    }

    /// Resolves `info` to its block, checking the slot still holds `info.id`.
    fn live_chunk(&self, info: &EntityInfo) -> EcsResult<&Chunk> {
        self.check_archetype(info)?;
        let chunk = self.chunks.get(info.chunk).ok_or(EcsError::ChunkOutOfRange {
            archetype: self.id,
            chunk: info.chunk,
        })?;

        let stored = chunk.entity_at(info.local);
        if stored != Some(info.id) {
            return Err(EcsError::StaleLocation {
                entity: info.id,
                chunk: info.chunk,
                local: info.local,
                stored,
            });
        }
        Ok(chunk)
    }

    /// This archetype's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The composition mask shared by every entity here.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> &CompositionMask {
        self.template.mask()
    }

    /// The column template blocks are cloned from.
    #[inline]
    #[must_use]
    pub fn template(&self) -> &ComponentSetTemplate {
        &self.template
    }

    /// All blocks, in index order.
    #[inline]
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// All blocks, mutably.
    #[inline]
    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    /// One block.
    #[inline]
    #[must_use]
    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Number of occupied slots, including removals still parked in the
    /// [`crate::ArchetypeRegistry`].
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entity_count
    }

    /// True if no entity lives here.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entity_count == 0
    }

    /// Number of blocks.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total slots across every block.
    #[inline]
    #[must_use]
    pub fn entity_capacity(&self) -> usize {
        self.chunks.len() * self.template.capacity()
    }

    /// Memory held by every block, in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::size_in_bytes).sum()
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("mask", self.mask())
            .field("chunks", &self.chunks.len())
            .field("entities", &self.entity_count)
            .finish_non_exhaustive()
    }
}
