//! # Archetype Registry
//!
//! Maps composition masks to archetypes, tracks where every placed entity
//! lives and resolves queries through the [`MaskCache`].
//!
//! ## Entity states
//!
//! ```text
//! Unplaced --add_entity--> Placed --remove_entity--> Removed
//!                            |  ^
//!                            move_entity
//! ```
//!
//! Removal strikes the entity from the location map at once. Freeing its
//! slot may be deferred: with a batch size above one, removed locations are
//! parked and released together once the batch fills, or on `flush`.

use std::collections::HashMap;

use super::archetype::{Archetype, ArchetypeId};
use super::entity::{EntityId, EntityInfo};
use super::mask::CompositionMask;
use super::mask_cache::MaskCache;
use super::query::Query;
use super::registry::ComponentRegistry;
use crate::error::{EcsError, EcsResult};

/// Owner of every archetype and every placed entity's location.
#[derive(Debug)]
pub struct ArchetypeRegistry {
    archetypes: Vec<Archetype>,
    by_mask: HashMap<CompositionMask, ArchetypeId>,
    entities: HashMap<EntityId, EntityInfo>,
    masks: MaskCache,
    /// Removed locations whose slots are not yet freed.
    pending: Vec<EntityInfo>,
    batch_size: usize,
    initial_blocks: usize,
}

impl ArchetypeRegistry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `initial_blocks` - Blocks pre-allocated per archetype, and blocks added per expansion
    /// * `batch_size` - Deferred-removal threshold; 0 or 1 frees slots immediately
    ///
    /// # Panics
    ///
    /// Panics if `initial_blocks` is zero.
    #[must_use]
    pub fn new(initial_blocks: usize, batch_size: usize) -> Self {
        assert!(initial_blocks > 0, "Initial blocks must be greater than zero");
        Self {
            archetypes: Vec::new(),
            by_mask: HashMap::new(),
            entities: HashMap::new(),
            masks: MaskCache::new(),
            pending: Vec::with_capacity(batch_size),
            batch_size,
            initial_blocks,
        }
    }

    /// Exact lookup by mask, creating the archetype on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidMask`] if the mask references unregistered components.
    pub fn get_or_create_archetype(
        &mut self,
        components: &ComponentRegistry,
        mask: &CompositionMask,
    ) -> EcsResult<ArchetypeId> {
        if let Some(&id) = self.by_mask.get(mask) {
            return Ok(id);
        }

        let template = components.template(mask)?;
        let id = ArchetypeId::new(
            u32::try_from(self.archetypes.len()).map_err(|_| EcsError::InvalidMask)?,
        );
        self.archetypes
            .push(Archetype::new(id, template, self.initial_blocks));
        self.by_mask.insert(mask.clone(), id);
        self.masks.set_archetype(mask, id);

        tracing::debug!("created archetype {} for mask {}", id, mask);
        Ok(id)
    }

    /// Places `entity` in the archetype for `mask`.
    ///
    /// An entity that is already placed is left where it is and its current
    /// location is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidMask`] before any state changes if the mask
    /// references unregistered components.
    pub fn add_entity(
        &mut self,
        components: &ComponentRegistry,
        entity: EntityId,
        mask: &CompositionMask,
    ) -> EcsResult<EntityInfo> {
        if !components.valid_mask(mask) {
            return Err(EcsError::InvalidMask);
        }
        if let Some(info) = self.entities.get(&entity) {
            return Ok(*info);
        }

        let archetype = self.get_or_create_archetype(components, mask)?;
        let info = self.archetypes[archetype.index()].add(entity);
        self.entities.insert(entity, info);
        Ok(info)
    }

    /// Removes a placed entity.
    ///
    /// The entity is unreachable as soon as this returns. With batching on,
    /// its slot is freed on the next flush.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity is not placed
    /// - a location error if an immediate release fails; the entity stays placed
    pub fn remove_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        let info = self
            .entities
            .remove(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;

        if self.batch_size <= 1 {
            if let Err(err) = self.release(&info) {
                self.entities.insert(entity, info);
                return Err(err);
            }
            return Ok(());
        }

        self.pending.push(info);
        if self.pending.len() >= self.batch_size {
            self.flush();
        }
        Ok(())
    }

    /// Frees every parked slot and returns how many were freed.
    ///
    /// Calling it again with nothing parked is a no-op.
    pub fn flush(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut freed = 0;
        for info in &pending {
            match self.release(info) {
                Ok(()) => freed += 1,
                Err(err) => tracing::warn!("deferred removal of entity {} failed: {}", info.id, err),
            }
        }

        self.pending = pending;
        self.pending.clear();
        freed
    }

    fn release(&mut self, info: &EntityInfo) -> EcsResult<()> {
        self.archetypes
            .get_mut(info.archetype.index())
            .ok_or(EcsError::ArchetypeNotFound(info.archetype))?
            .remove(info)
    }

    /// Moves a placed entity to the archetype for `new_mask`.
    ///
    /// Components present in both masks keep their values; components only
    /// in `new_mask` start zeroed. The id never changes.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidMask`] if `new_mask` references unregistered components
    /// - [`EcsError::EntityNotFound`] if the entity is not placed
    pub fn move_entity(
        &mut self,
        components: &ComponentRegistry,
        entity: EntityId,
        new_mask: &CompositionMask,
    ) -> EcsResult<EntityInfo> {
        if !components.valid_mask(new_mask) {
            return Err(EcsError::InvalidMask);
        }
        let old = self
            .entities
            .get(&entity)
            .copied()
            .ok_or(EcsError::EntityNotFound(entity))?;

        let source = self
            .archetypes
            .get(old.archetype.index())
            .ok_or(EcsError::ArchetypeNotFound(old.archetype))?;
        if source.mask() == new_mask {
            return Ok(old);
        }
        let boxed = source.box_entity(&old)?;

        let target = self.get_or_create_archetype(components, new_mask)?;
        self.release(&old)?;

        let info = self.archetypes[target.index()].add(entity);
        self.entities.insert(entity, info);
        self.archetypes[target.index()].unbox_entity(&info, &boxed)?;

        tracing::trace!(
            "moved entity {} from archetype {} to {}",
            entity,
            old.archetype,
            target
        );
        Ok(info)
    }

    /// Builds a query over every archetype whose mask contains `mask`.
    ///
    /// Parked removals are flushed first.
    pub fn query(&mut self, mask: &CompositionMask) -> Query {
        self.flush();
        Query::new(mask.clone(), self.masks.matching_archetypes(mask))
    }

    /// Every archetype whose mask contains `mask`, in ascending id order.
    pub fn matching_archetypes(&mut self, mask: &CompositionMask) -> Vec<ArchetypeId> {
        self.masks.matching_archetypes(mask)
    }

    /// True if the entity is placed.
    #[inline]
    #[must_use]
    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Current location of a placed entity.
    #[inline]
    #[must_use]
    pub fn entity_info(&self, entity: EntityId) -> Option<EntityInfo> {
        self.entities.get(&entity).copied()
    }

    /// The archetype a placed entity lives in.
    #[must_use]
    pub fn entity_archetype(&self, entity: EntityId) -> Option<&Archetype> {
        let info = self.entities.get(&entity)?;
        self.archetypes.get(info.archetype.index())
    }

    /// Looks up an archetype by id.
    #[inline]
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Looks up an archetype by id, mutably.
    #[inline]
    pub fn archetype_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.index())
    }

    /// Exact lookup by mask, without creating.
    #[inline]
    #[must_use]
    pub fn archetype_by_mask(&self, mask: &CompositionMask) -> Option<ArchetypeId> {
        self.by_mask.get(mask).copied()
    }

    /// Every archetype, in id order.
    #[inline]
    #[must_use]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// The containment cache.
    #[inline]
    #[must_use]
    pub fn mask_cache(&self) -> &MaskCache {
        &self.masks
    }

    /// Number of archetypes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// True if no archetype exists.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Number of placed entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of removals waiting for a flush.
    #[inline]
    #[must_use]
    pub fn pending_removals(&self) -> usize {
        self.pending.len()
    }
}
