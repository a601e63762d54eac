//! # Storage Blocks
//!
//! A [`Chunk`] is a fixed-capacity block of parallel component columns plus a
//! slot-to-entity map and a stack of freed slots.
//!
//! Slots are handed out from the free stack first, then sequentially up to
//! the high-water mark. A block that has neither reports "full" by returning
//! `None`; that is a routing signal for the archetype, not an error.

use std::fmt;

use super::component::{Component, ComponentId, ComponentInfo};
use super::entity::EntityId;
use super::storage::ComponentSet;
use crate::error::{EcsError, EcsResult};

/// One fixed-capacity storage block of an archetype.
pub struct Chunk {
    /// Position within the owning archetype.
    index: usize,
    components: ComponentSet,
    /// Slot -> entity. `None` for never-used and freed slots.
    entities: Box<[Option<EntityId>]>,
    /// Slots `0..high_water` have been used at least once.
    high_water: usize,
    live: usize,
    free: Vec<usize>,
}

impl Chunk {
    /// Creates an empty block over `components`.
    #[must_use]
    pub fn new(index: usize, components: ComponentSet) -> Self {
        let capacity = components.capacity();
        Self {
            index,
            components,
            entities: vec![None; capacity].into_boxed_slice(),
            high_water: 0,
            live: 0,
            free: Vec::new(),
        }
    }

    /// Places an entity and returns its slot, or `None` if the block is full.
    ///
    /// A recycled slot is zeroed again before it is handed out, since block
    /// passes over `slice_mut` may have written to it while it was free.
    pub(crate) fn add_entity(&mut self, id: EntityId) -> Option<usize> {
        let local = match self.free.pop() {
            Some(local) => {
                self.components.reset_slot(local);
                local
            }
            None if self.high_water < self.entities.len() => {
                self.high_water += 1;
                self.high_water - 1
            }
            None => return None,
        };

        self.entities[local] = Some(id);
        self.live += 1;
        Some(local)
    }

    /// Frees the slot held by `id`.
    ///
    /// The slot's component data is zeroed and the slot goes on the free stack.
    ///
    /// # Errors
    ///
    /// - [`EcsError::SlotOutOfRange`] if `local` was never handed out
    /// - [`EcsError::StaleLocation`] if the slot does not hold `id`
    pub(crate) fn remove_entity(&mut self, local: usize, id: EntityId) -> EcsResult<()> {
        if local >= self.high_water {
            return Err(EcsError::SlotOutOfRange {
                chunk: self.index,
                local,
            });
        }

        let stored = self.entities[local];
        if stored != Some(id) {
            return Err(EcsError::StaleLocation {
                entity: id,
                chunk: self.index,
                local,
                stored,
            });
        }

        self.entities[local] = None;
        self.components.reset_slot(local);
        self.free.push(local);
        self.live -= 1;
        Ok(())
    }

    /// Position within the owning archetype.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// True if no entity lives here.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots per column.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// True if every slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.live == self.entities.len()
    }

    /// Number of slots ever handed out; typed slices cover `0..high_water`.
    #[inline]
    #[must_use]
    pub const fn high_water(&self) -> usize {
        self.high_water
    }

    /// The entity at `local`, if the slot is occupied.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, local: usize) -> Option<EntityId> {
        self.entities.get(local).copied().flatten()
    }

    /// True if `local` holds a live entity.
    #[inline]
    #[must_use]
    pub fn is_occupied(&self, local: usize) -> bool {
        self.entity_at(local).is_some()
    }

    /// Iterates over `(slot, entity)` for every occupied slot.
    ///
    /// A parked removal keeps its slot occupied until the registry flushes.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, EntityId)> + '_ {
        self.entities[..self.high_water]
            .iter()
            .enumerate()
            .filter_map(|(local, id)| id.map(|id| (local, id)))
    }

    /// The block's columns.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    /// Used prefix of the `T` column.
    ///
    /// Freed slots inside the prefix are zeroed; use [`Chunk::is_occupied`]
    /// to skip them.
    #[inline]
    #[must_use]
    pub fn slice<T: Component>(&self) -> Option<&[T]> {
        let column = self.components.column::<T>()?;
        Some(&column.as_slice()[..self.high_water])
    }

    /// Mutable used prefix of the `T` column.
    #[inline]
    pub fn slice_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        let high_water = self.high_water;
        let column = self.components.column_mut::<T>()?;
        Some(&mut column.as_mut_slice()[..high_water])
    }

    /// Two distinct mutable column prefixes, for "update `A` from `B`" passes.
    ///
    /// Returns `None` if either type is missing or both are the same type.
    pub fn pair_mut<A: Component, B: Component>(&mut self) -> Option<(&mut [A], &mut [B])> {
        let high_water = self.high_water;
        let (a, b) = self.components.pair_mut::<A, B>()?;
        Some((
            &mut a.as_mut_slice()[..high_water],
            &mut b.as_mut_slice()[..high_water],
        ))
    }

    /// The `T` value at `local`.
    #[inline]
    #[must_use]
    pub fn get<T: Component>(&self, local: usize) -> Option<&T> {
        self.components.column::<T>()?.get(local)
    }

    /// The mutable `T` value at `local`.
    #[inline]
    pub fn get_mut<T: Component>(&mut self, local: usize) -> Option<&mut T> {
        self.components.column_mut::<T>()?.get_mut(local)
    }

    pub(crate) fn read_slot(&self, local: usize) -> Vec<(ComponentInfo, Box<[u8]>)> {
        self.components.read_slot(local)
    }

    pub(crate) fn write_bytes(&mut self, id: ComponentId, local: usize, bytes: &[u8]) -> bool {
        self.components.write_bytes(id, local, bytes)
    }

    /// Component columns plus the id map, in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.components.size_in_bytes() + std::mem::size_of_val(&*self.entities)
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("index", &self.index)
            .field("live", &self.live)
            .field("high_water", &self.high_water)
            .field("capacity", &self.entities.len())
            .finish_non_exhaustive()
    }
}
