//! # Entity Management
//!
//! Entities are stable integer identifiers. Identity (alive or not) lives in
//! the [`EntityRegistry`], a block-structured bitset. Where an entity's data
//! physically lives is tracked separately by [`EntityInfo`] records owned by
//! the [`crate::ArchetypeRegistry`].

use std::fmt;

use crate::ecs::ArchetypeId;
use crate::error::{EcsError, EcsResult};
use crate::memory::SetBits;

/// Number of ids tracked by one registry block (8 words of 64 bits, one cache line).
pub const IDS_PER_BLOCK: usize = 512;

const BLOCK_WORDS: usize = IDS_PER_BLOCK / 64;

/// Unique identifier for an entity.
///
/// Ids are handed out by the [`EntityRegistry`] and recycled after the
/// entity is destroyed. The id never changes while the entity moves between
/// storage blocks or archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u32::MAX);

    /// Creates an entity ID from its raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location record for a placed entity.
///
/// Mutated whenever the entity moves between blocks or archetypes; `id`
/// never changes. The [`crate::ArchetypeRegistry`] holds the authoritative
/// copy; copies held by callers go stale after a move or removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityInfo {
    /// The stable entity id.
    pub id: EntityId,
    /// Archetype currently storing the entity.
    pub archetype: ArchetypeId,
    /// Block index within the archetype.
    pub chunk: usize,
    /// Slot within the block.
    pub local: usize,
}

/// State of an id within the [`EntityRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityIdState {
    /// The id is allocated and its entity is alive.
    Active,
    /// The id lies in an allocated block but is not in use.
    Inactive,
    /// The id lies beyond every allocated block.
    Unallocated,
}

/// 512 ids packed into one cache line, plus a live count.
#[derive(Clone, Copy, Debug, Default)]
struct EntityBlock {
    words: [u64; BLOCK_WORDS],
    live: usize,
}

impl EntityBlock {
    #[inline]
    fn is_set(&self, bit: usize) -> bool {
        (self.words[bit >> 6] >> (bit & 63)) & 1 == 1
    }

    #[inline]
    fn set(&mut self, bit: usize) {
        self.words[bit >> 6] |= 1 << (bit & 63);
        self.live += 1;
    }

    #[inline]
    fn unset(&mut self, bit: usize) {
        self.words[bit >> 6] &= !(1 << (bit & 63));
        self.live -= 1;
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.live == IDS_PER_BLOCK
    }

    #[inline]
    fn first_unset(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(i, word)| i * 64 + (!word).trailing_zeros() as usize)
    }
}

/// Allocates and recycles stable entity ids.
///
/// Ids are tracked in blocks of [`IDS_PER_BLOCK`] bits. Allocation always
/// returns the lowest free id in the lowest block with room, so destroyed ids
/// are reused before new blocks are opened.
///
/// # Example
///
/// ```rust
/// use slilib_ecs::{EntityRegistry, EntityIdState};
///
/// let mut ids = EntityRegistry::new(16, true);
/// let id = ids.create().unwrap();
/// ids.destroy(id);
/// assert_eq!(ids.check_id_state(id), EntityIdState::Inactive);
/// ```
#[derive(Clone, Debug)]
pub struct EntityRegistry {
    blocks: Vec<EntityBlock>,
    /// Block capacity before a resize is needed.
    capacity: usize,
    resizable: bool,
    /// No block below this index has a free bit.
    first_unfilled: usize,
    count: usize,
}

impl EntityRegistry {
    /// Creates a registry able to hold `capacity` blocks before it must grow.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Initial number of blocks (each tracks 512 ids)
    /// * `resizable` - Whether the registry doubles its block capacity when full
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize, resizable: bool) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        Self {
            blocks: Vec::with_capacity(capacity),
            capacity,
            resizable,
            first_unfilled: 0,
            count: 0,
        }
    }

    /// Returns the number of live ids.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the number of allocated blocks.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the registry grows when its block capacity is exhausted.
    #[inline]
    #[must_use]
    pub const fn is_resizable(&self) -> bool {
        self.resizable
    }

    /// Allocates a new id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityLimitReached`] when every block is full, the
    /// block capacity is exhausted and the registry is not resizable.
    pub fn create(&mut self) -> EcsResult<EntityId> {
        let (block_index, bit) = self.first_unfilled_slot()?;
        let index = block_index * IDS_PER_BLOCK + bit;
        let raw = u32::try_from(index)
            .ok()
            .filter(|raw| *raw != u32::MAX)
            .ok_or(EcsError::EntityLimitReached {
                blocks: self.blocks.len(),
            })?;

        self.blocks[block_index].set(bit);
        self.count += 1;
        Ok(EntityId::new(raw))
    }

    /// Marks an id as inactive so it can be reused.
    ///
    /// # Returns
    ///
    /// `true` if the id was active, `false` if it was unallocated or already inactive.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some((block_index, bit)) = self.locate(id) else {
            return false;
        };

        let block = &mut self.blocks[block_index];
        if !block.is_set(bit) {
            return false;
        }

        block.unset(bit);
        self.count -= 1;
        if block_index < self.first_unfilled {
            self.first_unfilled = block_index;
        }
        true
    }

    /// Reports whether an id is active, inactive or beyond every allocated block.
    #[must_use]
    pub fn check_id_state(&self, id: EntityId) -> EntityIdState {
        match self.locate(id) {
            None => EntityIdState::Unallocated,
            Some((block, bit)) if self.blocks[block].is_set(bit) => EntityIdState::Active,
            Some(_) => EntityIdState::Inactive,
        }
    }

    /// Checks if an id is active.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.check_id_state(id) == EntityIdState::Active
    }

    /// Iterates over every active id in ascending order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(block_index, block)| {
                block.words.iter().enumerate().flat_map(move |(word_index, &word)| {
                    SetBits(word).map(move |bit| {
                        EntityId::new((block_index * IDS_PER_BLOCK + word_index * 64 + bit) as u32)
                    })
                })
            })
    }

    /// Splits an id into (block, bit) if it lies within an allocated block.
    #[inline]
    fn locate(&self, id: EntityId) -> Option<(usize, usize)> {
        if id.is_null() {
            return None;
        }
        let index = id.index() as usize;
        let block = index / IDS_PER_BLOCK;
        (block < self.blocks.len()).then_some((block, index % IDS_PER_BLOCK))
    }

    fn first_unfilled_slot(&mut self) -> EcsResult<(usize, usize)> {
        for i in self.first_unfilled..self.blocks.len() {
            let block = &self.blocks[i];
            if block.is_full() {
                continue;
            }
            if let Some(bit) = block.first_unset() {
                self.first_unfilled = i;
                return Ok((i, bit));
            }
        }

        let index = self.open_block()?;
        self.first_unfilled = index;
        Ok((index, 0))
    }

    fn open_block(&mut self) -> EcsResult<usize> {
        if self.blocks.len() == self.capacity {
            if !self.resizable {
                return Err(EcsError::EntityLimitReached {
                    blocks: self.blocks.len(),
                });
            }
            let new_capacity = self.capacity * 2;
            self.blocks.reserve(new_capacity - self.blocks.len());
            tracing::debug!(
                "entity registry grew from {} to {} blocks",
                self.capacity,
                new_capacity
            );
            self.capacity = new_capacity;
        }

        self.blocks.push(EntityBlock::default());
        Ok(self.blocks.len() - 1)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(64, true)
    }
}
