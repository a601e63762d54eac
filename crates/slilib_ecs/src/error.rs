//! # ECS Error Types
//!
//! All errors that can occur while registering components, placing entities
//! or resolving storage locations.
//!
//! A storage block reporting "full" is not an error: it is an internal
//! control-flow signal consumed by [`crate::Archetype`], which responds by
//! routing to (or creating) another block.

use thiserror::Error;

use crate::ecs::{ArchetypeId, ComponentCode, ComponentId, EntityId};

/// Errors that can occur in the ECS runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The component type was already registered.
    #[error("component type {type_name} is already registered")]
    AlreadyRegistered {
        /// Rust type name of the component.
        type_name: &'static str,
    },

    /// The component registry has no room for another type.
    #[error("component registry is full (capacity {capacity}); increase component_capacity")]
    RegistryFull {
        /// Configured registry capacity.
        capacity: usize,
    },

    /// The component type was never registered.
    #[error("component type {type_name} is not registered")]
    ComponentTypeNotFound {
        /// Rust type name of the component.
        type_name: &'static str,
    },

    /// No component is registered under this id.
    #[error("component id {0} is not registered")]
    ComponentIdNotFound(ComponentId),

    /// No component is registered under this code.
    #[error("component code {0} is not registered")]
    ComponentCodeNotFound(ComponentCode),

    /// The mask references components the registry does not know.
    #[error("composition mask references unregistered components")]
    InvalidMask,

    /// The entity is not tracked by the archetype registry.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// The entity identity registry is at capacity and may not grow.
    #[error("entity limit reached: {blocks} blocks in use and the registry is not resizable")]
    EntityLimitReached {
        /// Number of id blocks in use.
        blocks: usize,
    },

    /// No archetype exists under this id.
    #[error("archetype {0} not found")]
    ArchetypeNotFound(ArchetypeId),

    /// The archetype does not store this component type.
    #[error("component {type_name} is not part of archetype {archetype}")]
    ComponentNotInArchetype {
        /// Rust type name of the component.
        type_name: &'static str,
        /// The archetype that was searched.
        archetype: ArchetypeId,
    },

    /// The location record does not match what the block stores.
    ///
    /// The caller's [`crate::EntityInfo`] is stale.
    #[error("stale location for entity {entity}: chunk {chunk} slot {local} holds {stored:?}")]
    StaleLocation {
        /// The entity the caller tried to address.
        entity: EntityId,
        /// Block index within the archetype.
        chunk: usize,
        /// Slot within the block.
        local: usize,
        /// What the block actually holds at that slot.
        stored: Option<EntityId>,
    },

    /// The slot index lies beyond the block's used range.
    #[error("slot {local} is out of range for chunk {chunk}")]
    SlotOutOfRange {
        /// Block index within the archetype.
        chunk: usize,
        /// Slot within the block.
        local: usize,
    },

    /// The block index lies beyond the archetype's block list.
    #[error("chunk {chunk} is out of range for archetype {archetype}")]
    ChunkOutOfRange {
        /// The archetype that was addressed.
        archetype: ArchetypeId,
        /// Requested block index.
        chunk: usize,
    },

    /// The location record names a different archetype.
    #[error("entity location names archetype {actual}, expected {expected}")]
    WrongArchetype {
        /// The archetype the operation ran on.
        expected: ArchetypeId,
        /// The archetype named by the location record.
        actual: ArchetypeId,
    },

    /// A raw component payload has the wrong byte length.
    #[error("component {component} expects {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The component id.
        component: ComponentId,
        /// Registered size in bytes.
        expected: usize,
        /// Size of the supplied payload.
        actual: usize,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
