//! # Entity Component System
//!
//! Archetype storage: every distinct set of component types gets its own
//! archetype, and every archetype stores its entities in fixed-size blocks
//! of parallel component columns.
//!
//! ## Design Philosophy
//!
//! - Components are plain data (`Pod`), stored in dense typed columns
//! - Entity ids are stable; locations are tracked separately and may change
//! - Queries resolve through a cached containment graph between masks
//! - No global state: everything hangs off an explicit [`World`]

mod archetype;
mod archetype_registry;
mod builder;
mod chunk;
mod component;
mod entity;
mod mask;
mod mask_cache;
mod query;
mod registry;
mod storage;
mod world;

pub use archetype::{Archetype, ArchetypeId, BoxedEntity};
pub use archetype_registry::ArchetypeRegistry;
pub use builder::{Bundle, EntityBuilder, Prefab};
pub use chunk::Chunk;
pub use component::{Component, ComponentCode, ComponentId, ComponentInfo, MAX_COMPONENTS};
pub use entity::{EntityId, EntityIdState, EntityInfo, EntityRegistry, IDS_PER_BLOCK};
pub use mask::{CompositionMask, MaskBuilder};
pub use mask_cache::MaskCache;
pub use query::Query;
pub use registry::ComponentRegistry;
pub use storage::{ComponentSet, ComponentSetTemplate, ComponentStorage, ErasedStorage};
pub use world::World;
