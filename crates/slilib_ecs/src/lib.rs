//! # SliLib ECS
//!
//! Archetype-based Entity Component System runtime:
//! - Component type registry with bit-packed composition masks
//! - Chunked archetype storage with stable entity ids
//! - Containment-cached queries over storage blocks
//!
//! ## Architecture Rules
//!
//! 1. **Plain data only** - Components are `Pod`, checked at compile time
//! 2. **Data-oriented design** - Each block stores one dense column per component
//! 3. **Explicit context** - A [`World`] owns every registry; nothing is global
//!
//! ## Example
//!
//! ```rust
//! use bytemuck::{Pod, Zeroable};
//! use slilib_ecs::{Component, EcsConfig, EntityBuilder, World};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
//! #[repr(C)]
//! struct Position { x: f32, y: f32, z: f32 }
//! impl Component for Position {}
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
//! #[repr(C)]
//! struct Velocity { x: f32, y: f32, z: f32 }
//! impl Component for Velocity {}
//!
//! let mut world = World::new(EcsConfig::default()).unwrap();
//! world.register::<Position>().unwrap();
//! world.register::<Velocity>().unwrap();
//!
//! let entity = world
//!     .spawn(
//!         EntityBuilder::new()
//!             .with(Position { x: 0.0, y: 0.0, z: 0.0 })
//!             .with(Velocity { x: 1.0, y: 2.0, z: 3.0 }),
//!     )
//!     .unwrap();
//!
//! let mask = world
//!     .mask_builder()
//!     .with::<Position>()
//!     .with::<Velocity>()
//!     .build()
//!     .unwrap();
//! let query = world.query(&mask);
//! query.for_each_chunk_mut(world.archetypes_mut(), |chunk| {
//!     let (positions, velocities) = chunk.pair_mut::<Position, Velocity>().unwrap();
//!     for (p, v) in positions.iter_mut().zip(velocities.iter()) {
//!         p.x += v.x;
//!         p.y += v.y;
//!         p.z += v.z;
//!     }
//! });
//!
//! assert_eq!(world.get::<Position>(entity), Ok(&Position { x: 1.0, y: 2.0, z: 3.0 }));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::EcsConfig;
pub use ecs::{
    Archetype, ArchetypeId, ArchetypeRegistry, BoxedEntity, Bundle, Chunk, Component,
    ComponentCode, ComponentId, ComponentInfo, ComponentRegistry, ComponentSet,
    ComponentSetTemplate, ComponentStorage, CompositionMask, EntityBuilder, EntityId,
    EntityIdState, EntityInfo, EntityRegistry, ErasedStorage, MaskBuilder, MaskCache, Prefab,
    Query, World, IDS_PER_BLOCK, MAX_COMPONENTS,
};
pub use error::{EcsError, EcsResult};
pub use memory::BitIndexer;
