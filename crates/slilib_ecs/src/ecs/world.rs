//! # ECS World
//!
//! The context object that owns the three registries and keeps them
//! consistent: an id is alive in the [`EntityRegistry`] iff it is placed in
//! the [`ArchetypeRegistry`].

use std::any::type_name;

use super::archetype_registry::ArchetypeRegistry;
use super::builder::{Bundle, EntityBuilder};
use super::chunk::Chunk;
use super::component::{Component, ComponentInfo};
use super::entity::{EntityId, EntityInfo, EntityRegistry};
use super::mask::{CompositionMask, MaskBuilder};
use super::query::Query;
use super::registry::ComponentRegistry;
use crate::config::EcsConfig;
use crate::error::{EcsError, EcsResult};

/// The ECS World - container for all entity state.
///
/// Constructed once from an [`EcsConfig`] and passed explicitly to whatever
/// needs it.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use slilib_ecs::{Component, EcsConfig, EntityBuilder, World};
///
/// #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
/// #[repr(C)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// let mut world = World::new(EcsConfig::default()).unwrap();
/// world.register::<Health>().unwrap();
///
/// let entity = world.spawn(EntityBuilder::new().with(Health(100))).unwrap();
/// world.set(entity, Health(80)).unwrap();
/// assert_eq!(world.get::<Health>(entity), Ok(&Health(80)));
/// ```
#[derive(Debug)]
pub struct World {
    config: EcsConfig,
    components: ComponentRegistry,
    entities: EntityRegistry,
    archetypes: ArchetypeRegistry,
}

impl World {
    /// Creates a world from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: EcsConfig) -> EcsResult<Self> {
        config.validate()?;

        let components = ComponentRegistry::new(config.component_capacity, config.block_capacity);
        let entities = EntityRegistry::new(config.entity_blocks, config.entity_resizable);
        let archetypes = ArchetypeRegistry::new(config.initial_blocks, config.removal_batch_size);

        tracing::info!(
            "ECS world created: {} component slots, {} entities per block, {} blocks per archetype",
            config.component_capacity,
            config.block_capacity,
            config.initial_blocks
        );

        Ok(Self {
            config,
            components,
            entities,
            archetypes,
        })
    }

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// Any error from [`ComponentRegistry::register`].
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentInfo> {
        self.components.register::<T>()
    }

    /// Starts a [`MaskBuilder`] against this world's components.
    #[inline]
    #[must_use]
    pub fn mask_builder(&self) -> MaskBuilder<'_> {
        self.components.mask_builder()
    }

    /// Creates an entity from staged component values.
    ///
    /// All-or-nothing: nothing is allocated unless every staged value
    /// resolves, and the id is released again if placement fails.
    ///
    /// # Errors
    ///
    /// - any error from resolving the builder
    /// - [`EcsError::EntityLimitReached`] if no id is available
    pub fn spawn(&mut self, builder: EntityBuilder) -> EcsResult<EntityId> {
        let (mask, payload) = builder.resolve(&self.components)?;
        self.place(&mask, &payload)
    }

    /// Creates an entity from a bundle of components.
    ///
    /// # Errors
    ///
    /// Same conditions as [`World::spawn`].
    pub fn spawn_bundle<B: Bundle>(&mut self, bundle: B) -> EcsResult<EntityId> {
        self.spawn(EntityBuilder::new().with_bundle(bundle))
    }

    /// Creates an entity with every component of `mask` zeroed.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidMask`] if the mask references unregistered components
    /// - [`EcsError::EntityLimitReached`] if no id is available
    pub fn spawn_with_mask(&mut self, mask: &CompositionMask) -> EcsResult<EntityId> {
        self.place(mask, &[])
    }

    fn place(
        &mut self,
        mask: &CompositionMask,
        payload: &[(ComponentInfo, &[u8])],
    ) -> EcsResult<EntityId> {
        if !self.components.valid_mask(mask) {
            return Err(EcsError::InvalidMask);
        }

        let id = self.entities.create()?;
        match self.place_id(id, mask, payload) {
            Ok(()) => Ok(id),
            Err(err) => {
                if self.archetypes.has_entity(id) {
                    // Placement succeeded; only the payload failed.
                    if let Err(rollback) = self.archetypes.remove_entity(id) {
                        tracing::warn!("rollback of entity {} failed: {}", id, rollback);
                    }
                }
                self.entities.destroy(id);
                Err(err)
            }
        }
    }

    fn place_id(
        &mut self,
        id: EntityId,
        mask: &CompositionMask,
        payload: &[(ComponentInfo, &[u8])],
    ) -> EcsResult<()> {
        let info = self.archetypes.add_entity(&self.components, id, mask)?;
        let archetype = self
            .archetypes
            .archetype_mut(info.archetype)
            .ok_or(EcsError::ArchetypeNotFound(info.archetype))?;
        for (component, bytes) in payload {
            archetype.write_component(&info, component, bytes)?;
        }
        Ok(())
    }

    /// Destroys an entity and frees its id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn despawn(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.entities.is_alive(id) {
            return Err(EcsError::EntityNotFound(id));
        }
        self.archetypes.remove_entity(id)?;
        self.entities.destroy(id);
        Ok(())
    }

    /// Frees every parked removal slot and returns how many were freed.
    pub fn flush_removals(&mut self) -> usize {
        self.archetypes.flush()
    }

    /// True if the id is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Current location of a live entity.
    #[inline]
    #[must_use]
    pub fn entity_info(&self, id: EntityId) -> Option<EntityInfo> {
        self.archetypes.entity_info(id)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.entities.count()
    }

    /// Reads a component.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity is not alive
    /// - [`EcsError::ComponentNotInArchetype`] if it has no `T`
    pub fn get<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        let info = self.locate(id)?;
        self.archetypes
            .archetype(info.archetype)
            .ok_or(EcsError::ArchetypeNotFound(info.archetype))?
            .try_get(&info)
    }

    /// Reads a component mutably.
    ///
    /// # Errors
    ///
    /// Same conditions as [`World::get`].
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        let info = self.locate(id)?;
        self.archetypes
            .archetype_mut(info.archetype)
            .ok_or(EcsError::ArchetypeNotFound(info.archetype))?
            .try_get_mut(&info)
    }

    /// Overwrites a component.
    ///
    /// # Errors
    ///
    /// Same conditions as [`World::get`].
    pub fn set<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<()> {
        *self.get_mut::<T>(id)? = value;
        Ok(())
    }

    /// The storage block an entity lives in.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn entity_chunk(&self, id: EntityId) -> EcsResult<&Chunk> {
        let info = self.locate(id)?;
        self.archetypes
            .archetype(info.archetype)
            .and_then(|archetype| archetype.chunk(info.chunk))
            .ok_or(EcsError::ChunkOutOfRange {
                archetype: info.archetype,
                chunk: info.chunk,
            })
    }

    /// Adds a component, moving the entity to the matching archetype.
    ///
    /// If the entity already has `T` the value is overwritten in place.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentTypeNotFound`] if `T` is not registered
    /// - [`EcsError::EntityNotFound`] if the entity is not alive
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<EntityInfo> {
        let component = self.components.info_of::<T>()?;
        let (info, mask) = self.current_mask(id)?;

        if mask.contains_code(component.code) {
            self.set(id, value)?;
            return Ok(info);
        }

        let moved = self
            .archetypes
            .move_entity(&self.components, id, &mask.with(component.code))?;
        self.set(id, value)?;
        Ok(moved)
    }

    /// Removes a component, moving the entity to the matching archetype.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentTypeNotFound`] if `T` is not registered
    /// - [`EcsError::EntityNotFound`] if the entity is not alive
    /// - [`EcsError::ComponentNotInArchetype`] if the entity has no `T`
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> EcsResult<EntityInfo> {
        let component = self.components.info_of::<T>()?;
        let (info, mut mask) = self.current_mask(id)?;

        if !mask.remove(component.code) {
            return Err(EcsError::ComponentNotInArchetype {
                type_name: type_name::<T>(),
                archetype: info.archetype,
            });
        }
        self.archetypes.move_entity(&self.components, id, &mask)
    }

    /// Builds a query over every archetype containing `mask`.
    pub fn query(&mut self, mask: &CompositionMask) -> Query {
        self.archetypes.query(mask)
    }

    /// Re-resolves a query against the current archetypes.
    pub fn refresh(&mut self, query: &mut Query) {
        query.refresh(&mut self.archetypes);
    }

    fn locate(&self, id: EntityId) -> EcsResult<EntityInfo> {
        self.archetypes
            .entity_info(id)
            .ok_or(EcsError::EntityNotFound(id))
    }

    fn current_mask(&self, id: EntityId) -> EcsResult<(EntityInfo, CompositionMask)> {
        let info = self.locate(id)?;
        let archetype = self
            .archetypes
            .archetype(info.archetype)
            .ok_or(EcsError::ArchetypeNotFound(info.archetype))?;
        Ok((info, archetype.mask().clone()))
    }

    /// The configuration this world was built from.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EcsConfig {
        &self.config
    }

    /// The component type registry.
    #[inline]
    #[must_use]
    pub const fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// The entity id registry.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// The archetype registry.
    #[inline]
    #[must_use]
    pub const fn archetypes(&self) -> &ArchetypeRegistry {
        &self.archetypes
    }

    /// The archetype registry, mutably, for block-level iteration.
    ///
    /// Placing or removing entities through it bypasses the id registry.
    #[inline]
    pub fn archetypes_mut(&mut self) -> &mut ArchetypeRegistry {
        &mut self.archetypes
    }
}
