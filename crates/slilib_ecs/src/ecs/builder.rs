//! # Entity Builders
//!
//! [`EntityBuilder`] stages component values before an entity exists, so
//! the whole composition can be validated before any id is allocated.
//! [`Bundle`] lets tuples of components stage themselves, and [`Prefab`]
//! keeps one bundle around to spawn copies of it.

use std::any::{type_name, TypeId};

use super::component::{Component, ComponentId, ComponentInfo};
use super::entity::EntityId;
use super::mask::CompositionMask;
use super::registry::ComponentRegistry;
use super::world::World;
use crate::error::{EcsError, EcsResult};

#[derive(Clone, Debug)]
enum StagedKey {
    Type {
        type_id: TypeId,
        type_name: &'static str,
    },
    Id(ComponentId),
}

/// Staged component values for one entity.
#[derive(Clone, Debug, Default)]
pub struct EntityBuilder {
    staged: Vec<(StagedKey, Box<[u8]>)>,
}

impl EntityBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a typed value. Staging the same type again replaces the value.
    #[must_use]
    pub fn with<T: Component>(mut self, value: T) -> Self {
        let type_id = TypeId::of::<T>();
        let bytes: Box<[u8]> = bytemuck::bytes_of(&value).into();
        let existing = self.staged.iter_mut().find(
            |(key, _)| matches!(key, StagedKey::Type { type_id: staged, .. } if *staged == type_id),
        );
        match existing {
            Some((_, slot)) => *slot = bytes,
            None => self.staged.push((
                StagedKey::Type {
                    type_id,
                    type_name: type_name::<T>(),
                },
                bytes,
            )),
        }
        self
    }

    /// Stages raw bytes for a registered component id.
    ///
    /// The length is checked against the registered size at spawn time.
    #[must_use]
    pub fn with_raw_bytes(mut self, id: ComponentId, bytes: &[u8]) -> Self {
        self.staged.push((StagedKey::Id(id), bytes.into()));
        self
    }

    /// Stages every component of a bundle.
    #[must_use]
    pub fn with_bundle<B: Bundle>(self, bundle: B) -> Self {
        bundle.stage(self)
    }

    /// Number of staged values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// True if nothing is staged.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Resolves every staged value against the registry.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentTypeNotFound`] / [`EcsError::ComponentIdNotFound`] for unknown components
    /// - [`EcsError::SizeMismatch`] for raw bytes of the wrong length
    pub(crate) fn resolve(
        &self,
        registry: &ComponentRegistry,
    ) -> EcsResult<(CompositionMask, Vec<(ComponentInfo, &[u8])>)> {
        let mut mask = CompositionMask::new();
        let mut payload = Vec::with_capacity(self.staged.len());

        for (key, bytes) in &self.staged {
            let info = match key {
                StagedKey::Type { type_id, type_name } => registry
                    .id_of(*type_id)
                    .ok_or(EcsError::ComponentTypeNotFound {
                        type_name: *type_name,
                    })
                    .and_then(|id| registry.info(id))?,
                StagedKey::Id(id) => registry.info(*id)?,
            };
            if bytes.len() != info.size {
                return Err(EcsError::SizeMismatch {
                    component: info.id,
                    expected: info.size,
                    actual: bytes.len(),
                });
            }
            mask.add(info.code);
            payload.push((info, &**bytes));
        }

        Ok((mask, payload))
    }
}

/// A group of components staged together.
///
/// Implemented for tuples of one to eight components.
pub trait Bundle: Send + Sync + 'static {
    /// Stages every component into `builder`.
    #[must_use]
    fn stage(self, builder: EntityBuilder) -> EntityBuilder;
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            #[allow(non_snake_case)]
            fn stage(self, builder: EntityBuilder) -> EntityBuilder {
                let ($($name,)+) = self;
                builder$(.with($name))+
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

/// A stored bundle that spawns identical entities.
#[derive(Clone, Debug)]
pub struct Prefab<B: Bundle + Clone> {
    bundle: B,
}

impl<B: Bundle + Clone> Prefab<B> {
    /// Wraps the values every spawned entity starts with.
    #[must_use]
    pub const fn new(bundle: B) -> Self {
        Self { bundle }
    }

    /// The stored values.
    #[inline]
    #[must_use]
    pub const fn bundle(&self) -> &B {
        &self.bundle
    }

    /// Spawns one entity with the stored values.
    ///
    /// # Errors
    ///
    /// Any error from [`World::spawn`].
    pub fn spawn(&self, world: &mut World) -> EcsResult<EntityId> {
        world.spawn(EntityBuilder::new().with_bundle(self.bundle.clone()))
    }

    /// Spawns `count` entities with the stored values.
    ///
    /// Stops at the first failure; entities spawned before it remain.
    ///
    /// # Errors
    ///
    /// Any error from [`World::spawn`].
    pub fn spawn_many(&self, world: &mut World, count: usize) -> EcsResult<Vec<EntityId>> {
        (0..count).map(|_| self.spawn(world)).collect()
    }
}
