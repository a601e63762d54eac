//! # Component Type Registry
//!
//! Assigns each component type a sequential [`ComponentId`] and a derived
//! [`ComponentCode`], and owns one prototype column per type from which all
//! storage blocks are cloned.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use super::component::{Component, ComponentCode, ComponentId, ComponentInfo, MAX_COMPONENTS};
use super::mask::{CompositionMask, MaskBuilder};
use super::storage::{ComponentSetTemplate, ComponentStorage, ErasedStorage};
use crate::error::{EcsError, EcsResult};

/// Registry of component types.
///
/// Capacity is fixed at construction. Lookups by id, type and code are O(1).
pub struct ComponentRegistry {
    /// Indexed by component id.
    infos: Vec<ComponentInfo>,
    by_type: HashMap<TypeId, ComponentId>,
    /// Indexed by component id; each sized to `block_capacity`.
    prototypes: Vec<Box<dyn ErasedStorage>>,
    /// Union of every registered code.
    base_mask: CompositionMask,
    capacity: usize,
    block_capacity: usize,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of component types
    /// * `block_capacity` - Entity slots per storage block
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero or `capacity` exceeds [`MAX_COMPONENTS`].
    #[must_use]
    pub fn new(capacity: usize, block_capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(capacity <= MAX_COMPONENTS, "Capacity exceeds {MAX_COMPONENTS}");
        assert!(block_capacity > 0, "Block capacity must be greater than zero");

        Self {
            infos: Vec::with_capacity(capacity),
            by_type: HashMap::with_capacity(capacity),
            prototypes: Vec::with_capacity(capacity),
            base_mask: CompositionMask::new(),
            capacity,
            block_capacity,
        }
    }

    /// Registers `T` under the next sequential id.
    ///
    /// Registration is atomic: on error the registry is unchanged.
    ///
    /// # Errors
    ///
    /// - [`EcsError::AlreadyRegistered`] if `T` is known
    /// - [`EcsError::RegistryFull`] if the capacity is exhausted
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentInfo> {
        let type_id = TypeId::of::<T>();
        if self.by_type.contains_key(&type_id) {
            return Err(EcsError::AlreadyRegistered {
                type_name: std::any::type_name::<T>(),
            });
        }

        let full = EcsError::RegistryFull {
            capacity: self.capacity,
        };
        if self.infos.len() >= self.capacity {
            return Err(full);
        }
        let id = ComponentId::try_from(self.infos.len()).map_err(|_| full.clone())?;
        let code = ComponentCode::from_id(id).ok_or(full)?;

        let info = ComponentInfo::of::<T>(id, code);
        self.infos.push(info);
        self.by_type.insert(type_id, id);
        self.prototypes
            .push(Box::new(ComponentStorage::<T>::new(self.block_capacity)));
        self.base_mask.add(code);

        tracing::debug!(
            "registered component {} as id {} (code {}, {} bytes)",
            info.type_name,
            id,
            code,
            info.size
        );
        Ok(info)
    }

    /// Looks up a component by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentIdNotFound`] for an unknown id.
    pub fn info(&self, id: ComponentId) -> EcsResult<ComponentInfo> {
        self.infos
            .get(id as usize)
            .copied()
            .ok_or(EcsError::ComponentIdNotFound(id))
    }

    /// Looks up a component by type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentTypeNotFound`] if `T` is not registered.
    pub fn info_of<T: Component>(&self) -> EcsResult<ComponentInfo> {
        self.id_of(TypeId::of::<T>())
            .map(|id| self.infos[id as usize])
            .ok_or(EcsError::ComponentTypeNotFound {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Looks up a component by code.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentCodeNotFound`] for an unknown code.
    pub fn info_by_code(&self, code: ComponentCode) -> EcsResult<ComponentInfo> {
        self.infos
            .get(code.to_id() as usize)
            .copied()
            .ok_or(EcsError::ComponentCodeNotFound(code))
    }

    /// The id registered for a type, if any.
    #[inline]
    #[must_use]
    pub fn id_of(&self, type_id: TypeId) -> Option<ComponentId> {
        self.by_type.get(&type_id).copied()
    }

    /// True if every code in `mask` belongs to a registered component.
    #[inline]
    #[must_use]
    pub fn valid_mask(&self, mask: &CompositionMask) -> bool {
        self.base_mask.contains(mask)
    }

    /// Union of every registered code.
    #[inline]
    #[must_use]
    pub fn base_mask(&self) -> &CompositionMask {
        &self.base_mask
    }

    /// Builds the column prototypes for `mask`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidMask`] if the mask references unregistered components.
    pub fn template(&self, mask: &CompositionMask) -> EcsResult<ComponentSetTemplate> {
        if !self.valid_mask(mask) {
            return Err(EcsError::InvalidMask);
        }

        let mut infos = Vec::with_capacity(mask.len());
        let mut prototypes = Vec::with_capacity(mask.len());
        for code in mask.codes() {
            let id = code.to_id() as usize;
            infos.push(self.infos[id]);
            prototypes.push(self.prototypes[id].clone_storage());
        }

        Ok(ComponentSetTemplate::new(
            mask.clone(),
            infos,
            prototypes,
            self.block_capacity,
        ))
    }

    /// Starts a [`MaskBuilder`] against this registry.
    #[inline]
    #[must_use]
    pub fn mask_builder(&self) -> MaskBuilder<'_> {
        MaskBuilder::new(self)
    }

    /// Registered components in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    /// Number of registered components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// True if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Maximum number of component types.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entity slots per storage block.
    #[inline]
    #[must_use]
    pub const fn block_capacity(&self) -> usize {
        self.block_capacity
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("infos", &self.infos)
            .field("capacity", &self.capacity)
            .field("block_capacity", &self.block_capacity)
            .finish_non_exhaustive()
    }
}
