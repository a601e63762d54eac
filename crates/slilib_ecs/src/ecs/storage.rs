//! # Component Storage
//!
//! Pre-allocated, dense component storage.
//!
//! - [`ComponentStorage<C>`]: one typed column, sized once at creation
//! - [`ErasedStorage`]: the operation table the runtime uses when it does
//!   not know `C` (clone, reset, raw bytes)
//! - [`ComponentSetTemplate`]: the prototype columns for one mask
//! - [`ComponentSet`]: the columns owned by one storage block

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::component::{Component, ComponentId, ComponentInfo};
use super::mask::CompositionMask;

/// Pre-allocated storage for a single component type.
///
/// This storage guarantees:
/// - Zero allocations after initialization
/// - O(1) access by slot index
/// - Cache-friendly iteration
///
/// # Type Parameters
///
/// * `C` - The component type to store
#[derive(Clone, Debug)]
pub struct ComponentStorage<C: Component> {
    /// The dense array of components.
    data: Box<[C]>,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates new component storage with the specified capacity.
    ///
    /// All slots are zero-initialized.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            data: vec![C::zeroed(); capacity].into_boxed_slice(),
        }
    }

    /// Returns the capacity of this storage.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Gets a component by slot index.
    ///
    /// # Returns
    ///
    /// Reference to the component, or None if index is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)
    }

    /// Gets a mutable component by slot index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)
    }

    /// Sets a component at the specified index.
    ///
    /// # Returns
    ///
    /// `true` if the component was set, `false` if index was out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) -> bool {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = component;
            true
        } else {
            false
        }
    }

    /// Returns a slice of all components.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }

    /// Returns a mutable slice of all components.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.data
    }

    /// Resets a slot to all-zero bytes.
    #[inline]
    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = C::zeroed();
        }
    }
}

/// Type-erased view of a [`ComponentStorage`].
///
/// Built once per component type at registration; every other column is a
/// `clone_storage` of that prototype.
pub trait ErasedStorage: Any + Send + Sync {
    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Deep copy of the column.
    fn clone_storage(&self) -> Box<dyn ErasedStorage>;

    /// Zeroes one slot.
    fn reset(&mut self, index: usize);

    /// Raw bytes of one slot.
    fn read_bytes(&self, index: usize) -> Option<&[u8]>;

    /// Overwrites one slot from raw bytes.
    ///
    /// Returns `false` if the index is out of range or the length is not
    /// the component size.
    fn write_bytes(&mut self, index: usize, bytes: &[u8]) -> bool;

    /// Heap footprint in bytes.
    fn size_in_bytes(&self) -> usize;

    /// Upcast for downcasting to the concrete column.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete column.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn clone_storage(&self) -> Box<dyn ErasedStorage> {
        Box::new(self.clone())
    }

    fn reset(&mut self, index: usize) {
        ComponentStorage::reset(self, index);
    }

    fn read_bytes(&self, index: usize) -> Option<&[u8]> {
        self.data.get(index).map(bytemuck::bytes_of)
    }

    fn write_bytes(&mut self, index: usize, bytes: &[u8]) -> bool {
        if bytes.len() != std::mem::size_of::<C>() {
            return false;
        }
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = bytemuck::pod_read_unaligned(bytes);
                true
            }
            None => false,
        }
    }

    fn size_in_bytes(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Column order and type lookup shared by a template and all its sets.
#[derive(Debug)]
struct ComponentLayout {
    mask: CompositionMask,
    /// Sorted by component id; column `i` stores `infos[i]`.
    infos: Vec<ComponentInfo>,
    slots: HashMap<TypeId, usize>,
    capacity: usize,
}

impl ComponentLayout {
    #[inline]
    fn slot_of_id(&self, id: ComponentId) -> Option<usize> {
        self.infos.binary_search_by_key(&id, |info| info.id).ok()
    }
}

/// Prototype columns for one composition mask.
///
/// Every storage block of an archetype is instantiated from its template,
/// which deep-copies the prototype columns.
pub struct ComponentSetTemplate {
    layout: Arc<ComponentLayout>,
    prototypes: Vec<Box<dyn ErasedStorage>>,
}

impl ComponentSetTemplate {
    /// `infos` and `prototypes` must be parallel and sorted by component id.
    pub(crate) fn new(
        mask: CompositionMask,
        infos: Vec<ComponentInfo>,
        prototypes: Vec<Box<dyn ErasedStorage>>,
        capacity: usize,
    ) -> Self {
        debug_assert_eq!(infos.len(), prototypes.len());
        let slots = infos
            .iter()
            .enumerate()
            .map(|(slot, info)| (info.type_id, slot))
            .collect();
        Self {
            layout: Arc::new(ComponentLayout {
                mask,
                infos,
                slots,
                capacity,
            }),
            prototypes,
        }
    }

    /// The mask this template was built for.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> &CompositionMask {
        &self.layout.mask
    }

    /// Component metadata in column order.
    #[inline]
    #[must_use]
    pub fn infos(&self) -> &[ComponentInfo] {
        &self.layout.infos
    }

    /// Slots per storage block.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.capacity
    }

    /// Builds the columns for a new storage block.
    #[must_use]
    pub fn instantiate(&self) -> ComponentSet {
        ComponentSet {
            layout: Arc::clone(&self.layout),
            columns: self.prototypes.iter().map(|p| p.clone_storage()).collect(),
        }
    }
}

impl Clone for ComponentSetTemplate {
    fn clone(&self) -> Self {
        Self {
            layout: Arc::clone(&self.layout),
            prototypes: self.prototypes.iter().map(|p| p.clone_storage()).collect(),
        }
    }
}

impl fmt::Debug for ComponentSetTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSetTemplate")
            .field("mask", &self.layout.mask)
            .field("capacity", &self.layout.capacity)
            .finish()
    }
}

/// The typed columns owned by one storage block.
pub struct ComponentSet {
    layout: Arc<ComponentLayout>,
    columns: Vec<Box<dyn ErasedStorage>>,
}

impl ComponentSet {
    /// The mask of the owning archetype.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> &CompositionMask {
        &self.layout.mask
    }

    /// Component metadata in column order.
    #[inline]
    #[must_use]
    pub fn infos(&self) -> &[ComponentInfo] {
        &self.layout.infos
    }

    /// Slots per column.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.capacity
    }

    /// Checks whether this set stores `T`.
    #[inline]
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.layout.slots.contains_key(&TypeId::of::<T>())
    }

    /// The typed column for `T`.
    #[inline]
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        let slot = *self.layout.slots.get(&TypeId::of::<T>())?;
        self.columns[slot].as_any().downcast_ref()
    }

    /// The mutable typed column for `T`.
    #[inline]
    pub fn column_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        let slot = *self.layout.slots.get(&TypeId::of::<T>())?;
        self.columns[slot].as_any_mut().downcast_mut()
    }

    /// Two distinct mutable columns at once.
    ///
    /// Returns `None` if either type is missing or `A` and `B` are the same type.
    pub fn pair_mut<A: Component, B: Component>(
        &mut self,
    ) -> Option<(&mut ComponentStorage<A>, &mut ComponentStorage<B>)> {
        let a = *self.layout.slots.get(&TypeId::of::<A>())?;
        let b = *self.layout.slots.get(&TypeId::of::<B>())?;
        if a == b {
            return None;
        }

        let (first, second) = if a < b {
            let (left, right) = self.columns.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.columns.split_at_mut(a);
            (&mut right[0], &mut left[b])
        };
        Some((
            first.as_any_mut().downcast_mut()?,
            second.as_any_mut().downcast_mut()?,
        ))
    }

    /// Zeroes every column at `index`.
    pub(crate) fn reset_slot(&mut self, index: usize) {
        for column in &mut self.columns {
            column.reset(index);
        }
    }

    /// Copies out every component at `index`, in column order.
    pub(crate) fn read_slot(&self, index: usize) -> Vec<(ComponentInfo, Box<[u8]>)> {
        self.layout
            .infos
            .iter()
            .zip(&self.columns)
            .filter_map(|(info, column)| Some((*info, column.read_bytes(index)?.into())))
            .collect()
    }

    /// Writes raw bytes into the column of component `id`.
    ///
    /// Returns `false` if the component is not in this set, the index is out
    /// of range or the length does not match.
    pub(crate) fn write_bytes(&mut self, id: ComponentId, index: usize, bytes: &[u8]) -> bool {
        match self.layout.slot_of_id(id) {
            Some(slot) => self.columns[slot].write_bytes(index, bytes),
            None => false,
        }
    }

    /// Heap footprint of every column in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.columns.iter().map(|column| column.size_in_bytes()).sum()
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSet")
            .field("mask", &self.layout.mask)
            .field("columns", &self.columns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentCode;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }
    impl Component for Position {}

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Heat(u32);
    impl Component for Heat {}

    fn template(capacity: usize) -> ComponentSetTemplate {
        let pos_code = ComponentCode::from_id(0).unwrap();
        let heat_code = ComponentCode::from_id(1).unwrap();
        let infos = vec![
            ComponentInfo::of::<Position>(0, pos_code),
            ComponentInfo::of::<Heat>(1, heat_code),
        ];
        let prototypes: Vec<Box<dyn ErasedStorage>> = vec![
            Box::new(ComponentStorage::<Position>::new(capacity)),
            Box::new(ComponentStorage::<Heat>::new(capacity)),
        ];
        let mask = [pos_code, heat_code].into_iter().collect();
        ComponentSetTemplate::new(mask, infos, prototypes, capacity)
    }

    #[test]
    fn test_storage_get_set() {
        let mut storage: ComponentStorage<Position> = ComponentStorage::new(100);
        assert_eq!(storage.capacity(), 100);

        let pos = Position { x: 1.0, y: 2.0, z: 3.0 };
        assert!(storage.set(50, pos));
        assert_eq!(*storage.get(50).unwrap(), pos);
        assert!(!storage.set(100, pos));

        storage.reset(50);
        assert_eq!(*storage.get(50).unwrap(), Position::default());
    }

    #[test]
    fn test_erased_bytes() {
        let mut storage: ComponentStorage<Heat> = ComponentStorage::new(4);
        let erased: &mut dyn ErasedStorage = &mut storage;

        assert!(erased.write_bytes(2, bytemuck::bytes_of(&Heat(77))));
        assert!(!erased.write_bytes(2, &[1, 2]));
        assert!(!erased.write_bytes(9, bytemuck::bytes_of(&Heat(1))));
        assert_eq!(erased.read_bytes(2), Some(bytemuck::bytes_of(&Heat(77))));
        assert_eq!(erased.size_in_bytes(), 16);
    }

    #[test]
    fn test_instances_do_not_alias() {
        let template = template(8);
        let mut first = template.instantiate();
        let second = template.instantiate();

        first.column_mut::<Heat>().unwrap().set(0, Heat(5));
        assert_eq!(first.column::<Heat>().unwrap().get(0), Some(&Heat(5)));
        assert_eq!(second.column::<Heat>().unwrap().get(0), Some(&Heat(0)));
        assert!(first.has::<Position>());
        assert_eq!(first.capacity(), 8);
    }

    #[test]
    fn test_pair_mut() {
        let mut set = template(4).instantiate();
        {
            let (pos, heat) = set.pair_mut::<Position, Heat>().unwrap();
            pos.set(1, Position { x: 1.0, y: 0.0, z: 0.0 });
            heat.set(1, Heat(9));
        }
        let (heat, pos) = set.pair_mut::<Heat, Position>().unwrap();
        assert_eq!(heat.get(1), Some(&Heat(9)));
        assert_eq!(pos.get(1).map(|p| p.x), Some(1.0));

        assert!(set.pair_mut::<Heat, Heat>().is_none());
    }

    #[test]
    fn test_slot_bytes_round_trip() {
        let mut set = template(4).instantiate();
        assert!(set.write_bytes(1, 3, bytemuck::bytes_of(&Heat(42))));
        assert!(!set.write_bytes(7, 3, bytemuck::bytes_of(&Heat(42))));

        let boxed = set.read_slot(3);
        assert_eq!(boxed.len(), 2);
        assert_eq!(&*boxed[1].1, bytemuck::bytes_of(&Heat(42)));

        set.reset_slot(3);
        assert_eq!(set.column::<Heat>().unwrap().get(3), Some(&Heat(0)));
        assert_eq!(set.size_in_bytes(), 4 * 12 + 4 * 4);
    }
}
