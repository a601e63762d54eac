//! # Component System
//!
//! Components are pure data containers with no behavior.
//! They must be `Pod` so every storage slot can be zeroed, copied bitwise and
//! boxed into raw bytes when an entity migrates between archetypes.

use std::any::TypeId;
use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Upper bound on registered component types: 64 chunk words of 64 bits.
pub const MAX_COMPONENTS: usize = 64 * 64;

/// Sequential identity assigned to a component type at registration.
pub type ComponentId = u32;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Copy`: No heap allocations, bitwise copyable
/// - `Pod`: Plain old data, no reference fields at any depth
/// - `Zeroable`: Can be safely zeroed
///
/// A type holding a `Vec`, `String`, reference or pointer cannot satisfy
/// `Pod`, so it is rejected at compile time rather than at registration.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use slilib_ecs::Component;
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position {
///     x: f32,
///     y: f32,
///     z: f32,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: Copy + Pod + Zeroable + Send + Sync + 'static {}

/// Bit address of a component inside a [`crate::CompositionMask`].
///
/// Derived from the component id: `chunk = id >> 6`, `bit = id & 63`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentCode {
    chunk: u8,
    bit: u8,
}

impl ComponentCode {
    /// Derives the code for a component id.
    ///
    /// Returns `None` for ids at or beyond [`MAX_COMPONENTS`].
    #[inline]
    #[must_use]
    pub const fn from_id(id: ComponentId) -> Option<Self> {
        if id as usize >= MAX_COMPONENTS {
            return None;
        }
        Some(Self {
            chunk: (id >> 6) as u8,
            bit: (id & 63) as u8,
        })
    }

    /// Converts the code back to its component id.
    #[inline]
    #[must_use]
    pub const fn to_id(self) -> ComponentId {
        ((self.chunk as u32) << 6) | self.bit as u32
    }

    /// Index of the 64-bit word holding this component.
    #[inline]
    #[must_use]
    pub const fn chunk(self) -> usize {
        self.chunk as usize
    }

    /// Bit position within the word.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> usize {
        self.bit as usize
    }
}

impl fmt::Display for ComponentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.chunk, self.bit)
    }
}

/// Metadata recorded for a registered component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentInfo {
    /// Sequential registry id.
    pub id: ComponentId,
    /// Size of one value in bytes.
    pub size: usize,
    /// Alignment of one value in bytes.
    pub align: usize,
    /// Rust type identity.
    pub type_id: TypeId,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
    /// Bit address within composition masks.
    pub code: ComponentCode,
}

impl ComponentInfo {
    pub(crate) fn of<T: Component>(id: ComponentId, code: ComponentCode) -> Self {
        Self {
            id,
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    impl Component for Position {}

    #[test]
    fn test_code_round_trip() {
        for id in [0u32, 1, 63, 64, 65, 127, 1000, 4095] {
            let code = ComponentCode::from_id(id).unwrap();
            assert_eq!(code.to_id(), id);
        }
    }

    #[test]
    fn test_code_layout() {
        let code = ComponentCode::from_id(70).unwrap();
        assert_eq!(code.chunk(), 1);
        assert_eq!(code.bit(), 6);
        assert_eq!(code.to_string(), "1|6");
        assert!(ComponentCode::from_id(4096).is_none());
    }

    #[test]
    fn test_info_records_layout() {
        let code = ComponentCode::from_id(3).unwrap();
        let info = ComponentInfo::of::<Position>(3, code);
        assert_eq!(info.size, 12);
        assert_eq!(info.align, 4);
        assert_eq!(info.type_id, TypeId::of::<Position>());
        assert!(info.type_name.ends_with("Position"));

        let value = Position { x: 1.0, y: 2.0, z: 3.0 };
        assert_eq!(bytemuck::bytes_of(&value).len(), info.size);
    }
}
