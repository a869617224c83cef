//! Component identity: identifiers, kinds, and the process-wide registry.
//!
//! A *component* is a typed piece of extension data attached to a holder
//! object (an entity, item, block, world...). Extension modules register the
//! component kinds they contribute with the [`Registry`], which assigns each
//! identifier a dense, process-stable [`RawId`]. Containers store components
//! keyed by that raw id instead of the string identifier.
//!
//! ## Thread safety
//!
//! The [`Registry`] is the only cross-instance shared mutable state in the
//! subsystem. Lookups are lock-free; registration takes a mutex around the
//! register-check-insert sequence and republishes an immutable snapshot of all
//! known kinds after each successful insert.

use std::any::{Any, TypeId};
use std::fmt;

use crate::tag::Tag;

mod identifier;
mod registry;

pub use identifier::Identifier;
pub use registry::Registry;

/// The dense integer identity assigned to a component kind by the registry.
///
/// Raw ids are assigned in increasing order starting at 0, are stable for the
/// process lifetime, unique per identifier, and never reused.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawId(u32);

impl RawId {
    /// Construct a raw id from its integer value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The integer value of this raw id.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Get the index of this raw id for use in indexable storage (e.g. Vec).
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for RawId {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for RawId {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A piece of extension data attachable to a holder instance.
///
/// Components implement their own serialization: [`save`](Component::save)
/// writes the component's state as a [`Tag`], [`load`](Component::load)
/// restores it in place from a previously saved tag. The container codec
/// delegates per-component payloads to these methods and treats them as
/// opaque.
pub trait Component: Any + Send + Sync {
    /// Serialize this component's state.
    fn save(&self) -> Tag;

    /// Restore this component's state from a previously saved tag.
    ///
    /// Implementations should tolerate missing or unexpected fields; old data
    /// read by a newer module must not crash.
    fn load(&mut self, tag: &Tag);
}

impl dyn Component {
    /// Check whether the concrete type of this component is `C`.
    #[inline]
    pub fn is<C: Component>(&self) -> bool {
        (self as &dyn Any).is::<C>()
    }

    /// Downcast a shared reference to the concrete component type.
    #[inline]
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        (self as &dyn Any).downcast_ref()
    }

    /// Downcast a mutable reference to the concrete component type.
    #[inline]
    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        (self as &mut dyn Any).downcast_mut()
    }
}

/// A registered component kind: identifier, value type, and raw id.
///
/// Exactly one `Kind` exists per identifier; it is created by the registry and
/// handed out as an `Arc`. Holders and containers reference kinds, they never
/// create them.
#[derive(Debug)]
pub struct Kind {
    id: Identifier,
    raw: RawId,
    type_id: TypeId,
    type_name: &'static str,
}

impl Kind {
    /// Only the registry constructs kinds.
    pub(crate) fn new<C: Component>(id: Identifier, raw: RawId) -> Self {
        Self {
            id,
            raw,
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
        }
    }

    /// The globally unique identifier of this kind.
    #[inline]
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// The dense raw id assigned by the registry.
    #[inline]
    pub fn raw(&self) -> RawId {
        self.raw
    }

    /// The `TypeId` of the value type implementing this kind.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The name of the value type, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether `C` is the value type of this kind.
    #[inline]
    pub fn is_type<C: Component>(&self) -> bool {
        self.type_id == TypeId::of::<C>()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (raw {})", self.id, self.raw)
    }
}
