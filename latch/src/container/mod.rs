//! Per-holder component storage.
//!
//! A [`Container`] maps the raw ids of registered component kinds to component
//! values for one holder instance. The key set is append-only: once a kind is
//! present it is never removed, though its value may be replaced in place.
//! Containers are single-owner state; they are not synchronized internally.
//!
//! Two interchangeable strategies implement the contract: [`Indexed`] backs
//! storage with a dense slot array offset by the lowest stored raw id, and
//! [`Hashed`] backs it with a hash map. [`Adaptive`] wraps either behind one
//! type; which strategy a holder type ends up with is the feedback factory's
//! decision, the container itself is oblivious to why it was picked.

use std::fmt;
use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::component::{Component, Kind, RawId};

pub mod codec;
mod hashed;
mod indexed;

pub use hashed::Hashed;
pub use indexed::Indexed;

/// One stored component and the kind it is stored under.
pub(crate) struct Entry {
    pub(crate) kind: Arc<Kind>,
    pub(crate) value: Box<dyn Component>,
}

/// Generic per-holder component storage.
///
/// The canonical key is the kind's raw id; the [`Kind`] is carried alongside
/// so iteration and serialization can recover the identifier. Lookups for
/// kinds a holder does not carry return `None`: "holder lacks this kind of
/// component" is an expected, non-exceptional outcome, never an error.
///
/// Callers must only [`put`](Container::put) a value whose concrete type is
/// the kind's registered value type.
pub trait Container {
    /// Get the component stored under the given kind, if present.
    fn get(&self, kind: &Kind) -> Option<&dyn Component>;

    /// Get the component stored under the given kind, mutably.
    fn get_mut(&mut self, kind: &Kind) -> Option<&mut dyn Component>;

    /// Insert or replace the component stored under the given kind, returning
    /// the replaced value. There is no remove: the key set only grows.
    fn put(&mut self, kind: Arc<Kind>, value: Box<dyn Component>)
    -> Option<Box<dyn Component>>;

    /// Check whether a component is stored under the given kind.
    #[inline]
    fn contains(&self, kind: &Kind) -> bool {
        self.get(kind).is_some()
    }

    /// Visit every stored component in raw id ascending order.
    fn for_each(&self, f: &mut dyn FnMut(&Kind, &dyn Component));

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Check whether the container stores no components.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored raw id key set.
    fn keys(&self) -> KindSet;

    /// The lowest and highest raw id currently stored, if any. This is the
    /// observed universe the feedback factory tunes from.
    fn raw_range(&self) -> Option<(RawId, RawId)>;
}

impl dyn Container {
    /// Get the component stored under the given kind, downcast to its
    /// concrete type.
    #[inline]
    pub fn get_as<C: Component>(&self, kind: &Kind) -> Option<&C> {
        self.get(kind)?.downcast_ref()
    }

    /// Get the component stored under the given kind, downcast mutably.
    #[inline]
    pub fn get_as_mut<C: Component>(&mut self, kind: &Kind) -> Option<&mut C> {
        self.get_mut(kind)?.downcast_mut()
    }
}

/// Storage strategy recommendation shared between the adaptive container and
/// the feedback factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Dense slot array indexed by `raw - min_raw`.
    Indexed,
    /// Hash map keyed by raw id.
    Hashed,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Indexed => write!(f, "indexed"),
            Strategy::Hashed => write!(f, "hashed"),
        }
    }
}

/// A set of component kinds, keyed by raw id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindSet {
    bits: FixedBitSet,
    length: usize,
}

impl KindSet {
    /// Create an empty set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw id. Returns whether the set changed.
    pub fn insert(&mut self, raw: RawId) -> bool {
        let index = raw.index();
        self.bits.grow(index + 1);
        let inserted = !self.bits.put(index);
        if inserted {
            self.length += 1;
        }
        inserted
    }

    /// Check whether the set contains a raw id.
    #[inline]
    pub fn contains(&self, raw: RawId) -> bool {
        self.bits.contains(raw.index())
    }

    /// Merge another set into this one.
    pub fn union_with(&mut self, other: &Self) {
        self.bits.union_with(&other.bits);
        self.length = self.bits.count_ones(..);
    }

    /// Check whether this set contains every raw id in another set.
    #[inline]
    pub fn is_superset(&self, other: &Self) -> bool {
        self.bits.is_superset(&other.bits)
    }

    /// Number of raw ids in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Iterate over the raw ids in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = RawId> + '_ {
        self.bits.ones().map(RawId::from)
    }
}

impl FromIterator<RawId> for KindSet {
    fn from_iter<I: IntoIterator<Item = RawId>>(iter: I) -> Self {
        let mut set = Self::new();
        for raw in iter {
            set.insert(raw);
        }
        set
    }
}

/// A container that is either [`Indexed`] or [`Hashed`] behind one type.
///
/// Both strategies behave identically under the [`Container`] contract; the
/// choice only affects memory and access cost.
pub enum Adaptive {
    Indexed(Indexed),
    Hashed(Hashed),
}

impl Adaptive {
    /// Create an empty container using the given strategy, with no sizing
    /// hint.
    pub fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Indexed => Adaptive::Indexed(Indexed::new()),
            Strategy::Hashed => Adaptive::Hashed(Hashed::new()),
        }
    }

    /// Create an indexed container pre-sized to the given universe, if one is
    /// known.
    pub fn indexed(universe: Option<(RawId, RawId)>) -> Self {
        match universe {
            Some((min, max)) => {
                let width = (max.value() - min.value() + 1) as usize;
                Adaptive::Indexed(Indexed::with_universe(min, width))
            }
            None => Adaptive::Indexed(Indexed::new()),
        }
    }

    /// Create a hashed container pre-sized to the expected entry count.
    pub fn hashed(expected: usize) -> Self {
        Adaptive::Hashed(Hashed::with_capacity(expected))
    }

    /// The strategy backing this container.
    #[inline]
    pub fn strategy(&self) -> Strategy {
        match self {
            Adaptive::Indexed(_) => Strategy::Indexed,
            Adaptive::Hashed(_) => Strategy::Hashed,
        }
    }
}

impl Container for Adaptive {
    #[inline]
    fn get(&self, kind: &Kind) -> Option<&dyn Component> {
        match self {
            Adaptive::Indexed(c) => c.get(kind),
            Adaptive::Hashed(c) => c.get(kind),
        }
    }

    #[inline]
    fn get_mut(&mut self, kind: &Kind) -> Option<&mut dyn Component> {
        match self {
            Adaptive::Indexed(c) => c.get_mut(kind),
            Adaptive::Hashed(c) => c.get_mut(kind),
        }
    }

    #[inline]
    fn put(
        &mut self,
        kind: Arc<Kind>,
        value: Box<dyn Component>,
    ) -> Option<Box<dyn Component>> {
        match self {
            Adaptive::Indexed(c) => c.put(kind, value),
            Adaptive::Hashed(c) => c.put(kind, value),
        }
    }

    fn for_each(&self, f: &mut dyn FnMut(&Kind, &dyn Component)) {
        match self {
            Adaptive::Indexed(c) => c.for_each(f),
            Adaptive::Hashed(c) => c.for_each(f),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            Adaptive::Indexed(c) => c.len(),
            Adaptive::Hashed(c) => c.len(),
        }
    }

    fn keys(&self) -> KindSet {
        match self {
            Adaptive::Indexed(c) => c.keys(),
            Adaptive::Hashed(c) => c.keys(),
        }
    }

    fn raw_range(&self) -> Option<(RawId, RawId)> {
        match self {
            Adaptive::Indexed(c) => c.raw_range(),
            Adaptive::Hashed(c) => c.raw_range(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for container tests.

    use std::sync::Arc;

    use crate::component::{Component, Identifier, Kind, RawId};
    use crate::tag::Tag;

    pub(crate) struct Marked(pub i32);

    impl Component for Marked {
        fn save(&self) -> Tag {
            Tag::Int(self.0)
        }

        fn load(&mut self, tag: &Tag) {
            if let Some(value) = tag.as_int() {
                self.0 = value;
            }
        }
    }

    /// Build a kind directly, bypassing the registry, for storage-only tests.
    pub(crate) fn kind(raw: u32) -> Arc<Kind> {
        let id = Identifier::new(&format!("test:k{raw}")).unwrap();
        Arc::new(Kind::new::<Marked>(id, RawId::new(raw)))
    }
}
