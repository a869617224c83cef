//! Static storage layouts compiled from closed component kind sets.
//!
//! Extension modules declare, per holder type, which component kinds their
//! factories produce. The capability scanner delivers those declarations into
//! a [`Plan`], which validates them as they arrive and, once every module has
//! reported, [freezes](Plan::freeze) into a [`Layout`]: the closed set of
//! kinds known for that holder type, with a precomputed raw id to slot table.
//!
//! A frozen layout instantiates [`Compiled`] storage per holder instance: one
//! direct slot per closed-set kind, reached by a single array index with no
//! hashing and no branching on the identifier, plus a hashed overflow store
//! consulted only when a lookup misses the compiled slots. This is the
//! record-type-from-a-startup-schema idea rendered as a slot dispatch table
//! rather than runtime code emission.
//!
//! Freezing happens once, single-threaded, during startup, strictly before
//! any holder instance exists. A holder type either has a layout or it does
//! not; the choice is never re-evaluated.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use crate::component::{Component, Identifier, Kind, RawId, Registry};
use crate::container::{Container, Hashed, KindSet};
use crate::error::{ConflictError, StartupError, ValidationError};

/// Sentinel in the raw id to slot table for ids outside the closed set.
const SLOT_NONE: u32 = u32::MAX;

/// A component-producing callback declared by an extension module.
///
/// The two legal producer signatures: no arguments, or a single
/// holder-context argument. Anything else the scanner reports is rejected
/// when the plan freezes.
pub enum Producer<H> {
    /// Produces a component from nothing.
    Unit(fn() -> Box<dyn Component>),
    /// Produces a component from the holder under construction.
    FromHolder(Box<dyn Fn(&H) -> Box<dyn Component> + Send + Sync>),
}

impl<H> Producer<H> {
    /// Number of holder-context arguments this producer declares.
    #[inline]
    fn arity(&self) -> usize {
        match self {
            Producer::Unit(_) => 0,
            Producer::FromHolder(_) => 1,
        }
    }

    #[inline]
    fn produce(&self, holder: &H) -> Box<dyn Component> {
        match self {
            Producer::Unit(f) => f(),
            Producer::FromHolder(f) => f(holder),
        }
    }
}

struct Declaration<H> {
    module: String,
    id: Identifier,
    /// Holder-context argument count the scanner reported. Producers built
    /// in-process always declare 0 or 1; foreign declarations may not.
    arity: usize,
    producer: Producer<H>,
}

/// The pre-freeze collection of component declarations for holder type `H`.
///
/// Fed once from the capability scanner's closed table. Declarations are
/// validated as they arrive: the identifier must match the registered
/// pattern, and a second factory for the same identifier on the same holder
/// type is a startup conflict naming both modules.
pub struct Plan<H> {
    declarations: Vec<Declaration<H>>,
    /// Declaring module per identifier, for duplicate attribution.
    modules: HashMap<Identifier, String>,
}

impl<H: 'static> Default for Plan<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: 'static> Plan<H> {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            modules: HashMap::new(),
        }
    }

    /// Record a declaration from an in-process producer.
    pub fn declare(
        &mut self,
        module: &str,
        id: &str,
        producer: Producer<H>,
    ) -> Result<(), StartupError> {
        let arity = producer.arity();
        self.record(module, id, arity, producer)
    }

    /// Record a declaration as reported by the capability scanner, with the
    /// holder-context argument count it observed. Declarations with more than
    /// one such argument are representable here and rejected at freeze.
    pub fn declare_scanned(
        &mut self,
        module: &str,
        id: &str,
        arity: usize,
        producer: Producer<H>,
    ) -> Result<(), StartupError> {
        self.record(module, id, arity, producer)
    }

    fn record(
        &mut self,
        module: &str,
        id: &str,
        arity: usize,
        producer: Producer<H>,
    ) -> Result<(), StartupError> {
        let id = Identifier::new(id)?;
        if let Some(previous) = self.modules.get(&id) {
            return Err(ConflictError::DuplicateFactory {
                holder: type_name::<H>(),
                id,
                module: module.to_owned(),
                previous: previous.clone(),
            }
            .into());
        }

        self.modules.insert(id.clone(), module.to_owned());
        self.declarations.push(Declaration {
            module: module.to_owned(),
            id,
            arity,
            producer,
        });
        Ok(())
    }

    /// Number of recorded declarations.
    #[inline]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check whether no declarations were recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Freeze the plan into an immutable layout. Closed world: no further
    /// identifiers may be declared for this holder type afterwards.
    ///
    /// Every declaration is validated against its scanned signature and
    /// resolved through the registry; any failure aborts startup with an
    /// error naming the offending module.
    pub fn freeze(self, registry: &Registry) -> Result<Arc<Layout<H>>, StartupError> {
        let mut compiled = Vec::with_capacity(self.declarations.len());
        for declaration in self.declarations {
            if declaration.arity > 1 {
                return Err(ValidationError::Signature {
                    holder: type_name::<H>(),
                    id: declaration.id,
                    module: declaration.module,
                    arity: declaration.arity,
                }
                .into());
            }
            let Some(kind) = registry.get(&declaration.id) else {
                return Err(StartupError::Unregistered {
                    holder: type_name::<H>(),
                    id: declaration.id,
                    module: declaration.module,
                });
            };
            compiled.push((kind, declaration.producer));
        }

        // Slot order is raw id ascending, which is registration order.
        compiled.sort_by_key(|(kind, _)| kind.raw());

        let min_raw = compiled.first().map_or(0, |(kind, _)| kind.raw().value());
        let max_raw = compiled.last().map_or(0, |(kind, _)| kind.raw().value());
        let mut slot_table = vec![SLOT_NONE; (max_raw - min_raw + 1) as usize];
        let mut keys = KindSet::new();
        let mut kinds = Vec::with_capacity(compiled.len());
        let mut producers = Vec::with_capacity(compiled.len());
        for (slot, (kind, producer)) in compiled.into_iter().enumerate() {
            slot_table[(kind.raw().value() - min_raw) as usize] = slot as u32;
            keys.insert(kind.raw());
            kinds.push(kind);
            producers.push(producer);
        }

        log::info!(
            "froze component layout for {}: {} kinds",
            type_name::<H>(),
            kinds.len()
        );

        Ok(Arc::new(Layout {
            kinds,
            producers,
            min_raw,
            slot_table,
            keys,
        }))
    }
}

/// Direct handle to one compiled slot, resolved once against a [`Layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(usize);

/// The frozen storage layout for holder type `H`.
///
/// Immutable after [`Plan::freeze`]; shared by every container it
/// instantiates, so post-startup access needs no locking.
pub struct Layout<H> {
    /// Closed kind set, raw id ascending.
    kinds: Vec<Arc<Kind>>,
    /// Parallel to `kinds`; run in that order at instantiation.
    producers: Vec<Producer<H>>,
    min_raw: u32,
    /// Maps `raw - min_raw` to a slot index, `SLOT_NONE` for gaps.
    slot_table: Vec<u32>,
    keys: KindSet,
}

impl<H: 'static> Layout<H> {
    /// The closed kind set, in slot order.
    #[inline]
    pub fn kinds(&self) -> &[Arc<Kind>] {
        &self.kinds
    }

    /// Number of kinds in the closed set.
    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check whether the closed set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The closed set of raw ids as a key set.
    #[inline]
    pub fn keys(&self) -> &KindSet {
        &self.keys
    }

    /// Check whether a kind is in the closed set.
    #[inline]
    pub fn contains(&self, kind: &Kind) -> bool {
        self.slot_index(kind.raw()).is_some()
    }

    /// Resolve a kind to its direct slot, if it is in the closed set.
    ///
    /// Resolving once at startup and accessing through the returned [`Slot`]
    /// gives field-style access with no per-lookup identifier work at all.
    #[inline]
    pub fn slot(&self, kind: &Kind) -> Option<Slot> {
        self.slot_index(kind.raw()).map(Slot)
    }

    #[inline]
    fn slot_index(&self, raw: RawId) -> Option<usize> {
        let offset = raw.value().checked_sub(self.min_raw)? as usize;
        match self.slot_table.get(offset) {
            Some(&slot) if slot != SLOT_NONE => Some(slot as usize),
            _ => None,
        }
    }

    /// Allocate storage for one holder instance, running every producer in
    /// slot order to fill its direct slot.
    pub fn instantiate(self: &Arc<Self>, holder: &H) -> Compiled<H> {
        let mut slots = Vec::with_capacity(self.producers.len());
        for producer in &self.producers {
            slots.push(Some(producer.produce(holder)));
        }
        Compiled {
            occupied: slots.len(),
            layout: Arc::clone(self),
            slots,
            overflow: Hashed::new(),
        }
    }
}

/// Specialized per-instance storage compiled from a [`Layout`].
///
/// One direct slot per closed-set kind; lookups for kinds outside the closed
/// set fall through to a hashed overflow store, so the generic [`Container`]
/// contract still holds for every registered kind. Kinds outside a frozen
/// closed set are by construction sparse relative to it, hence the hashed
/// overflow.
pub struct Compiled<H> {
    layout: Arc<Layout<H>>,
    /// Parallel to `layout.kinds`.
    slots: Vec<Option<Box<dyn Component>>>,
    occupied: usize,
    overflow: Hashed,
}

impl<H: 'static> Compiled<H> {
    /// The layout this storage was compiled from.
    #[inline]
    pub fn layout(&self) -> &Arc<Layout<H>> {
        &self.layout
    }

    /// Direct access to a compiled slot: one array index, no hashing, no
    /// branching on the identifier.
    #[inline]
    pub fn direct(&self, slot: Slot) -> Option<&dyn Component> {
        self.slots[slot.0].as_deref()
    }

    /// Direct mutable access to a compiled slot.
    #[inline]
    pub fn direct_mut(&mut self, slot: Slot) -> Option<&mut dyn Component> {
        match &mut self.slots[slot.0] {
            Some(value) => Some(value.as_mut()),
            None => None,
        }
    }
}

impl<H: 'static> Container for Compiled<H> {
    fn get(&self, kind: &Kind) -> Option<&dyn Component> {
        match self.layout.slot_index(kind.raw()) {
            Some(slot) => self.slots[slot].as_deref(),
            None => self.overflow.get(kind),
        }
    }

    fn get_mut(&mut self, kind: &Kind) -> Option<&mut dyn Component> {
        match self.layout.slot_index(kind.raw()) {
            Some(slot) => match &mut self.slots[slot] {
                Some(value) => Some(value.as_mut()),
                None => None,
            },
            None => self.overflow.get_mut(kind),
        }
    }

    fn put(&mut self, kind: Arc<Kind>, value: Box<dyn Component>) -> Option<Box<dyn Component>> {
        match self.layout.slot_index(kind.raw()) {
            Some(slot) => {
                let previous = self.slots[slot].replace(value);
                if previous.is_none() {
                    self.occupied += 1;
                }
                previous
            }
            None => self.overflow.put(kind, value),
        }
    }

    fn for_each(&self, f: &mut dyn FnMut(&Kind, &dyn Component)) {
        // Overflow ids may sit anywhere relative to the closed set; merge the
        // two raw-ascending sequences so the combined order stays ascending.
        let mut overflow = self.overflow.sorted_entries().peekable();
        for (index, slot) in self.slots.iter().enumerate() {
            let kind = &self.layout.kinds[index];
            while let Some(entry) = overflow.peek() {
                if entry.kind.raw() >= kind.raw() {
                    break;
                }
                f(&entry.kind, entry.value.as_ref());
                overflow.next();
            }
            if let Some(component) = slot {
                f(kind, component.as_ref());
            }
        }
        for entry in overflow {
            f(&entry.kind, entry.value.as_ref());
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.occupied + self.overflow.len()
    }

    fn keys(&self) -> KindSet {
        let mut keys: KindSet = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| self.layout.kinds[index].raw()))
            .collect();
        keys.union_with(&self.overflow.keys());
        keys
    }

    fn raw_range(&self) -> Option<(RawId, RawId)> {
        let mut occupied = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| self.layout.kinds[index].raw()));
        let direct = occupied.next().map(|first| {
            let last = occupied.last().unwrap_or(first);
            (first, last)
        });
        match (direct, self.overflow.raw_range()) {
            (Some((a, b)), Some((c, d))) => Some((a.min(c), b.max(d))),
            (Some(range), None) | (None, Some(range)) => Some(range),
            (None, None) => None,
        }
    }
}
