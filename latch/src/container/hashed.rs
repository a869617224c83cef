use std::collections::HashMap;
use std::sync::Arc;

use crate::component::{Component, Kind, RawId};
use crate::container::{Container, Entry, KindSet};

/// Hash map storage, keyed by raw id.
///
/// Amortized O(1) access with per-entry overhead independent of the raw id
/// range, which makes it the better fit when a holder's kinds are sparse
/// relative to the universe width. Iteration sorts keys so the observable
/// order matches [`Indexed`], raw id ascending.
///
/// [`Indexed`]: crate::container::Indexed
#[derive(Default)]
pub struct Hashed {
    entries: HashMap<u32, Entry>,
}

impl Hashed {
    /// Create an empty container with no sizing hint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container pre-sized for the expected entry count.
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(expected),
        }
    }

    /// Iterate entries in raw id ascending order.
    pub(crate) fn sorted_entries(&self) -> impl Iterator<Item = &Entry> {
        let mut ordered: Vec<&Entry> = self.entries.values().collect();
        ordered.sort_by_key(|entry| entry.kind.raw());
        ordered.into_iter()
    }
}

impl Container for Hashed {
    #[inline]
    fn get(&self, kind: &Kind) -> Option<&dyn Component> {
        self.entries
            .get(&kind.raw().value())
            .map(|entry| entry.value.as_ref())
    }

    #[inline]
    fn get_mut(&mut self, kind: &Kind) -> Option<&mut dyn Component> {
        self.entries
            .get_mut(&kind.raw().value())
            .map(|entry| entry.value.as_mut())
    }

    fn put(&mut self, kind: Arc<Kind>, value: Box<dyn Component>) -> Option<Box<dyn Component>> {
        self.entries
            .insert(kind.raw().value(), Entry { kind, value })
            .map(|entry| entry.value)
    }

    fn for_each(&self, f: &mut dyn FnMut(&Kind, &dyn Component)) {
        for entry in self.sorted_entries() {
            f(&entry.kind, entry.value.as_ref());
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> KindSet {
        self.entries.keys().map(|&raw| RawId::new(raw)).collect()
    }

    fn raw_range(&self) -> Option<(RawId, RawId)> {
        let min = self.entries.keys().min()?;
        let max = self.entries.keys().max().unwrap_or(min);
        Some((RawId::new(*min), RawId::new(*max)))
    }
}
