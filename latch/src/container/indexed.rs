use std::sync::Arc;

use crate::component::{Component, Kind, RawId};
use crate::container::{Container, Entry, KindSet};

/// Dense slot array storage, indexed by `raw - min_raw`.
///
/// Access is a single bounds-checked array index; memory cost is proportional
/// to the width of the stored raw id range, occupied or not. The slot vector
/// grows toward higher ids on demand and shifts toward lower ones when a put
/// arrives below `min_raw`, so ids outside the pre-sized universe are still
/// valid, they just cost a reallocation. Picking [`Hashed`] instead for
/// pathologically wide ranges is the feedback factory's job, not this
/// container's.
///
/// [`Hashed`]: crate::container::Hashed
pub struct Indexed {
    /// Raw id stored in slot 0.
    min_raw: u32,
    slots: Vec<Option<Entry>>,
    occupied: usize,
}

impl Default for Indexed {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexed {
    /// Create an empty container with no sizing hint.
    pub fn new() -> Self {
        Self {
            min_raw: 0,
            slots: Vec::new(),
            occupied: 0,
        }
    }

    /// Create an empty container pre-sized to a universe of `width` slots
    /// starting at `min`.
    pub fn with_universe(min: RawId, width: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(width, || None);
        Self {
            min_raw: min.value(),
            slots,
            occupied: 0,
        }
    }

    /// Width of the currently allocated slot range.
    #[inline]
    pub fn universe_width(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot_index(&self, raw: u32) -> Option<usize> {
        raw.checked_sub(self.min_raw).map(|offset| offset as usize)
    }
}

impl Container for Indexed {
    fn get(&self, kind: &Kind) -> Option<&dyn Component> {
        let index = self.slot_index(kind.raw().value())?;
        match self.slots.get(index) {
            Some(Some(entry)) => Some(entry.value.as_ref()),
            _ => None,
        }
    }

    fn get_mut(&mut self, kind: &Kind) -> Option<&mut dyn Component> {
        let index = self.slot_index(kind.raw().value())?;
        match self.slots.get_mut(index) {
            Some(Some(entry)) => Some(entry.value.as_mut()),
            _ => None,
        }
    }

    fn put(&mut self, kind: Arc<Kind>, value: Box<dyn Component>) -> Option<Box<dyn Component>> {
        let raw = kind.raw().value();
        if self.slots.is_empty() {
            self.min_raw = raw;
        } else if raw < self.min_raw {
            // Shift the universe down so slot 0 holds the new minimum.
            let shift = (self.min_raw - raw) as usize;
            let mut shifted = Vec::with_capacity(self.slots.len() + shift);
            shifted.resize_with(shift, || None);
            shifted.append(&mut self.slots);
            self.slots = shifted;
            self.min_raw = raw;
        }

        let index = (raw - self.min_raw) as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        let previous = self.slots[index].replace(Entry { kind, value });
        if previous.is_none() {
            self.occupied += 1;
        }
        previous.map(|entry| entry.value)
    }

    fn for_each(&self, f: &mut dyn FnMut(&Kind, &dyn Component)) {
        for entry in self.slots.iter().flatten() {
            f(&entry.kind, entry.value.as_ref());
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.occupied
    }

    fn keys(&self) -> KindSet {
        self.slots
            .iter()
            .flatten()
            .map(|entry| entry.kind.raw())
            .collect()
    }

    fn raw_range(&self) -> Option<(RawId, RawId)> {
        let mut occupied = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| index));
        let first = occupied.next()?;
        let last = occupied.last().unwrap_or(first);
        Some((
            RawId::new(self.min_raw + first as u32),
            RawId::new(self.min_raw + last as u32),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::{Marked, kind};

    #[test]
    fn stores_relative_to_the_lowest_raw_id() {
        // Given
        let mut container = Indexed::new();

        // When: first put anchors the universe at raw 10.
        container.put(kind(10), Box::new(Marked(10)));
        container.put(kind(12), Box::new(Marked(12)));

        // Then
        assert_eq!(container.universe_width(), 3);
        assert_eq!(container.len(), 2);
        assert_eq!(container.raw_range(), Some((RawId::new(10), RawId::new(12))));
    }

    #[test]
    fn put_below_minimum_shifts_the_universe() {
        // Given
        let mut container = Indexed::new();
        container.put(kind(10), Box::new(Marked(10)));

        // When
        container.put(kind(4), Box::new(Marked(4)));

        // Then: both survive the shift.
        assert_eq!(container.universe_width(), 7);
        let as_dyn = &container as &dyn Container;
        assert_eq!(as_dyn.get_as::<Marked>(&kind(10)).map(|m| m.0), Some(10));
        assert_eq!(as_dyn.get_as::<Marked>(&kind(4)).map(|m| m.0), Some(4));
        assert_eq!(container.raw_range(), Some((RawId::new(4), RawId::new(10))));
    }

    #[test]
    fn pre_sized_universe_does_not_count_as_occupancy() {
        // Given
        let container = Indexed::with_universe(RawId::new(5), 8);

        // Then
        assert!(container.is_empty());
        assert!(container.raw_range().is_none());
        assert_eq!(container.universe_width(), 8);
    }

    #[test]
    fn gets_below_the_minimum_are_absent() {
        // Given
        let mut container = Indexed::new();
        container.put(kind(10), Box::new(Marked(10)));

        // Then: no underflow on ids below the anchored minimum.
        assert!(container.get(&kind(3)).is_none());
        assert!(container.get(&kind(11)).is_none());
    }

    #[test]
    fn iteration_is_raw_id_ascending() {
        // Given
        let mut container = Indexed::new();
        container.put(kind(9), Box::new(Marked(9)));
        container.put(kind(2), Box::new(Marked(2)));
        container.put(kind(5), Box::new(Marked(5)));

        // When
        let mut order = Vec::new();
        container.for_each(&mut |k, _| order.push(k.raw().value()));

        // Then
        assert_eq!(order, [2, 5, 9]);
    }
}
