use std::collections::BTreeMap;

use crate::foundation::core::{CELLS, MAX_SLOTS, Position, SlotIndex};
use crate::foundation::error::{LcdError, LcdResult};

#[derive(Clone, Debug)]
struct SlotEntry {
    position: Position,
    stamp: u64,
}

/// Fixed pool of programmable glyph slots bound to display cells.
///
/// Recency is tracked with a monotonically increasing touch stamp. `recency`
/// maps stamp to position, so its first entry is always the assignment that
/// was programmed or reassigned longest ago. Reads never count as a touch.
#[derive(Clone, Debug)]
pub struct SlotCache {
    capacity: usize,
    slots: Vec<Option<SlotEntry>>,
    by_position: [Option<SlotIndex>; CELLS],
    recency: BTreeMap<u64, Position>,
    next_stamp: u64,
}

impl SlotCache {
    pub fn new(capacity: usize) -> LcdResult<Self> {
        if capacity == 0 || capacity > MAX_SLOTS {
            return Err(LcdError::validation(format!(
                "slot capacity must be in 1..={MAX_SLOTS}, got {capacity}"
            )));
        }
        Ok(Self {
            capacity,
            slots: vec![None; capacity],
            by_position: [None; CELLS],
            recency: BTreeMap::new(),
            next_stamp: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.recency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recency.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn lookup(&self, pos: Position) -> Option<SlotIndex> {
        self.by_position[pos.index()]
    }

    /// The cell a slot is currently bound to.
    pub fn owner(&self, slot: SlotIndex) -> Option<Position> {
        self.entry(slot).map(|e| e.position)
    }

    /// Mark the assignment at `pos` most recently used.
    pub fn touch(&mut self, pos: Position) -> Option<SlotIndex> {
        let slot = self.lookup(pos)?;
        let stamp = self.bump();
        let entry = self.slots[slot.index()].as_mut()?;
        self.recency.remove(&entry.stamp);
        entry.stamp = stamp;
        self.recency.insert(stamp, pos);
        Some(slot)
    }

    /// Bind the lowest-numbered free slot to `pos`.
    pub fn allocate(&mut self, pos: Position) -> LcdResult<SlotIndex> {
        if self.lookup(pos).is_some() {
            return Err(LcdError::validation(format!(
                "cell {pos} already holds a glyph slot"
            )));
        }
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(LcdError::CacheFull)?;
        let slot = SlotIndex::new(free)?;
        let stamp = self.bump();
        self.slots[free] = Some(SlotEntry {
            position: pos,
            stamp,
        });
        self.by_position[pos.index()] = Some(slot);
        self.recency.insert(stamp, pos);
        Ok(slot)
    }

    /// Remove and return the least recently touched assignment.
    pub fn evict_oldest(&mut self) -> LcdResult<(Position, SlotIndex)> {
        let (_, pos) = self.recency.pop_first().ok_or(LcdError::CacheEmpty)?;
        let slot = self.by_position[pos.index()]
            .take()
            .ok_or(LcdError::CacheEmpty)?;
        self.slots[slot.index()] = None;
        Ok((pos, slot))
    }

    /// Drop the assignment at `pos`, leaving every other entry's recency alone.
    pub fn release(&mut self, pos: Position) -> Option<SlotIndex> {
        let slot = self.by_position[pos.index()].take()?;
        if let Some(entry) = self.slots[slot.index()].take() {
            self.recency.remove(&entry.stamp);
        }
        Some(slot)
    }

    /// Assignments from least to most recently touched.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = (Position, SlotIndex)> + '_ {
        self.recency.values().filter_map(|pos| {
            self.by_position[pos.index()].map(|slot| (*pos, slot))
        })
    }

    fn entry(&self, slot: SlotIndex) -> Option<&SlotEntry> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }

    fn bump(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert!(self.len() <= self.capacity);
        let bound: Vec<_> = self.slots.iter().flatten().collect();
        assert_eq!(bound.len(), self.len());
        let mut seen_slots = [false; MAX_SLOTS];
        let mut seen_pos = [false; CELLS];
        for (pos, slot) in self.iter_oldest_first() {
            assert!(!seen_slots[slot.index()], "slot {slot} bound twice");
            assert!(!seen_pos[pos.index()], "cell {pos} bound twice");
            seen_slots[slot.index()] = true;
            seen_pos[pos.index()] = true;
            assert_eq!(self.owner(slot), Some(pos));
        }
        let indexed = self.by_position.iter().flatten().count();
        assert_eq!(indexed, self.len());
    }
}
