//! Channel table: fixed-capacity descriptors for active streams.
//!
//! Each non-empty slot holds the mix-time parameters of one stream. The
//! slot refers to the stream by handle only; the registry owns the
//! decoder. A slot is occupied exactly while its handle is live in the
//! registry.

use alt_common::{DuckingProfile, SampleCategory, StreamHandle, MAX_CHANNELS};

/// Mix-time parameters for one active stream.
#[derive(Clone, Debug)]
pub struct ChannelSlot {
    pub handle: StreamHandle,
    /// Base gain: sample gain × category base gain.
    pub gain: f32,
    /// Dynamic ducking multiplier (1.0 = no duck), recomputed whenever
    /// the active set changes.
    pub ducking: f32,
    pub looped: bool,
    /// Behavior category (jingle already collapsed to music).
    pub category: SampleCategory,
    /// Ducking profile this stream imposes on categories it ducks.
    pub duck_profile: DuckingProfile,
    /// Start order, for oldest-first eviction.
    pub started_seq: u64,
}

/// Fixed-size table of active-stream descriptors.
pub struct ChannelTable {
    slots: [Option<ChannelSlot>; MAX_CHANNELS],
    next_seq: u64,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
            next_seq: 0,
        }
    }

    /// Place a descriptor in the first free slot. Returns the slot index,
    /// or `None` when the table is full.
    pub fn allocate(&mut self, mut slot: ChannelSlot) -> Option<usize> {
        let index = self.slots.iter().position(Option::is_none)?;
        slot.started_seq = self.next_seq;
        self.next_seq += 1;
        self.slots[index] = Some(slot);
        Some(index)
    }

    /// Free the slot referencing `handle`, if any.
    pub fn release_handle(&mut self, handle: StreamHandle) -> Option<ChannelSlot> {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|s| s.handle == handle) {
                return slot.take();
            }
        }
        None
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Occupied slots, oldest allocation order not guaranteed.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelSlot> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelSlot> {
        self.slots.iter_mut().flatten()
    }

    /// Active stream count across all categories.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn count_category(&self, category: SampleCategory) -> usize {
        let key = category.behavior_key();
        self.iter().filter(|s| s.category == key).count()
    }

    /// Handle of the earliest-started stream in a category.
    pub fn oldest_in_category(&self, category: SampleCategory) -> Option<StreamHandle> {
        let key = category.behavior_key();
        self.iter()
            .filter(|s| s.category == key)
            .min_by_key(|s| s.started_seq)
            .map(|s| s.handle)
    }

    /// Handles of every stream in a category.
    pub fn handles_in_category(&self, category: SampleCategory) -> Vec<StreamHandle> {
        let key = category.behavior_key();
        self.iter()
            .filter(|s| s.category == key)
            .map(|s| s.handle)
            .collect()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}
