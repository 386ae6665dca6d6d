use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Stable handle to a particle. Survives removal of other particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ParticleHandle(pub GenerationalId);

impl ParticleHandle {
    pub fn new(slot: usize, generation: u32) -> Self {
        Self(GenerationalId::new(slot, generation))
    }

    pub fn slot(&self) -> usize {
        self.0.index
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    dense: Option<usize>,
}

/// Maps generational handles onto a densely packed array.
///
/// Particles live in a contiguous `Vec` that is compacted with `swap_remove`; this map
/// keeps every outstanding handle pointing at the right dense index after each removal.
#[derive(Debug, Default, Clone)]
pub struct HandleMap {
    slots: Vec<Slot>,
    owners: Vec<usize>,
    free_list: VecDeque<usize>,
}

impl HandleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the next dense element (index `len()`) and returns its handle.
    pub fn push(&mut self) -> ParticleHandle {
        let dense = self.owners.len();
        if let Some(slot) = self.free_list.pop_front() {
            let entry = &mut self.slots[slot];
            entry.dense = Some(dense);
            self.owners.push(slot);
            return ParticleHandle::new(slot, entry.generation);
        }

        let slot = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            dense: Some(dense),
        });
        self.owners.push(slot);
        ParticleHandle::new(slot, 0)
    }

    pub fn resolve(&self, handle: ParticleHandle) -> Option<usize> {
        self.slots
            .get(handle.slot())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.dense)
    }

    /// Invalidates `handle` and returns the dense index it occupied.
    ///
    /// The caller must `swap_remove` that index from every parallel array: the last
    /// element is re-pointed to the vacated index here.
    pub fn remove(&mut self, handle: ParticleHandle) -> Option<usize> {
        let dense = self.resolve(handle)?;
        let slot = handle.slot();

        let entry = &mut self.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        entry.dense = None;
        self.free_list.push_back(slot);

        self.owners.swap_remove(dense);
        if let Some(&moved_slot) = self.owners.get(dense) {
            self.slots[moved_slot].dense = Some(dense);
        }
        Some(dense)
    }

    pub fn handle_at(&self, dense: usize) -> Option<ParticleHandle> {
        let slot = *self.owners.get(dense)?;
        Some(ParticleHandle::new(slot, self.slots[slot].generation))
    }

    pub fn handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.owners
            .iter()
            .map(move |&slot| ParticleHandle::new(slot, self.slots[slot].generation))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn clear(&mut self) {
        for &slot in &self.owners {
            let entry = &mut self.slots[slot];
            entry.generation = entry.generation.wrapping_add(1);
            entry.dense = None;
            self.free_list.push_back(slot);
        }
        self.owners.clear();
    }
}
