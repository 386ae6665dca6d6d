use glam::Vec2;

use crate::{utils::allocator::ParticleHandle, world::spawner::SpawnRequest};

/// Structural changes requested between steps.
///
/// Removals are applied before additions so a queued removal can never hit a
/// particle created in the same batch.
#[derive(Debug, Default, Clone)]
pub struct CommandQueue {
    adds: Vec<SpawnRequest>,
    removals: Vec<ParticleHandle>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_add(&mut self, position: Vec2, velocity: Vec2) {
        self.adds.push(SpawnRequest::new(position, velocity));
    }

    pub fn push_remove(&mut self, handle: ParticleHandle) {
        if !self.removals.contains(&handle) {
            self.removals.push(handle);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removals.is_empty()
    }

    pub fn pending(&self) -> (usize, usize) {
        (self.adds.len(), self.removals.len())
    }

    /// Takes every queued change, leaving the queue empty.
    pub fn drain(&mut self) -> (Vec<ParticleHandle>, Vec<SpawnRequest>) {
        (
            std::mem::take(&mut self.removals),
            std::mem::take(&mut self.adds),
        )
    }
}
