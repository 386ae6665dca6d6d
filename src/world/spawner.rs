use glam::Vec2;

use crate::config::SimulationConfig;

/// A particle the host wants created, with its initial velocity in units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl SpawnRequest {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }
}

/// Emission policy polled once at the start of every step.
pub trait Spawner: Send + Sync {
    fn poll(&mut self, config: &SimulationConfig) -> Vec<SpawnRequest>;
}

/// Emits one particle every `rate` steps from a fixed point.
///
/// The step counter increments on every poll that does not emit and resets after an
/// emission, so the first particle appears on poll `rate + 1`.
#[derive(Debug, Clone)]
pub struct IntervalEmitter {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rate: u32,
    /// Stop after this many particles.
    pub limit: Option<usize>,
    counter: u32,
    emitted: usize,
}

impl IntervalEmitter {
    pub fn new(position: Vec2, velocity: Vec2, rate: u32) -> Self {
        Self {
            position,
            velocity,
            rate,
            limit: None,
            counter: 0,
            emitted: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Spawner for IntervalEmitter {
    fn poll(&mut self, _config: &SimulationConfig) -> Vec<SpawnRequest> {
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return Vec::new();
        }
        if self.counter >= self.rate {
            self.counter = 0;
            self.emitted += 1;
            return vec![SpawnRequest::new(self.position, self.velocity)];
        }
        self.counter += 1;
        Vec::new()
    }
}

/// Lays out `rows × columns` particles in one go on the first poll.
///
/// Spacing is `particle_size * density`, so a density of 1 packs particles edge to edge.
#[derive(Debug, Clone)]
pub struct BlockSpawner {
    pub origin: Vec2,
    pub rows: u32,
    pub columns: u32,
    pub density: f32,
    pub velocity: Vec2,
    done: bool,
}

impl BlockSpawner {
    pub fn new(origin: Vec2, rows: u32, columns: u32) -> Self {
        Self {
            origin,
            rows,
            columns,
            density: 1.0,
            velocity: Vec2::ZERO,
            done: false,
        }
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn layout(&self, particle_size: f32) -> Vec<Vec2> {
        let spacing = particle_size * self.density;
        (0..self.rows)
            .flat_map(|row| {
                (0..self.columns).map(move |column| {
                    Vec2::new(column as f32 * spacing, row as f32 * spacing)
                })
            })
            .map(|offset| self.origin + offset)
            .collect()
    }
}

impl Spawner for BlockSpawner {
    fn poll(&mut self, config: &SimulationConfig) -> Vec<SpawnRequest> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        self.layout(config.particle_size)
            .into_iter()
            .map(|position| SpawnRequest::new(position, self.velocity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_emitter_counts_between_emissions() {
        let config = SimulationConfig::default();
        let mut emitter = IntervalEmitter::new(Vec2::ZERO, Vec2::ZERO, 2);

        let emitted: Vec<usize> = (0..7).map(|_| emitter.poll(&config).len()).collect();
        assert_eq!(emitted, vec![0, 0, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn interval_emitter_respects_limit() {
        let config = SimulationConfig::default();
        let mut emitter = IntervalEmitter::new(Vec2::ZERO, Vec2::ZERO, 0).with_limit(3);

        let total: usize = (0..10).map(|_| emitter.poll(&config).len()).sum();
        assert_eq!(total, 3);
        assert_eq!(emitter.emitted(), 3);
    }

    #[test]
    fn block_spawner_emits_once() {
        let config = SimulationConfig::default().with_particle_size(1.0);
        let mut block = BlockSpawner::new(Vec2::new(-2.0, 1.0), 2, 3).with_density(1.5);

        let first = block.poll(&config);
        assert_eq!(first.len(), 6);
        assert_eq!(first[0].position, Vec2::new(-2.0, 1.0));
        assert_eq!(first[5].position, Vec2::new(1.0, 2.5));
        assert!(block.poll(&config).is_empty());
    }
}
