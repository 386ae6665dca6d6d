//! Verlet Particles – 2D position-based particle solver for Rust.
//!
//! Uniform circular particles fall under gravity inside a rectangular or circular
//! container. Each fixed frame is split into sub-steps of gravity, container
//! correction, pairwise overlap projection and Verlet integration. Pair resolution is
//! pluggable: an all-pairs baseline, a uniform-grid CPU pass, and a data-parallel pass
//! that runs on a [`ComputeBackend`].

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod gpu;
pub mod utils;
pub mod world;

pub use glam::Vec2;

pub use collision::{
    boundary::{BoundaryConstraint, CircleBoundary, Container, RectangleBoundary},
    grid::SpatialGrid,
    resolver::{
        CollisionPass, CollisionStrategy, FallbackPolicy, GridStrategy, NaiveStrategy,
        ParallelStrategy, ParticlePair,
    },
};
pub use config::{ContainerShape, SimulationConfig};
pub use crate::core::particle::Particle;
pub use dynamics::{forces::GravityForce, integrator::VerletIntegrator};
pub use error::{BackendError, Result, SimError};
pub use gpu::{ComputeBackend, DispatchStats, NoopBackend, WorkerBackend};
pub use utils::allocator::{GenerationalId, ParticleHandle};
pub use world::{
    spawner::{BlockSpawner, IntervalEmitter, SpawnRequest, Spawner},
    SimulationWorld, StepReport,
};

/// Most fixed steps [`ParticleEngine::advance`] runs in one call before dropping time.
pub const MAX_CATCH_UP_STEPS: u32 = 8;

/// High-level convenience wrapper that owns a [`SimulationWorld`] and feeds it fixed
/// frames from variable wall-clock time.
pub struct ParticleEngine {
    world: SimulationWorld,
    time_accumulated: f32,
}

impl ParticleEngine {
    /// Creates an engine stepping at the world's configured `time_step`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Ok(Self {
            world: SimulationWorld::new(config)?,
            time_accumulated: 0.0,
        })
    }

    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimulationWorld {
        &mut self.world
    }

    /// Adds a particle and returns its handle.
    pub fn add_particle(&mut self, position: Vec2, velocity: Vec2) -> Result<ParticleHandle> {
        self.world.add_particle(position, velocity)
    }

    /// Accumulates `elapsed` seconds and runs as many fixed steps as fit.
    ///
    /// Returns the number of steps taken. Time beyond [`MAX_CATCH_UP_STEPS`] frames is
    /// discarded so a long stall cannot snowball. The step length is read from the
    /// world's config on every call, and a failed step keeps its time in the
    /// accumulator.
    pub fn advance(&mut self, elapsed: f32) -> Result<u32> {
        if !elapsed.is_finite() {
            return Err(SimError::NonFinite("elapsed time"));
        }
        if elapsed < 0.0 {
            return Err(SimError::NegativeTime(elapsed));
        }
        self.time_accumulated += elapsed;

        let time_step = self.world.config().time_step;
        let mut steps = 0;
        while self.time_accumulated >= time_step {
            if steps == MAX_CATCH_UP_STEPS {
                log::warn!(
                    "dropping {:.3} s of simulation time after {steps} catch-up steps",
                    self.time_accumulated
                );
                self.time_accumulated = 0.0;
                break;
            }
            self.world.step(time_step)?;
            self.time_accumulated -= time_step;
            steps += 1;
        }
        Ok(steps)
    }

    /// Particle positions for display.
    pub fn positions(&self) -> Vec<Vec2> {
        self.world.particle_positions()
    }
}
