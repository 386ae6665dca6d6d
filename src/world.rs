pub mod commands;
pub mod spawner;

use std::time::Instant;

use glam::Vec2;

use crate::{
    collision::{
        boundary::{BoundaryConstraint, Container},
        grid::SpatialGrid,
        resolver::{CollisionStrategy, GridStrategy, ParticlePair},
    },
    config::SimulationConfig,
    core::particle::Particle,
    dynamics::{forces::GravityForce, integrator::VerletIntegrator},
    error::{Result, SimError},
    utils::{
        allocator::{HandleMap, ParticleHandle},
        profiling::{warn_if_frame_budget_exceeded, ScopedTimer, StepProfile},
    },
};

use commands::CommandQueue;
use spawner::{SpawnRequest, Spawner};

/// What happened during one [`SimulationWorld::step`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepReport {
    /// Particles created this step, from queued adds and the spawner.
    pub spawned: Vec<ParticleHandle>,
    /// Queued removals that were applied.
    pub removed: usize,
    pub sub_steps: u32,
    /// Corrected pairs summed over every sub-step.
    pub corrected_pairs: usize,
    pub strategy: String,
    /// A device strategy handed at least one sub-step to its CPU fallback.
    pub fell_back: bool,
}

/// State restored when a step fails.
struct StepBackup {
    particles: Vec<Particle>,
    handles: HandleMap,
    commands: CommandQueue,
}

fn check_finite(position: Vec2, velocity: Vec2) -> Result<()> {
    if !position.is_finite() {
        return Err(SimError::NonFinite("particle position"));
    }
    if !velocity.is_finite() {
        return Err(SimError::NonFinite("particle velocity"));
    }
    Ok(())
}

/// Owns every particle and advances them in fixed frames split into sub-steps.
///
/// Particles are stored densely; [`ParticleHandle`]s stay valid across removals of
/// other particles. The broad-phase grid is refreshed right before each collision pass
/// and once more at the end of the step, so between steps it always matches the
/// particle positions.
pub struct SimulationWorld {
    config: SimulationConfig,
    container: Container,
    particles: Vec<Particle>,
    handles: HandleMap,
    grid: SpatialGrid,
    gravity: GravityForce,
    integrator: VerletIntegrator,
    strategy: Box<dyn CollisionStrategy>,
    spawner: Option<Box<dyn Spawner>>,
    commands: CommandQueue,
    profile: StepProfile,
    frame_budget_ms: Option<f32>,
}

impl SimulationWorld {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        log::debug!("creating simulation world: {config:?}");

        Ok(Self {
            container: Container::from_config(&config),
            grid: SpatialGrid::new(config.particle_size),
            gravity: GravityForce::new(config.gravity),
            integrator: VerletIntegrator::new(config.resistance),
            config,
            particles: Vec::new(),
            handles: HandleMap::new(),
            strategy: Box::new(GridStrategy),
            spawner: None,
            commands: CommandQueue::new(),
            profile: StepProfile::default(),
            frame_budget_ms: None,
        })
    }

    pub fn with_strategy<S>(mut self, strategy: S) -> Self
    where
        S: CollisionStrategy + 'static,
    {
        self.set_collision_strategy(strategy);
        self
    }

    pub fn with_spawner<S>(mut self, spawner: S) -> Self
    where
        S: Spawner + 'static,
    {
        self.set_spawner(spawner);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replaces the configuration. Rejected configs leave the current one in place.
    ///
    /// The container center is fixed for the lifetime of the world.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;
        if config.center != self.config.center {
            return Err(SimError::InvalidConfig(format!(
                "container center is fixed at {}, got {}",
                self.config.center, config.center
            )));
        }

        if config.particle_size != self.config.particle_size {
            self.grid.resize(config.particle_size, &self.particles);
        }
        self.container = Container::from_config(&config);
        self.gravity = GravityForce::new(config.gravity);
        self.integrator.resistance = config.resistance;
        log::debug!("simulation config updated: {config:?}");
        self.config = config;
        Ok(())
    }

    pub fn set_collision_strategy<S>(&mut self, strategy: S)
    where
        S: CollisionStrategy + 'static,
    {
        log::debug!("collision strategy set to `{}`", strategy.name());
        self.strategy = Box::new(strategy);
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn set_spawner<S>(&mut self, spawner: S)
    where
        S: Spawner + 'static,
    {
        self.spawner = Some(Box::new(spawner));
    }

    pub fn clear_spawner(&mut self) {
        self.spawner = None;
    }

    /// Enables data-parallel integration (requires the `parallel` feature).
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.integrator.set_parallel(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.integrator.parallel()
    }

    /// Warn whenever a step takes longer than `budget_ms`.
    pub fn set_frame_budget(&mut self, budget_ms: Option<f32>) {
        self.frame_budget_ms = budget_ms;
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn profile(&self) -> &StepProfile {
        &self.profile
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.handles
            .resolve(handle)
            .and_then(|index| self.particles.get(index))
    }

    pub fn handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.handles.handles()
    }

    /// Snapshot of every particle position, in dense order.
    pub fn particle_positions(&self) -> Vec<Vec2> {
        self.particles.iter().map(|p| p.position).collect()
    }

    /// Inserts a particle immediately. `velocity` is in units per second.
    pub fn add_particle(&mut self, position: Vec2, velocity: Vec2) -> Result<ParticleHandle> {
        check_finite(position, velocity)?;

        let particle = Particle::with_velocity(position, velocity, self.config.sub_step_dt());
        self.particles.push(particle);
        self.grid.push(position);
        Ok(self.handles.push())
    }

    pub fn remove_particle(&mut self, handle: ParticleHandle) -> Result<Particle> {
        let index = self
            .handles
            .remove(handle)
            .ok_or(SimError::UnknownParticle(handle))?;
        self.grid.swap_remove(index);
        Ok(self.particles.swap_remove(index))
    }

    /// Queues a particle to be created at the start of the next step.
    ///
    /// Non-finite input is rejected here so it can never fail a later step.
    pub fn queue_add(&mut self, position: Vec2, velocity: Vec2) -> Result<()> {
        check_finite(position, velocity)?;
        self.commands.push_add(position, velocity);
        Ok(())
    }

    /// Queues a removal for the start of the next step.
    pub fn queue_remove(&mut self, handle: ParticleHandle) {
        self.commands.push_remove(handle);
    }

    pub fn pending_commands(&self) -> (usize, usize) {
        self.commands.pending()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.handles.clear();
        self.grid.build(&self.particles);
    }

    /// Overlapping pairs in the current state according to the active strategy.
    pub fn detect_pairs(&self) -> Result<Vec<ParticlePair>> {
        Ok(self
            .strategy
            .detect_pairs(&self.particles, &self.grid, self.config.particle_size)?)
    }

    /// Advances the simulation by one frame of `frame_dt` seconds.
    ///
    /// A failed step changes nothing: particles, handles and queued commands are
    /// restored to their state before the call. Requests already taken from the
    /// spawner are dropped.
    pub fn step(&mut self, frame_dt: f32) -> Result<StepReport> {
        if !frame_dt.is_finite() {
            return Err(SimError::NonFinite("frame delta time"));
        }

        let started = Instant::now();
        self.profile.reset();

        let mut report = StepReport {
            sub_steps: self.config.sub_steps,
            strategy: self.strategy.name().to_string(),
            ..StepReport::default()
        };

        let backup = StepBackup {
            particles: self.particles.clone(),
            handles: self.handles.clone(),
            commands: self.commands.clone(),
        };
        if let Err(err) = self.advance_frame(frame_dt, &mut report) {
            self.particles = backup.particles;
            self.handles = backup.handles;
            self.commands = backup.commands;
            self.grid.build(&self.particles);
            log::error!("step aborted, world restored: {err}");
            return Err(err);
        }

        {
            let _timer = ScopedTimer::new("grid::rebucket", &mut self.profile.rebucket_time);
            self.grid.rebucket_all(&self.particles);
        }

        self.profile.particle_count = self.particles.len();
        self.profile.corrected_pairs = report.corrected_pairs;
        self.profile.total_frame_time = started.elapsed();
        if let Some(budget) = self.frame_budget_ms {
            warn_if_frame_budget_exceeded(self.profile.total_frame_time, budget);
        }

        Ok(report)
    }

    fn advance_frame(&mut self, frame_dt: f32, report: &mut StepReport) -> Result<()> {
        self.apply_commands(report)?;
        self.poll_spawner(report)?;
        if frame_dt > 0.0 {
            self.run_sub_steps(frame_dt, report)?;
        }
        Ok(())
    }

    fn run_sub_steps(&mut self, frame_dt: f32, report: &mut StepReport) -> Result<()> {
        let sub_dt = frame_dt / self.config.sub_steps as f32;
        let radius = self.config.radius();
        let min_distance = self.config.particle_size;

        for _ in 0..self.config.sub_steps {
            self.gravity.apply(&mut self.particles);

            {
                let _timer = ScopedTimer::new("boundary", &mut self.profile.boundary_time);
                self.container.resolve_all(&mut self.particles, radius);
            }
            {
                let _timer = ScopedTimer::new("grid::rebucket", &mut self.profile.rebucket_time);
                self.grid.rebucket_all(&self.particles);
            }
            {
                let _timer = ScopedTimer::new("collisions", &mut self.profile.collision_time);
                let pass = self
                    .strategy
                    .resolve(&mut self.particles, &self.grid, min_distance)?;
                report.corrected_pairs += pass.pairs.len();
                report.fell_back |= pass.fell_back;
            }
            {
                let _timer = ScopedTimer::new("integrator", &mut self.profile.integrate_time);
                self.integrator.step(&mut self.particles, sub_dt);
            }
        }
        Ok(())
    }

    fn apply_commands(&mut self, report: &mut StepReport) -> Result<()> {
        if self.commands.is_empty() {
            return Ok(());
        }

        let (removals, adds) = self.commands.drain();
        for handle in removals {
            match self.remove_particle(handle) {
                Ok(_) => report.removed += 1,
                Err(err) => log::warn!("skipping queued removal: {err}"),
            }
        }
        self.insert_requests(adds, report)
    }

    fn poll_spawner(&mut self, report: &mut StepReport) -> Result<()> {
        let Some(spawner) = self.spawner.as_mut() else {
            return Ok(());
        };
        let requests = spawner.poll(&self.config);
        if !requests.is_empty() {
            log::debug!("spawner emitted {} particles", requests.len());
        }
        self.insert_requests(requests, report)
    }

    fn insert_requests(&mut self, requests: Vec<SpawnRequest>, report: &mut StepReport) -> Result<()> {
        for request in &requests {
            check_finite(request.position, request.velocity)?;
        }
        for request in requests {
            let handle = self.add_particle(request.position, request.velocity)?;
            report.spawned.push(handle);
        }
        Ok(())
    }
}
