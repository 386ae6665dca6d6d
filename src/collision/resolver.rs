use crate::{
    collision::grid::SpatialGrid,
    core::particle::Particle,
    error::BackendError,
    gpu::{ComputeBackend, PassBuffers, WorkerBackend},
    utils::math::separation,
};

/// Unordered particle pair, stored as `(lower, higher)` dense indices.
pub type ParticlePair = (u32, u32);

/// Outcome of one full collision pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollisionPass {
    pub strategy: String,
    pub pairs: Vec<ParticlePair>,
    /// Set when a device strategy handed the pass to its CPU fallback.
    pub fell_back: bool,
}

impl CollisionPass {
    fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            ..Self::default()
        }
    }
}

/// Applies the pairwise projection to particles `i < j`. Returns `true` on overlap.
///
/// Coincident particles are split along +X for `i` and -X for `j`.
pub fn resolve_pair(particles: &mut [Particle], i: usize, j: usize, min_distance: f32) -> bool {
    debug_assert!(i < j);
    let (left, right) = particles.split_at_mut(j);
    let (a, b) = (&mut left[i], &mut right[0]);

    match separation(a.position, b.position, min_distance) {
        Some(push) => {
            a.displace(push);
            b.displace(-push);
            true
        }
        None => false,
    }
}

/// Pluggable narrow/broad-phase pairing for the particle-particle constraint.
///
/// The grid handed to each call reflects particle positions at the start of the pass.
pub trait CollisionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Projects every overlapping pair apart.
    fn resolve(
        &self,
        particles: &mut [Particle],
        grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<CollisionPass, BackendError>;

    /// Overlapping pairs in the current state, without moving anything. Sorted.
    fn detect_pairs(
        &self,
        particles: &[Particle],
        grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<Vec<ParticlePair>, BackendError>;
}

/// All-pairs O(n²) baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveStrategy;

impl CollisionStrategy for NaiveStrategy {
    fn name(&self) -> &str {
        "naive"
    }

    fn resolve(
        &self,
        particles: &mut [Particle],
        _grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<CollisionPass, BackendError> {
        let mut pass = CollisionPass::new(self.name());
        for i in 0..particles.len() {
            for j in (i + 1)..particles.len() {
                if resolve_pair(particles, i, j, min_distance) {
                    pass.pairs.push((i as u32, j as u32));
                }
            }
        }
        Ok(pass)
    }

    fn detect_pairs(
        &self,
        particles: &[Particle],
        _grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<Vec<ParticlePair>, BackendError> {
        let mut pairs = Vec::new();
        for (i, a) in particles.iter().enumerate() {
            for (j, b) in particles.iter().enumerate().skip(i + 1) {
                if separation(a.position, b.position, min_distance).is_some() {
                    pairs.push((i as u32, j as u32));
                }
            }
        }
        Ok(pairs)
    }
}

/// Uniform-grid accelerated CPU pass.
///
/// Each unordered pair is owned by its lower index, so a pair is corrected once per
/// pass even though both particles see each other in their neighborhoods.
/// Corrections are applied immediately and later pairs see them.
#[derive(Debug, Default, Clone, Copy)]
pub struct GridStrategy;

impl CollisionStrategy for GridStrategy {
    fn name(&self) -> &str {
        "grid"
    }

    fn resolve(
        &self,
        particles: &mut [Particle],
        grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<CollisionPass, BackendError> {
        let mut pass = CollisionPass::new(self.name());
        for i in 0..particles.len() {
            let Some(coord) = grid.cell_of(i) else {
                continue;
            };
            grid.for_each_in_neighborhood(coord, |other| {
                let j = other as usize;
                if j > i && j < particles.len() && resolve_pair(particles, i, j, min_distance) {
                    pass.pairs.push((i as u32, other));
                }
            });
        }
        Ok(pass)
    }

    fn detect_pairs(
        &self,
        particles: &[Particle],
        grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<Vec<ParticlePair>, BackendError> {
        let mut pairs = Vec::new();
        for (i, particle) in particles.iter().enumerate() {
            let Some(coord) = grid.cell_of(i) else {
                continue;
            };
            grid.for_each_in_neighborhood(coord, |other| {
                let j = other as usize;
                if j > i
                    && j < particles.len()
                    && separation(particle.position, particles[j].position, min_distance)
                        .is_some()
                {
                    pairs.push((i as u32, other));
                }
            });
        }
        pairs.sort_unstable();
        Ok(pairs)
    }
}

/// What a device strategy does when its backend fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Re-run the pass with [`GridStrategy`] and log a warning.
    #[default]
    Cpu,
    /// Surface the backend error to the caller.
    Fail,
}

/// Data-parallel pass: every particle computes its correction from one shared
/// snapshot, and all corrections are applied together after the dispatch returns.
///
/// Unlike the CPU strategies, corrections do not compound within a pass, so the two
/// produce different trajectories from the same input.
pub struct ParallelStrategy {
    backend: Box<dyn ComputeBackend>,
    fallback: FallbackPolicy,
}

impl Default for ParallelStrategy {
    fn default() -> Self {
        Self::new(WorkerBackend::new())
    }
}

impl ParallelStrategy {
    pub fn new<B>(backend: B) -> Self
    where
        B: ComputeBackend + 'static,
    {
        Self {
            backend: Box::new(backend),
            fallback: FallbackPolicy::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    fn dispatch(&self, particles: &[Particle], min_distance: f32) -> Result<PassBuffers, BackendError> {
        let mut buffers = PassBuffers::acquire(particles, min_distance);
        self.backend.dispatch_collisions(&mut buffers)?;
        if buffers.outputs.len() != particles.len() {
            return Err(BackendError::BufferMismatch {
                expected: particles.len(),
                got: buffers.outputs.len(),
            });
        }
        Ok(buffers)
    }

    fn handle_failure<T>(
        &self,
        err: BackendError,
        fallback: impl FnOnce() -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        match self.fallback {
            FallbackPolicy::Cpu => {
                log::warn!(
                    "collision backend `{}` failed ({err}); falling back to grid strategy",
                    self.backend.name()
                );
                fallback()
            }
            FallbackPolicy::Fail => Err(err),
        }
    }
}

impl CollisionStrategy for ParallelStrategy {
    fn name(&self) -> &str {
        "parallel"
    }

    fn resolve(
        &self,
        particles: &mut [Particle],
        grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<CollisionPass, BackendError> {
        let buffers = match self.dispatch(particles, min_distance) {
            Ok(buffers) => buffers,
            Err(err) => {
                return self.handle_failure(err, || {
                    let mut pass = GridStrategy.resolve(particles, grid, min_distance)?;
                    pass.fell_back = true;
                    Ok(pass)
                });
            }
        };

        let mut pass = CollisionPass::new(self.name());
        for (index, (particle, output)) in particles.iter_mut().zip(&buffers.outputs).enumerate() {
            if output.contacts > 0 {
                particle.displace(output.delta);
            }
            pass.pairs
                .extend(output.partners.iter().map(|&other| (index as u32, other)));
        }
        Ok(pass)
    }

    fn detect_pairs(
        &self,
        particles: &[Particle],
        grid: &SpatialGrid,
        min_distance: f32,
    ) -> Result<Vec<ParticlePair>, BackendError> {
        let buffers = match self.dispatch(particles, min_distance) {
            Ok(buffers) => buffers,
            Err(err) => {
                return self.handle_failure(err, || {
                    GridStrategy.detect_pairs(particles, grid, min_distance)
                });
            }
        };

        let mut pairs: Vec<ParticlePair> = buffers
            .outputs
            .iter()
            .enumerate()
            .flat_map(|(index, output)| {
                output
                    .partners
                    .iter()
                    .map(move |&other| (index as u32, other))
            })
            .collect();
        pairs.sort_unstable();
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::NoopBackend;
    use approx::assert_relative_eq;
    use glam::Vec2;

    fn setup(points: &[(f32, f32)]) -> (Vec<Particle>, SpatialGrid) {
        let particles: Vec<Particle> = points
            .iter()
            .map(|&(x, y)| Particle::at_rest(Vec2::new(x, y)))
            .collect();
        let mut grid = SpatialGrid::new(1.0);
        grid.build(&particles);
        (particles, grid)
    }

    #[test]
    fn every_strategy_separates_a_single_pair() {
        let strategies: [Box<dyn CollisionStrategy>; 3] = [
            Box::new(NaiveStrategy),
            Box::new(GridStrategy),
            Box::new(ParallelStrategy::default()),
        ];
        for strategy in strategies {
            let (mut particles, grid) = setup(&[(0.0, 0.0), (0.5, 0.0)]);
            let pass = strategy
                .resolve(&mut particles, &grid, 1.0)
                .expect("pass should succeed");

            assert_eq!(pass.pairs, vec![(0, 1)], "strategy {}", strategy.name());
            assert_relative_eq!(particles[0].position.x, -0.25);
            assert_relative_eq!(particles[1].position.x, 0.75);
            assert_relative_eq!(particles[0].position.distance(particles[1].position), 1.0);
            assert!(particles[0].collision && particles[1].collision);
        }
    }

    #[test]
    fn coincident_pair_is_separated_deterministically() {
        let (mut particles, grid) = setup(&[(2.0, 2.0), (2.0, 2.0)]);
        GridStrategy
            .resolve(&mut particles, &grid, 1.0)
            .expect("grid pass");
        assert_relative_eq!(particles[0].position.x, 2.5);
        assert_relative_eq!(particles[1].position.x, 1.5);
    }

    #[test]
    fn unavailable_backend_falls_back_to_grid() {
        let (mut particles, grid) = setup(&[(0.0, 0.0), (0.5, 0.0)]);
        let strategy = ParallelStrategy::new(NoopBackend::new());
        let pass = strategy
            .resolve(&mut particles, &grid, 1.0)
            .expect("fallback should succeed");

        assert!(pass.fell_back);
        assert_eq!(pass.strategy, "grid");
        assert_relative_eq!(particles[1].position.x, 0.75);
    }

    #[test]
    fn fail_policy_surfaces_backend_error() {
        let (mut particles, grid) = setup(&[(0.0, 0.0), (0.5, 0.0)]);
        let strategy = ParallelStrategy::new(NoopBackend::new()).with_fallback(FallbackPolicy::Fail);

        assert!(strategy.resolve(&mut particles, &grid, 1.0).is_err());
        assert_eq!(particles[1].position, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn parallel_pass_uses_a_single_snapshot() {
        // Middle particle overlaps both neighbors equally; its corrections cancel.
        let (mut particles, grid) = setup(&[(0.0, 0.0), (0.8, 0.0), (1.6, 0.0)]);
        ParallelStrategy::default()
            .resolve(&mut particles, &grid, 1.0)
            .expect("parallel pass");

        assert_relative_eq!(particles[0].position.x, -0.1, epsilon = 1e-6);
        assert_relative_eq!(particles[1].position.x, 0.8, epsilon = 1e-6);
        assert_relative_eq!(particles[2].position.x, 1.7, epsilon = 1e-6);
        assert!(particles.iter().all(|p| p.collision));
    }
}
