#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::particle::Particle;

/// Integrator responsible for stepping particles forward by one sub-step.
#[derive(Debug, Clone)]
pub struct VerletIntegrator {
    pub resistance: f32,
    parallel: bool,
}

impl VerletIntegrator {
    pub fn new(resistance: f32) -> Self {
        Self {
            resistance,
            parallel: false,
        }
    }

    /// Only has an effect when built with the `parallel` feature.
    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    pub fn parallel(&self) -> bool {
        self.parallel && cfg!(feature = "parallel")
    }

    pub fn step(&self, particles: &mut [Particle], dt: f32) {
        let resistance = self.resistance;

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                particles
                    .par_iter_mut()
                    .for_each(|particle| particle.integrate(dt, resistance));
                return;
            }
        }

        for particle in particles.iter_mut() {
            particle.integrate(dt, resistance);
        }
    }
}
