use glam::Vec2;

use crate::core::particle::Particle;

/// Uniform downward gravity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityForce {
    pub gravity: Vec2,
}

impl GravityForce {
    /// Gravity of `magnitude` pulling along -Y.
    pub fn new(magnitude: f32) -> Self {
        Self {
            gravity: Vec2::new(0.0, -magnitude),
        }
    }

    /// Sets every particle's acceleration for the coming sub-step.
    pub fn apply(&self, particles: &mut [Particle]) {
        for particle in particles.iter_mut() {
            particle.accelerate(self.gravity);
        }
    }
}
