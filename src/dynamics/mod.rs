//! Simulation dynamics: forces and Verlet integration.

pub mod forces;
pub mod integrator;

pub use forces::GravityForce;
pub use integrator::VerletIntegrator;
