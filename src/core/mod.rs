//! Core particle data shared by every subsystem.

pub mod particle;

pub use particle::Particle;
