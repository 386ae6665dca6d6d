use thiserror::Error;

use crate::utils::allocator::ParticleHandle;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors surfaced to the owner of a [`SimulationWorld`](crate::world::SimulationWorld).
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected configuration value. The previous configuration stays active.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Handle does not refer to a live particle (removed or never issued).
    #[error("unknown particle handle {0:?}")]
    UnknownParticle(ParticleHandle),

    /// The compute backend failed and the fallback policy forbids a CPU retry.
    #[error("collision backend failed: {0}")]
    Backend(#[from] BackendError),

    /// Caller supplied a non-finite input (position, velocity or delta time).
    #[error("non-finite input: {0}")]
    NonFinite(&'static str),

    /// Time was asked to run backwards.
    #[error("negative elapsed time: {0} s")]
    NegativeTime(f32),
}

/// Failures reported by a [`ComputeBackend`](crate::gpu::ComputeBackend).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend `{0}` is unavailable")]
    Unavailable(String),

    #[error("output buffer holds {got} slots, expected {expected}")]
    BufferMismatch { expected: usize, got: usize },

    #[error("dispatch failed: {0}")]
    Dispatch(String),
}
