//! Utility helpers: handle allocation, math extensions and profiling.

pub mod allocator;
pub mod math;
pub mod profiling;

pub use allocator::{GenerationalId, HandleMap, ParticleHandle};
pub use math::*;
pub use profiling::{ScopedTimer, StepProfile};
