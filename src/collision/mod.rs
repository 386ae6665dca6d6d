//! Collision handling: broad-phase grid, container constraints and pair resolution.

pub mod boundary;
pub mod grid;
pub mod resolver;

pub use boundary::{BoundaryConstraint, CircleBoundary, Container, RectangleBoundary};
pub use grid::{CellCoord, SpatialGrid};
pub use resolver::{
    CollisionPass, CollisionStrategy, FallbackPolicy, GridStrategy, NaiveStrategy,
    ParallelStrategy, ParticlePair,
};
