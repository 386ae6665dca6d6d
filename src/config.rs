//! Global configuration constants and the validated simulation settings.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Default downward gravity magnitude (applied along -Y).
pub const DEFAULT_GRAVITY: f32 = 9.81;

/// Default fixed frame timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Number of sub-steps a frame is divided into.
pub const DEFAULT_SUB_STEPS: u32 = 8;

/// Velocity retained after a particle was displaced by a constraint.
pub const DEFAULT_RESISTANCE: f32 = 0.9;

/// Default particle diameter. Also the broad-phase cell size.
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.5;

/// Default rectangle container half extents.
pub const DEFAULT_CONTAINER_HALF_EXTENTS: [f32; 2] = [10.0, 10.0];

/// Shape of the container every particle is kept inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerShape {
    Rectangle { half_extents: Vec2 },
    Circle { radius: f32 },
}

impl Default for ContainerShape {
    fn default() -> Self {
        ContainerShape::Rectangle {
            half_extents: Vec2::from_array(DEFAULT_CONTAINER_HALF_EXTENTS),
        }
    }
}

/// Settings for a [`SimulationWorld`](crate::world::SimulationWorld).
///
/// Values are checked by [`SimulationConfig::validate`] whenever they are handed to a
/// world, so an invalid config can be built freely but never stepped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Particle diameter; the minimum allowed center-to-center distance.
    pub particle_size: f32,
    /// Downward acceleration magnitude.
    pub gravity: f32,
    /// Velocity scale applied after a constraint correction, in `[0, 1]`.
    pub resistance: f32,
    pub sub_steps: u32,
    /// Nominal frame delta. Converts spawn velocities (units per second) into the
    /// per-sub-step displacement stored in `previous_position`.
    pub time_step: f32,
    pub container: ContainerShape,
    /// Container center. Fixed once the world is created.
    pub center: Vec2,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_size: DEFAULT_PARTICLE_SIZE,
            gravity: DEFAULT_GRAVITY,
            resistance: DEFAULT_RESISTANCE,
            sub_steps: DEFAULT_SUB_STEPS,
            time_step: DEFAULT_TIME_STEP,
            container: ContainerShape::default(),
            center: Vec2::ZERO,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_particle_size(mut self, size: f32) -> Self {
        self.particle_size = size;
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_resistance(mut self, resistance: f32) -> Self {
        self.resistance = resistance;
        self
    }

    pub fn with_sub_steps(mut self, sub_steps: u32) -> Self {
        self.sub_steps = sub_steps;
        self
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_rectangle(mut self, half_extents: Vec2) -> Self {
        self.container = ContainerShape::Rectangle { half_extents };
        self
    }

    pub fn with_circle(mut self, radius: f32) -> Self {
        self.container = ContainerShape::Circle { radius };
        self
    }

    pub fn with_center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }

    /// Shared particle radius.
    pub fn radius(&self) -> f32 {
        self.particle_size * 0.5
    }

    /// Duration of one sub-step at the nominal frame rate.
    pub fn sub_step_dt(&self) -> f32 {
        self.time_step / self.sub_steps.max(1) as f32
    }

    pub fn validate(&self) -> Result<()> {
        if !self.particle_size.is_finite() || self.particle_size <= 0.0 {
            return Err(invalid(format!(
                "particle_size must be > 0, got {}",
                self.particle_size
            )));
        }
        if self.sub_steps < 1 {
            return Err(invalid("sub_steps must be >= 1".to_string()));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(invalid(format!(
                "time_step must be > 0, got {}",
                self.time_step
            )));
        }
        if !self.gravity.is_finite() {
            return Err(invalid(format!("gravity must be finite, got {}", self.gravity)));
        }
        if !(0.0..=1.0).contains(&self.resistance) {
            return Err(invalid(format!(
                "resistance must lie in [0, 1], got {}",
                self.resistance
            )));
        }
        if !self.center.is_finite() {
            return Err(invalid("container center must be finite".to_string()));
        }

        let radius = self.radius();
        match self.container {
            ContainerShape::Rectangle { half_extents } => {
                if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
                    return Err(invalid(format!(
                        "rectangle half extents must be > 0, got {half_extents}"
                    )));
                }
                if half_extents.min_element() < radius {
                    return Err(invalid(format!(
                        "rectangle half extents {half_extents} cannot hold a particle of radius {radius}"
                    )));
                }
            }
            ContainerShape::Circle { radius: container_radius } => {
                if !container_radius.is_finite() || container_radius <= 0.0 {
                    return Err(invalid(format!(
                        "circle radius must be > 0, got {container_radius}"
                    )));
                }
                if container_radius < radius {
                    return Err(invalid(format!(
                        "circle radius {container_radius} cannot hold a particle of radius {radius}"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> SimError {
    SimError::InvalidConfig(message)
}
