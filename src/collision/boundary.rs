use glam::Vec2;

use crate::{
    config::{ContainerShape, SimulationConfig},
    core::particle::Particle,
    utils::math::sign_non_zero,
};

/// Position correction that keeps particles inside the container.
pub trait BoundaryConstraint: Send + Sync {
    /// Pushes `particle` back inside. Returns `true` if it was displaced.
    fn resolve(&self, particle: &mut Particle, radius: f32) -> bool;

    /// Whether a particle of `radius` centered at `position` lies fully inside,
    /// allowing `tolerance` of overshoot.
    fn contains(&self, position: Vec2, radius: f32, tolerance: f32) -> bool;

    fn resolve_all(&self, particles: &mut [Particle], radius: f32) -> usize {
        let mut displaced = 0;
        for particle in particles.iter_mut() {
            if self.resolve(particle, radius) {
                displaced += 1;
            }
        }
        displaced
    }
}

/// Axis-aligned box; each axis is corrected on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleBoundary {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl BoundaryConstraint for RectangleBoundary {
    fn resolve(&self, particle: &mut Particle, radius: f32) -> bool {
        let local = particle.position - self.center;
        let penetration = self.half_extents - local.abs() - Vec2::splat(radius);

        let mut offset = Vec2::ZERO;
        if penetration.x < 0.0 {
            offset.x = penetration.x * sign_non_zero(local.x);
        }
        if penetration.y < 0.0 {
            offset.y = penetration.y * sign_non_zero(local.y);
        }

        if penetration.x < 0.0 || penetration.y < 0.0 {
            particle.displace(offset);
            return true;
        }
        false
    }

    fn contains(&self, position: Vec2, radius: f32, tolerance: f32) -> bool {
        let local = (position - self.center).abs() + Vec2::splat(radius);
        local.cmple(self.half_extents + Vec2::splat(tolerance)).all()
    }
}

/// Circular container.
///
/// A particle sitting exactly on the center has no radial direction; it is always
/// inside a valid container, so it is left untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleBoundary {
    pub center: Vec2,
    pub radius: f32,
}

impl BoundaryConstraint for CircleBoundary {
    fn resolve(&self, particle: &mut Particle, radius: f32) -> bool {
        let offset = particle.position - self.center;
        let Some(direction) = offset.try_normalize() else {
            return false;
        };

        let outer = offset.length() + radius;
        if outer > self.radius {
            let target = self.center + direction * (self.radius - radius);
            particle.displace(target - particle.position);
            return true;
        }
        false
    }

    fn contains(&self, position: Vec2, radius: f32, tolerance: f32) -> bool {
        position.distance(self.center) + radius <= self.radius + tolerance
    }
}

/// Concrete container selected from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Container {
    Rectangle(RectangleBoundary),
    Circle(CircleBoundary),
}

impl Container {
    pub fn from_config(config: &SimulationConfig) -> Self {
        match config.container {
            ContainerShape::Rectangle { half_extents } => Container::Rectangle(RectangleBoundary {
                center: config.center,
                half_extents,
            }),
            ContainerShape::Circle { radius } => Container::Circle(CircleBoundary {
                center: config.center,
                radius,
            }),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            Container::Rectangle(rect) => rect.center,
            Container::Circle(circle) => circle.center,
        }
    }

    fn constraint(&self) -> &dyn BoundaryConstraint {
        match self {
            Container::Rectangle(rect) => rect,
            Container::Circle(circle) => circle,
        }
    }
}

impl BoundaryConstraint for Container {
    fn resolve(&self, particle: &mut Particle, radius: f32) -> bool {
        self.constraint().resolve(particle, radius)
    }

    fn contains(&self, position: Vec2, radius: f32, tolerance: f32) -> bool {
        self.constraint().contains(position, radius, tolerance)
    }
}
