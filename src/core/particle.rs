use glam::Vec2;

/// Kinematic state of a single particle.
///
/// Velocity is implicit: `position - previous_position`. Radius is shared by the
/// whole simulation and therefore not stored here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub previous_position: Vec2,
    pub acceleration: Vec2,
    /// Set by any constraint that displaced the particle during the current sub-step.
    pub collision: bool,
}

impl Default for Particle {
    fn default() -> Self {
        Self::at_rest(Vec2::ZERO)
    }
}

impl Particle {
    pub fn at_rest(position: Vec2) -> Self {
        Self {
            position,
            previous_position: position,
            acceleration: Vec2::ZERO,
            collision: false,
        }
    }

    /// Creates a particle moving with `velocity` (units per second) for steps of `dt`.
    pub fn with_velocity(position: Vec2, velocity: Vec2, dt: f32) -> Self {
        if velocity == Vec2::ZERO {
            return Self::at_rest(position);
        }
        Self {
            previous_position: position - velocity * dt,
            ..Self::at_rest(position)
        }
    }

    /// Displacement over the last sub-step.
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.position - self.previous_position
    }

    /// Replaces the pending acceleration. Called once per sub-step.
    #[inline]
    pub fn accelerate(&mut self, acceleration: Vec2) {
        self.acceleration = acceleration;
    }

    /// Moves the particle without touching `previous_position`, flagging the correction.
    #[inline]
    pub fn displace(&mut self, offset: Vec2) {
        self.position += offset;
        self.collision = true;
    }

    /// Störmer–Verlet step.
    pub fn integrate(&mut self, dt: f32, resistance: f32) {
        let mut velocity = self.velocity();
        if self.collision {
            velocity *= resistance;
            self.collision = false;
        }
        self.previous_position = self.position;
        self.position += velocity + self.acceleration * (dt * dt);
        self.acceleration = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn particle_at_rest_falls_by_g_dt_squared() {
        let mut particle = Particle::at_rest(Vec2::new(0.0, 2.0));
        particle.accelerate(Vec2::new(0.0, -10.0));
        particle.integrate(0.1, 1.0);

        assert_relative_eq!(particle.position.y, 1.9, epsilon = 1e-6);
        assert_eq!(particle.previous_position, Vec2::new(0.0, 2.0));
        assert_eq!(particle.acceleration, Vec2::ZERO);
    }

    #[test]
    fn collision_flag_damps_velocity_once() {
        let mut particle = Particle::at_rest(Vec2::ZERO);
        particle.previous_position = Vec2::new(-1.0, 0.0);
        particle.collision = true;

        particle.integrate(0.1, 0.5);
        assert_relative_eq!(particle.position.x, 0.5);
        assert!(!particle.collision);

        particle.integrate(0.1, 0.5);
        assert_relative_eq!(particle.position.x, 1.0);
    }

    #[test]
    fn accelerate_overwrites_previous_value() {
        let mut particle = Particle::default();
        particle.accelerate(Vec2::new(1.0, 0.0));
        particle.accelerate(Vec2::new(0.0, -2.0));
        assert_eq!(particle.acceleration, Vec2::new(0.0, -2.0));
    }

    #[test]
    fn initial_velocity_is_encoded_in_previous_position() {
        let particle = Particle::with_velocity(Vec2::ZERO, Vec2::new(2.0, 0.0), 0.5);
        assert_eq!(particle.previous_position, Vec2::new(-1.0, 0.0));
        assert_eq!(particle.velocity(), Vec2::new(1.0, 0.0));
    }
}
