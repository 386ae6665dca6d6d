use log::{log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Per-step timing and counters, refreshed by every [`SimulationWorld::step`].
///
/// [`SimulationWorld::step`]: crate::world::SimulationWorld::step
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub boundary_time: Duration,
    pub collision_time: Duration,
    pub integrate_time: Duration,
    pub rebucket_time: Duration,
    pub total_frame_time: Duration,

    pub particle_count: usize,
    pub corrected_pairs: usize,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_frame_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        let share = |d: Duration| (d.as_micros() as f32 / total_us) * 100.0;
        log::info!(
            "step: {} particles, {} corrected pairs, {:.2} ms total",
            self.particle_count,
            self.corrected_pairs,
            self.total_frame_time.as_secs_f32() * 1000.0
        );
        log::info!(
            "  boundary {:.1}% | collisions {:.1}% | integrate {:.1}% | rebucket {:.1}%",
            share(self.boundary_time),
            share(self.collision_time),
            share(self.integrate_time),
            share(self.rebucket_time)
        );
    }
}

/// Scoped timer that traces the labelled section and adds its duration to `output`.
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'static str, output: &'a mut Duration) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        *self.output += elapsed;
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Registers a warning when frame budget is exceeded.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!("Frame exceeded budget: {elapsed_ms:.2} ms > {budget_ms:.2} ms");
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_timer_accumulates() {
        let mut total = Duration::ZERO;
        {
            let _timer = ScopedTimer::new("first", &mut total);
        }
        let after_first = total;
        {
            let _timer = ScopedTimer::new("second", &mut total);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(total > after_first);
    }

    #[test]
    fn budget_check_flags_overruns() {
        assert!(warn_if_frame_budget_exceeded(Duration::from_millis(20), 16.6));
        assert!(!warn_if_frame_budget_exceeded(Duration::from_millis(2), 16.6));
    }
}
