pub mod worker_backend;
pub use worker_backend::WorkerBackend;

use std::collections::HashMap;
use std::time::Duration;

use glam::Vec2;

use crate::{
    collision::grid::CellCoord,
    core::particle::Particle,
    error::BackendError,
    utils::math::{cell_coord, separation},
};

/// Result written by one kernel invocation into its private output slot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct KernelOutput {
    /// Summed half-corrections against every overlapping neighbor.
    pub delta: Vec2,
    /// Number of overlapping neighbors, in either direction.
    pub contacts: u32,
    /// Overlapping neighbors with a higher index than the invoking particle.
    pub partners: Vec<u32>,
}

/// Read-only snapshot of particle positions bucketed by cell.
///
/// Positions are sorted by cell with a counting sort so that a kernel can find its
/// 3×3 neighborhood by offset lookups instead of walking per-cell vectors.
#[derive(Debug, Default, Clone)]
pub struct DeviceSnapshot {
    pub positions: Vec<Vec2>,
    pub min_distance: f32,
    cell_of: Vec<CellCoord>,
    cell_ranges: HashMap<CellCoord, (u32, u32)>,
    sorted: Vec<u32>,
}

impl DeviceSnapshot {
    pub fn capture(particles: &[Particle], min_distance: f32) -> Self {
        let positions: Vec<Vec2> = particles.iter().map(|p| p.position).collect();
        let cell_of: Vec<CellCoord> = positions
            .iter()
            .map(|&position| cell_coord(position, min_distance))
            .collect();

        let mut counts: HashMap<CellCoord, u32> = HashMap::new();
        for coord in &cell_of {
            *counts.entry(*coord).or_default() += 1;
        }

        let mut cell_ranges = HashMap::with_capacity(counts.len());
        let mut offset = 0u32;
        for (coord, count) in counts {
            cell_ranges.insert(coord, (offset, 0));
            offset += count;
        }

        let mut sorted = vec![0u32; positions.len()];
        for (index, coord) in cell_of.iter().enumerate() {
            if let Some((start, len)) = cell_ranges.get_mut(coord) {
                sorted[(*start + *len) as usize] = index as u32;
                *len += 1;
            }
        }

        Self {
            positions,
            min_distance,
            cell_of,
            cell_ranges,
            sorted,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }

    fn cell_contents(&self, coord: CellCoord) -> &[u32] {
        match self.cell_ranges.get(&coord) {
            Some(&(start, len)) => &self.sorted[start as usize..(start + len) as usize],
            None => &[],
        }
    }

    /// Kernel body for particle `index`. Reads only the snapshot.
    pub fn evaluate(&self, index: usize) -> KernelOutput {
        let mut output = KernelOutput::default();
        let Some(&(cx, cy)) = self.cell_of.get(index) else {
            return output;
        };
        let position = self.positions[index];

        for dy in -1..=1 {
            for dx in -1..=1 {
                for &other in self.cell_contents((cx + dx, cy + dy)) {
                    let other = other as usize;
                    if other == index {
                        continue;
                    }
                    // Always evaluate in (lower, higher) order so both sides agree.
                    let push = if index < other {
                        separation(position, self.positions[other], self.min_distance)
                    } else {
                        separation(self.positions[other], position, self.min_distance)
                            .map(|push| -push)
                    };
                    if let Some(push) = push {
                        output.delta += push;
                        output.contacts += 1;
                        if other > index {
                            output.partners.push(other as u32);
                        }
                    }
                }
            }
        }
        output
    }
}

/// Buffers for a single collision pass: the input snapshot and one output slot per
/// particle. Created at pass start and released on drop, whichever way the pass exits.
#[derive(Debug)]
pub struct PassBuffers {
    pub snapshot: DeviceSnapshot,
    pub outputs: Vec<KernelOutput>,
}

impl PassBuffers {
    pub fn acquire(particles: &[Particle], min_distance: f32) -> Self {
        let snapshot = DeviceSnapshot::capture(particles, min_distance);
        let outputs = vec![KernelOutput::default(); snapshot.particle_count()];
        log::trace!("pass buffers acquired for {} particles", outputs.len());
        Self { snapshot, outputs }
    }
}

impl Drop for PassBuffers {
    fn drop(&mut self) {
        log::trace!("pass buffers released ({} slots)", self.outputs.len());
    }
}

/// Summary of the most recent dispatch, kept by backends for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DispatchStats {
    pub invocations: usize,
    pub contacts: usize,
    pub elapsed: Duration,
}

/// Trait implemented by compute backends that can run the collision kernel.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Runs [`DeviceSnapshot::evaluate`] for every particle, writing each result into
    /// the matching slot of `buffers.outputs`. Must not return before all invocations
    /// have finished.
    fn dispatch_collisions(&self, buffers: &mut PassBuffers) -> Result<(), BackendError>;

    fn last_dispatch(&self) -> Option<DispatchStats> {
        None
    }
}

/// Backend with no device behind it. Every dispatch reports the device as missing,
/// which keeps all collision work on the CPU fallback.
#[derive(Debug, Default)]
pub struct NoopBackend;

impl NoopBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for NoopBackend {
    fn name(&self) -> &str {
        "cpu-noop"
    }

    fn dispatch_collisions(&self, _buffers: &mut PassBuffers) -> Result<(), BackendError> {
        Err(BackendError::Unavailable(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(points: &[(f32, f32)]) -> DeviceSnapshot {
        let particles: Vec<Particle> = points
            .iter()
            .map(|&(x, y)| Particle::at_rest(Vec2::new(x, y)))
            .collect();
        DeviceSnapshot::capture(&particles, 1.0)
    }

    #[test]
    fn kernel_outputs_are_antisymmetric() {
        let snap = snapshot(&[(0.0, 0.0), (0.5, 0.0), (5.0, 5.0)]);
        let first = snap.evaluate(0);
        let second = snap.evaluate(1);

        assert_relative_eq!(first.delta.x, -0.25);
        assert_relative_eq!(second.delta.x, 0.25);
        assert_eq!(first.partners, vec![1]);
        assert!(second.partners.is_empty());
        assert_eq!(snap.evaluate(2), KernelOutput::default());
    }

    #[test]
    fn coincident_particles_move_apart() {
        let snap = snapshot(&[(1.0, 1.0), (1.0, 1.0)]);
        assert_relative_eq!(snap.evaluate(0).delta.x, 0.5);
        assert_relative_eq!(snap.evaluate(1).delta.x, -0.5);
    }

    #[test]
    fn noop_backend_reports_unavailable() {
        let mut buffers = PassBuffers::acquire(&[Particle::default()], 1.0);
        let result = NoopBackend::new().dispatch_collisions(&mut buffers);
        assert!(matches!(result, Err(BackendError::Unavailable(_))));
    }
}
