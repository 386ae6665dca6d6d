use std::time::Instant;

use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    error::BackendError,
    gpu::{ComputeBackend, DispatchStats, PassBuffers},
};

/// Runs the collision kernel on the rayon thread pool, one task per particle.
///
/// Without the `parallel` feature the same kernel runs sequentially, which keeps the
/// single-snapshot semantics identical.
pub struct WorkerBackend {
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    min_batch: usize,
    last: Mutex<Option<DispatchStats>>,
}

impl Default for WorkerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerBackend {
    pub fn new() -> Self {
        Self::with_min_batch(64)
    }

    /// Smallest number of particles a single worker handles before splitting.
    pub fn with_min_batch(min_batch: usize) -> Self {
        Self {
            min_batch: min_batch.max(1),
            last: Mutex::new(None),
        }
    }
}

impl ComputeBackend for WorkerBackend {
    fn name(&self) -> &str {
        if cfg!(feature = "parallel") {
            "rayon-workers"
        } else {
            "sequential-workers"
        }
    }

    fn dispatch_collisions(&self, buffers: &mut PassBuffers) -> Result<(), BackendError> {
        let PassBuffers { snapshot, outputs } = buffers;
        let snapshot = &*snapshot;
        if outputs.len() != snapshot.particle_count() {
            return Err(BackendError::BufferMismatch {
                expected: snapshot.particle_count(),
                got: outputs.len(),
            });
        }

        let start = Instant::now();

        #[cfg(feature = "parallel")]
        outputs
            .par_iter_mut()
            .with_min_len(self.min_batch)
            .enumerate()
            .for_each(|(index, slot)| *slot = snapshot.evaluate(index));

        #[cfg(not(feature = "parallel"))]
        outputs
            .iter_mut()
            .enumerate()
            .for_each(|(index, slot)| *slot = snapshot.evaluate(index));

        let stats = DispatchStats {
            invocations: outputs.len(),
            contacts: outputs.iter().map(|slot| slot.partners.len()).sum(),
            elapsed: start.elapsed(),
        };
        *self.last.lock() = Some(stats);
        Ok(())
    }

    fn last_dispatch(&self) -> Option<DispatchStats> {
        *self.last.lock()
    }
}
