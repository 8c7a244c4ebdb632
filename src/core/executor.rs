//! Step executors: the injected update-kernel capability.
//!
//! The driver treats a dispatch as an opaque pure function
//! `f(network, current) -> next`; the numeric update rule lives entirely
//! on this side of the seam. All shipped executors implement the same
//! thresholded leaky integrate-and-fire rule, so cpu, parallel and gpu
//! runs are interchangeable.

use crate::error::Error;
use crate::topology::Network;

/// A neuron fires once its activation exceeds this value.
pub const FIRE_THRESHOLD: f32 = 30.0;

/// Fraction of activation a non-firing neuron keeps between steps.
pub const LEAK_FACTOR: f32 = 0.5;

/// One parallel update step over the full neuron range.
///
/// `dispatch` must fully overwrite `next` from `net` and `current` alone;
/// it must not read `next`. Failures are fatal to the run.
pub trait StepExecutor {
    fn dispatch(&mut self, net: &Network, current: &[f32], next: &mut [f32])
        -> Result<(), Error>;

    /// Human-readable backend name for startup logging.
    fn name(&self) -> &'static str;
}

#[inline]
pub(crate) fn update_neuron(net: &Network, current: &[f32], dst: usize) -> f32 {
    let size = net.size();
    let weights = net.weights();
    let mut acc = if current[dst] > FIRE_THRESHOLD {
        // Fired last step: reset, keep only fresh input.
        0.0
    } else {
        current[dst] * LEAK_FACTOR
    };
    for (src, &v) in current.iter().enumerate() {
        if v > FIRE_THRESHOLD {
            acc += weights[src * size + dst];
        }
    }
    acc
}

impl StepExecutor for Box<dyn StepExecutor> {
    fn dispatch(
        &mut self,
        net: &Network,
        current: &[f32],
        next: &mut [f32],
    ) -> Result<(), Error> {
        (**self).dispatch(net, current, next)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Single-threaded reference executor.
#[derive(Debug, Default)]
pub struct CpuExecutor;

impl StepExecutor for CpuExecutor {
    fn dispatch(
        &mut self,
        net: &Network,
        current: &[f32],
        next: &mut [f32],
    ) -> Result<(), Error> {
        debug_assert_eq!(current.len(), net.size());
        debug_assert_eq!(next.len(), net.size());
        for (dst, out) in next.iter_mut().enumerate() {
            *out = update_neuron(net, current, dst);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

/// Rayon data-parallel executor; same rule, neuron range split across the
/// thread pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Default)]
pub struct ParallelExecutor;

#[cfg(feature = "parallel")]
impl StepExecutor for ParallelExecutor {
    fn dispatch(
        &mut self,
        net: &Network,
        current: &[f32],
        next: &mut [f32],
    ) -> Result<(), Error> {
        use rayon::prelude::*;

        debug_assert_eq!(current.len(), net.size());
        debug_assert_eq!(next.len(), net.size());
        next.par_iter_mut().enumerate().for_each(|(dst, out)| {
            *out = update_neuron(net, current, dst);
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}
