//! Double-buffered per-neuron activation state.
//!
//! The update must be a pure function of the entire prior vector, so each
//! step writes into a separate "next" buffer and the two are swapped at
//! the step boundary. Stats are always taken from the just-produced next
//! buffer, before the swap.

use serde::Serialize;

/// Output neurons count as activated above this value.
pub const GROUP_ACTIVATION_THRESHOLD: f32 = 1e-4;

/// Any neuron counts as activated above this value.
pub const NEURON_ACTIVATION_THRESHOLD: f32 = 1e-2;

/// Aggregate statistics derived from one step's output vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepStats {
    /// Output neurons (the trailing `block_count` slots) above 1e-4.
    pub groups_activated: usize,
    /// Percentage of all neurons above 1e-2.
    pub neurons_activated_pct: f32,
}

#[derive(Debug, Clone)]
pub struct ActivationState {
    current: Vec<f32>,
    next: Vec<f32>,
}

impl ActivationState {
    pub fn new(size: usize) -> Self {
        Self {
            current: vec![0.0; size],
            next: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current(&self) -> &[f32] {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut [f32] {
        &mut self.current
    }

    pub fn next(&self) -> &[f32] {
        &self.next
    }

    pub fn next_mut(&mut self) -> &mut [f32] {
        &mut self.next
    }

    /// Borrow both buffers at once for a dispatch.
    pub fn buffers(&mut self) -> (&[f32], &mut [f32]) {
        (&self.current, &mut self.next)
    }

    /// Discard any stimulus left in the next buffer's input prefix from
    /// the previous iteration.
    pub fn clear_next_inputs(&mut self, input_count: usize) {
        for v in &mut self.next[..input_count] {
            *v = 0.0;
        }
    }

    /// The next buffer becomes current for the following step.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Two independent linear scans over the pre-swap next vector, with
    /// the fixed thresholds. The thresholds are load-bearing constants,
    /// not configuration.
    pub fn compute_stats(&self, block_count: usize) -> StepStats {
        let size = self.next.len();
        let outputs = &self.next[size - block_count..];
        let groups_activated = outputs
            .iter()
            .filter(|&&v| v > GROUP_ACTIVATION_THRESHOLD)
            .count();

        let neurons_activated = self
            .next
            .iter()
            .filter(|&&v| v > NEURON_ACTIVATION_THRESHOLD)
            .count();

        StepStats {
            groups_activated,
            neurons_activated_pct: 100.0 * neurons_activated as f32 / size as f32,
        }
    }
}
