//! Time-gated external stimulus.
//!
//! Input-layer excitability oscillates on a 16-second wall-clock cycle:
//! the per-neuron injection probability is the reciprocal of a sinusoidal
//! amplitude, so the layer is most excitable when the amplitude bottoms
//! out and least excitable at its peak.

use crate::prng::Prng;

/// Length of one excitability cycle, in whole seconds.
pub const CYCLE_SECONDS: u64 = 16;

/// Additive boost applied to a triggered input neuron.
pub const STIMULUS_BOOST: f32 = 20.0;

const AMPLITUDE_SWING: f32 = 512.0;
const AMPLITUDE_BASE: f32 = 860.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct StimulusScheduler;

impl StimulusScheduler {
    /// Per-neuron injection probability at wall-clock second `now_secs`.
    ///
    /// The phase is quantized to whole seconds, giving amplitudes in
    /// `[348, 1372]` and probabilities roughly in `[1/1372, 1/348]`.
    pub fn probability(&self, now_secs: u64) -> f32 {
        let t = (now_secs % CYCLE_SECONDS) as f32;
        let amplitude = AMPLITUDE_SWING
            * (2.0 * std::f32::consts::PI * t / CYCLE_SECONDS as f32).sin()
            + AMPLITUDE_BASE;
        1.0 / amplitude
    }

    /// Draw stimulus for every input slot independently, adding the fixed
    /// boost where triggered. Slots past `input_count` are never touched.
    pub fn inject(&self, inputs: &mut [f32], now_secs: u64, rng: &mut Prng) -> usize {
        let p = self.probability(now_secs);
        let mut injected = 0;
        for v in inputs {
            if rng.chance(p) {
                *v += STIMULUS_BOOST;
                injected += 1;
            }
        }
        injected
    }
}
