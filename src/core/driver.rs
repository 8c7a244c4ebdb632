//! The step loop.
//!
//! A single control thread runs a strictly sequential loop: dispatch the
//! update over the whole neuron range, derive stats from the result,
//! inject wall-clock-gated stimulus into the input prefix, swap buffers.
//! The loop is unbounded by design; it ends only when the shared cancel
//! flag is raised, checked once per iteration boundary (never mid-step).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::executor::StepExecutor;
use crate::prng::Prng;
use crate::state::{ActivationState, StepStats};
use crate::stimulus::StimulusScheduler;
use crate::topology::Network;

pub struct SimulationDriver<E: StepExecutor> {
    net: Network,
    state: ActivationState,
    executor: E,
    scheduler: StimulusScheduler,
    rng: Prng,
    cancel: Arc<AtomicBool>,
    steps: u64,
}

impl<E: StepExecutor> SimulationDriver<E> {
    pub fn new(net: Network, executor: E, rng: Prng, cancel: Arc<AtomicBool>) -> Self {
        let state = ActivationState::new(net.size());
        Self {
            net,
            state,
            executor,
            scheduler: StimulusScheduler,
            rng,
            cancel,
            steps: 0,
        }
    }

    pub fn network(&self) -> &Network {
        &self.net
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    /// Mutable access to the activation buffers, for priming initial
    /// state. The driver thread is the only mutator during a run.
    pub fn state_mut(&mut self) -> &mut ActivationState {
        &mut self.state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// One full step at wall-clock second `now_secs`. Separated from
    /// [`run`](Self::run) so tests can drive the loop with a fixed clock.
    pub fn step_at(&mut self, now_secs: u64) -> Result<StepStats, Error> {
        let input_count = self.net.input_count();

        // Discard stimulus left over from the previous iteration.
        self.state.clear_next_inputs(input_count);

        let (current, next) = self.state.buffers();
        self.executor.dispatch(&self.net, current, next)?;

        // Stats come from the just-produced vector, pre-swap.
        let stats = self.state.compute_stats(self.net.block_count());

        self.scheduler.inject(
            &mut self.state.next_mut()[..input_count],
            now_secs,
            &mut self.rng,
        );

        // The boosted vector becomes the next step's current state.
        self.state.swap();
        self.steps += 1;
        Ok(stats)
    }

    /// Run until cancelled, reporting stats after every step. An executor
    /// failure aborts the loop with no partial-step recovery.
    pub fn run<F>(&mut self, mut report: F) -> Result<(), Error>
    where
        F: FnMut(u64, StepStats),
    {
        while !self.cancel.load(Ordering::Relaxed) {
            let stats = self.step_at(wall_clock_secs())?;
            report(self.steps, stats);
        }
        Ok(())
    }
}

fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
