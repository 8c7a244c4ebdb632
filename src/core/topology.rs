//! Stochastic topology generation.
//!
//! The network is one fixed shape: an input layer sparsely wired into a
//! hidden region, the hidden region partitioned into densely coupled
//! blocks ("pseudo-cliques"), and one private output neuron per block fed
//! by a fixed tap pattern around the block midpoint. Weights live in a
//! dense row-major matrix; `0.0` means "no edge" and must stay that way.

use std::ops::Range;

use serde::Serialize;

use crate::error::Error;
use crate::prng::Prng;

/// Nominal block size. Actual blocks land in one of four buckets around it.
pub const NOMINAL_BLOCK_SIZE: usize = 100;

/// Equally likely block sizes: nominal -20, -10, +10, +20.
const BLOCK_SIZE_BUCKETS: [usize; 4] = [
    NOMINAL_BLOCK_SIZE - 20,
    NOMINAL_BLOCK_SIZE - 10,
    NOMINAL_BLOCK_SIZE + 10,
    NOMINAL_BLOCK_SIZE + 20,
];

/// Per-edge probability of wiring an input neuron into a hidden neuron.
const INPUT_FEED_PROB: f32 = 1.0 / 8.0;

/// Per-edge probability of the light background coupling across the whole
/// hidden region, independent of block membership.
const HIDDEN_COUPLING_PROB: f32 = 1.0 / 64.0;

/// Per-direction probability of wiring a pair inside a block.
const BLOCK_EDGE_PROB: f32 = 1.0 / 2.0;

/// Weight on input feeds, background coupling and output taps.
const FEED_WEIGHT: f32 = 1.0;

// Structural constants carried over unchanged; no semantic rationale is
// documented for the asymmetry or the exact tap spread.
const BLOCK_FORWARD_WEIGHT: f32 = 3.0;
const BLOCK_BACKWARD_WEIGHT: f32 = 4.0;

/// Rows (relative to the block midpoint) that feed the block's output
/// neuron. A fixed spread, not a contiguous or random set.
const OUTPUT_TAP_OFFSETS: [i64; 9] = [-30, -25, -20, -10, 0, 10, 20, 25, 30];

/// Smallest legal input layer.
pub const MIN_INPUT_COUNT: usize = 1;

/// Smallest legal block count.
pub const MIN_BLOCK_COUNT: usize = 3;

/// Bounds check for the input-layer size, applied at the boundary (CLI
/// flags and the prompt loop) rather than inside the generator.
pub fn validate_input_count(n: usize) -> Result<usize, Error> {
    if n < MIN_INPUT_COUNT {
        return Err(Error::Config(format!(
            "input layer size must be at least {MIN_INPUT_COUNT} (got {n})"
        )));
    }
    Ok(n)
}

/// Bounds check for the hidden block count.
pub fn validate_block_count(n: usize) -> Result<usize, Error> {
    if n < MIN_BLOCK_COUNT {
        return Err(Error::Config(format!(
            "block count must be at least {MIN_BLOCK_COUNT} (got {n})"
        )));
    }
    Ok(n)
}

/// Dense weighted digraph over all neurons.
///
/// Index layout, contiguous and non-overlapping:
/// `[0, input_count)` input layer, `[input_count, size - block_count)`
/// hidden neurons partitioned per block, `[size - block_count, size)` one
/// output neuron per block in block order.
#[derive(Debug, Clone)]
pub struct Network {
    size: usize,
    input_count: usize,
    block_count: usize,
    block_sizes: Vec<usize>,
    block_offsets: Vec<usize>,
    /// Row-major `size * size`; row = source, column = destination.
    weights: Vec<f32>,
}

/// Serializable topology report for the CLI `--summary` flag.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSummary {
    pub size: usize,
    pub input_count: usize,
    pub block_count: usize,
    pub block_sizes: Vec<usize>,
    pub block_offsets: Vec<usize>,
    pub edges_total: usize,
    pub edges_feed: usize,
    pub edges_block_forward: usize,
    pub edges_block_backward: usize,
}

impl Network {
    /// Generate a fresh topology. Draws every random decision from `rng`,
    /// so a fixed seed reproduces the matrix bit for bit.
    ///
    /// `input_count >= 1` and `block_count >= 3` are enforced by the
    /// caller; the generator only debug-asserts them.
    pub fn generate(
        input_count: usize,
        block_count: usize,
        rng: &mut Prng,
    ) -> Result<Self, Error> {
        debug_assert!(input_count >= 1);
        debug_assert!(block_count >= 3);

        // Input and output layers are fixed; blocks add their drawn sizes.
        let mut size = input_count + block_count;
        let mut block_sizes = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let b = BLOCK_SIZE_BUCKETS[rng.pick_bucket(BLOCK_SIZE_BUCKETS.len())];
            block_sizes.push(b);
            size += b;
        }

        let mut block_offsets = Vec::with_capacity(block_count);
        let mut prefix = input_count;
        for &b in &block_sizes {
            block_offsets.push(prefix);
            prefix += b;
        }

        // The matrix is the one allocation that can realistically fail;
        // surface that as a resource error instead of aborting.
        let mut weights: Vec<f32> = Vec::new();
        weights.try_reserve_exact(size * size)?;
        weights.resize(size * size, 0.0);

        let mut net = Self {
            size,
            input_count,
            block_count,
            block_sizes,
            block_offsets,
            weights,
        };

        net.wire_input_feeds(rng);
        net.wire_output_taps();
        net.wire_hidden_coupling(rng);
        net.wire_blocks(rng);

        Ok(net)
    }

    /// Sparse random bipartite wiring from every input neuron into the
    /// combined hidden region. Not block-aware.
    fn wire_input_feeds(&mut self, rng: &mut Prng) {
        let hidden = self.hidden_range();
        for src in 0..self.input_count {
            for dst in hidden.clone() {
                if rng.chance(INPUT_FEED_PROB) {
                    self.set(src, dst, FEED_WEIGHT);
                }
            }
        }
    }

    /// Nine fixed-offset rows around each block's midpoint feed that
    /// block's output neuron. Offsets are clamped to the block's index
    /// range; for the four legal size buckets the clamp never engages.
    fn wire_output_taps(&mut self) {
        let out_base = self.size - self.block_count;
        for b in 0..self.block_count {
            let start = self.block_offsets[b];
            let end = start + self.block_sizes[b] - 1;
            let mid = (start + self.block_sizes[b] / 2) as i64;
            for d in OUTPUT_TAP_OFFSETS {
                let row = (mid + d).clamp(start as i64, end as i64) as usize;
                self.set(row, out_base + b, FEED_WEIGHT);
            }
        }
    }

    /// Light background coupling across the whole hidden region. Self
    /// edges are never drawn.
    fn wire_hidden_coupling(&mut self, rng: &mut Prng) {
        let hidden = self.hidden_range();
        for src in hidden.clone() {
            for dst in hidden.clone() {
                if src != dst && rng.chance(HIDDEN_COUPLING_PROB) {
                    self.set(src, dst, FEED_WEIGHT);
                }
            }
        }
    }

    /// Dense asymmetric coupling inside each block. Both directions of an
    /// unordered pair are sampled independently, so a pair may end up with
    /// neither, either, or both edges. Overwrites any background coupling
    /// placed by the previous stage.
    fn wire_blocks(&mut self, rng: &mut Prng) {
        for b in 0..self.block_count {
            let start = self.block_offsets[b];
            for j in 0..self.block_sizes[b] {
                for k in 0..j {
                    if rng.chance(BLOCK_EDGE_PROB) {
                        self.set(start + j, start + k, BLOCK_FORWARD_WEIGHT);
                    }
                    if rng.chance(BLOCK_EDGE_PROB) {
                        self.set(start + k, start + j, BLOCK_BACKWARD_WEIGHT);
                    }
                }
                // Self edges stay exactly zero.
                self.set(start + j, start + j, 0.0);
            }
        }
    }

    #[inline]
    fn set(&mut self, src: usize, dst: usize, w: f32) {
        self.weights[src * self.size + dst] = w;
    }

    #[inline]
    pub fn weight(&self, src: usize, dst: usize) -> f32 {
        self.weights[src * self.size + dst]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    pub fn block_offsets(&self) -> &[usize] {
        &self.block_offsets
    }

    /// Hidden (block-region) neuron indices.
    pub fn hidden_range(&self) -> Range<usize> {
        self.input_count..self.size - self.block_count
    }

    /// Output neuron indices, one per block, in block order.
    pub fn output_range(&self) -> Range<usize> {
        self.size - self.block_count..self.size
    }

    pub fn summary(&self) -> NetworkSummary {
        let mut edges_total = 0;
        let mut edges_feed = 0;
        let mut edges_block_forward = 0;
        let mut edges_block_backward = 0;
        for &w in &self.weights {
            if w != 0.0 {
                edges_total += 1;
            }
            if w == FEED_WEIGHT {
                edges_feed += 1;
            } else if w == BLOCK_FORWARD_WEIGHT {
                edges_block_forward += 1;
            } else if w == BLOCK_BACKWARD_WEIGHT {
                edges_block_backward += 1;
            }
        }
        NetworkSummary {
            size: self.size,
            input_count: self.input_count,
            block_count: self.block_count,
            block_sizes: self.block_sizes.clone(),
            block_offsets: self.block_offsets.clone(),
            edges_total,
            edges_feed,
            edges_block_forward,
            edges_block_backward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(input: usize, blocks: usize, seed: u64) -> Network {
        let mut rng = Prng::new(seed);
        Network::generate(input, blocks, &mut rng).unwrap()
    }

    #[test]
    fn parameter_bounds_are_enforced() {
        assert!(matches!(validate_input_count(0), Err(Error::Config(_))));
        assert_eq!(validate_input_count(1).unwrap(), 1);
        assert_eq!(validate_input_count(500).unwrap(), 500);

        assert!(matches!(validate_block_count(0), Err(Error::Config(_))));
        assert!(matches!(validate_block_count(2), Err(Error::Config(_))));
        assert_eq!(validate_block_count(3).unwrap(), 3);
    }

    #[test]
    fn size_accounts_for_every_region() {
        for seed in [1, 2, 3, 99] {
            let net = gen(10, 4, seed);
            let hidden: usize = net.block_sizes().iter().sum();
            assert_eq!(net.size(), 10 + hidden + 4);
            assert_eq!(net.weights().len(), net.size() * net.size());
        }
    }

    #[test]
    fn block_sizes_come_from_the_four_buckets() {
        let net = gen(5, 12, 17);
        for &b in net.block_sizes() {
            assert!([80, 90, 110, 120].contains(&b), "unexpected size {b}");
        }
    }

    #[test]
    fn size_grows_with_block_count_under_same_seed() {
        // Same seed means the first n bucket draws are shared, so each
        // extra block strictly adds neurons.
        let mut prev = gen(10, 3, 42).size();
        for blocks in 4..8 {
            let next = gen(10, blocks, 42).size();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let a = gen(10, 5, 1234);
        let b = gen(10, 5, 1234);
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.block_sizes(), b.block_sizes());
    }

    #[test]
    fn different_seeds_differ() {
        let a = gen(10, 5, 1);
        let b = gen(10, 5, 2);
        assert_ne!(a.weights(), b.weights());
    }

    #[test]
    fn self_edges_are_zero_everywhere() {
        let net = gen(8, 4, 7);
        for i in 0..net.size() {
            assert_eq!(net.weight(i, i), 0.0, "self edge at {i}");
        }
    }

    #[test]
    fn output_taps_stay_inside_their_block() {
        // Covers the smallest (80) and largest (120) buckets across seeds.
        let mut seen_small = false;
        let mut seen_large = false;
        for seed in 0..40u64 {
            let net = gen(4, 6, seed);
            seen_small |= net.block_sizes().contains(&80);
            seen_large |= net.block_sizes().contains(&120);

            let out_base = net.size() - net.block_count();
            for b in 0..net.block_count() {
                let start = net.block_offsets()[b];
                let end = start + net.block_sizes()[b];
                let taps: Vec<usize> = (0..net.size())
                    .filter(|&row| net.weight(row, out_base + b) != 0.0)
                    .collect();
                assert_eq!(taps.len(), 9, "block {b} should have nine taps");
                for row in taps {
                    assert!(row >= start && row < end, "tap {row} escaped block {b}");
                }
            }
        }
        assert!(seen_small && seen_large, "buckets 80 and 120 never drawn");
    }

    #[test]
    fn output_taps_match_the_fixed_offsets() {
        let net = gen(4, 3, 11);
        let out_base = net.size() - net.block_count();
        for b in 0..net.block_count() {
            let mid = net.block_offsets()[b] + net.block_sizes()[b] / 2;
            for d in [-30i64, -25, -20, -10, 0, 10, 20, 25, 30] {
                let row = (mid as i64 + d) as usize;
                assert_eq!(net.weight(row, out_base + b), 1.0);
            }
        }
    }

    #[test]
    fn block_weights_use_forward_three_backward_four() {
        let net = gen(4, 3, 5);
        for b in 0..net.block_count() {
            let start = net.block_offsets()[b];
            let len = net.block_sizes()[b];
            let mut forward = 0usize;
            let mut backward = 0usize;
            for j in 0..len {
                for k in 0..j {
                    let fw = net.weight(start + j, start + k);
                    let bw = net.weight(start + k, start + j);
                    assert!(fw == 0.0 || fw == 3.0, "bad forward weight {fw}");
                    assert!(bw == 0.0 || bw == 4.0, "bad backward weight {bw}");
                    if fw == 3.0 {
                        forward += 1;
                    }
                    if bw == 4.0 {
                        backward += 1;
                    }
                }
            }
            // p = 1/2 each way; a dense block cannot plausibly miss both.
            assert!(forward > 0 && backward > 0);
        }
    }

    #[test]
    fn input_rows_only_reach_the_hidden_region() {
        let net = gen(12, 3, 21);
        let hidden = net.hidden_range();
        for src in 0..net.input_count() {
            for dst in 0..net.size() {
                let w = net.weight(src, dst);
                if !hidden.contains(&dst) {
                    assert_eq!(w, 0.0, "input {src} wired outside hidden at {dst}");
                } else {
                    assert!(w == 0.0 || w == 1.0);
                }
            }
        }
    }

    #[test]
    fn no_edges_leave_the_output_layer() {
        let net = gen(6, 4, 33);
        for src in net.output_range() {
            for dst in 0..net.size() {
                assert_eq!(net.weight(src, dst), 0.0);
            }
        }
    }

    #[test]
    fn no_negative_weights() {
        let net = gen(10, 5, 77);
        assert!(net.weights().iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn summary_counts_agree_with_the_matrix() {
        let net = gen(6, 3, 13);
        let s = net.summary();
        let nonzero = net.weights().iter().filter(|&&w| w != 0.0).count();
        assert_eq!(s.edges_total, nonzero);
        assert_eq!(
            s.edges_total,
            s.edges_feed + s.edges_block_forward + s.edges_block_backward
        );
        assert_eq!(s.block_sizes, net.block_sizes());
    }
}
