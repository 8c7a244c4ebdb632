// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It drives topology generation and stimulus draws; a fixed seed makes
// both fully reproducible.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Seed from the wall clock, for unseeded interactive runs.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED);
        Self::new(nanos)
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        // Marsaglia / Vigna family. Simple, fast, decent for simulation noise.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    pub fn next_f32_01(&mut self) -> f32 {
        // Convert to [0,1).
        let x = self.next_u32();
        (x as f32) / (u32::MAX as f32 + 1.0)
    }

    /// Bernoulli draw: true with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32_01() < p
    }

    /// Uniform pick of one slot out of `n` equally likely slots.
    #[inline]
    pub fn pick_bucket(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        let v = (self.next_f32_01() * n as f32) as usize;
        v.min(n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Prng::new(42);
        let mut b = Prng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn zero_seed_is_remapped() {
        let mut a = Prng::new(0);
        let mut b = Prng::new(0x9E3779B97F4A7C15);
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn unit_draws_stay_in_range() {
        let mut rng = Prng::new(7);
        for _ in 0..10_000 {
            let v = rng.next_f32_01();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn chance_tracks_probability() {
        let mut rng = Prng::new(99);
        let mut hits = 0usize;
        let trials = 100_000;
        for _ in 0..trials {
            if rng.chance(1.0 / 8.0) {
                hits += 1;
            }
        }
        let rate = hits as f32 / trials as f32;
        assert!((rate - 0.125).abs() < 0.01, "rate was {rate}");
    }

    #[test]
    fn bucket_pick_covers_all_slots() {
        let mut rng = Prng::new(3);
        let mut seen = [false; 4];
        for _ in 0..1000 {
            seen[rng.pick_bucket(4)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
