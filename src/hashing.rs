//! Content hashing and seeded pseudo-randomness.
//!
//! Everything downstream that needs randomness draws from a [`SeededRng`]
//! constructed from the audio's content hash, so the same audio always
//! produces the same structure across sessions and reloads.

/// Sampling stride for the content hash. Bounds hashing cost on long audio
/// while still touching the whole waveform.
pub const HASH_STRIDE: usize = 1000;

/// Hash the first channel's decoded samples into a stable identifier.
///
/// Every `HASH_STRIDE`-th sample is scaled by 10^5, truncated to an integer,
/// and folded into a wrapping 32-bit multiply-by-31 hash. The result is the
/// absolute value rendered as lowercase hex. Pure function of the sample
/// values: no dependency on sample rate, wall-clock time, or call count.
///
/// An empty sample sequence hashes to `"0"`.
pub fn content_hash(samples: &[f32]) -> String {
    let mut hash: i32 = 0;
    for sample in samples.iter().step_by(HASH_STRIDE) {
        let quantized = (sample * 100_000.0) as i32;
        hash = hash.wrapping_mul(31).wrapping_add(quantized);
    }
    format!("{:x}", hash.unsigned_abs())
}

/// Deterministic pseudo-random stream over a 32-bit state.
///
/// Constructed from a seed string; two streams built from the same seed
/// produce identical sequences. There is no rewind: restart by
/// reconstructing with the same seed. Each consumer owns its own instance.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    /// Derive the initial state by folding the seed's character codes with
    /// the same multiply-by-31 family used by [`content_hash`].
    pub fn new(seed: &str) -> Self {
        let mut state: i32 = 0;
        for c in seed.chars() {
            state = state.wrapping_mul(31).wrapping_add(c as i32);
        }
        Self {
            state: state as u32,
        }
    }

    /// Advance the linear-congruential state and return the next draw in
    /// [0, 1). Uses the top 24 bits of state so the result stays strictly
    /// below 1.0 at f32 precision.
    pub fn next(&mut self) -> f32 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        (self.state >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    /// Next draw mapped linearly into `[lo, hi)`.
    pub fn next_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next()
    }

    /// Next draw mapped into the inclusive integer range `[lo, hi]`.
    pub fn next_usize_inclusive(&mut self, lo: usize, hi: usize) -> usize {
        debug_assert!(lo <= hi);
        let span = (hi - lo + 1) as f32;
        lo + ((self.next() * span) as usize).min(hi - lo)
    }
}
