//! Deterministic RNG helpers.
//!
//! Everything here is small, dependency-free and **not** cryptographic. The state of every
//! generator is a plain `u64` so it can be captured in snapshots and restored bit-exactly.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_f32_unit(&mut self) -> f32 {
        // 24 bits of mantissa -> [0, 1)
        let x = self.next_u32() >> 8;
        (x as f32) / ((1u32 << 24) as f32)
    }

    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }

    /// Uniform integer in `[low, high]` (inclusive). Returns `low` when the range is empty.
    fn next_range_u32(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64 + 1;
        let threshold = u64::MAX - (u64::MAX % span);
        loop {
            let x = self.next_u64();
            if x < threshold {
                return low + (x % span) as u32;
            }
        }
    }
}

/// SplitMix64: good seeding RNG and small deterministic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Rebuild a generator from a previously captured [`SplitMix64::state`].
    pub fn from_state(state: u64) -> Self {
        Self { state }
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.step()
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

/// Derive an independent seed for `(agent_id, stream)` from a parent seed.
pub fn derive_seed(global_seed: u64, agent_id: u64, stream: u64) -> u64 {
    let x = global_seed ^ mix64(agent_id.wrapping_add(0x9E3779B97F4A7C15)) ^ mix64(stream);
    mix64(x)
}

/// Seed for child `index` of a node seeded with `parent_seed`.
///
/// Sibling and cousin streams stay decorrelated at any depth, unlike `parent_seed + index`.
pub fn split_seed(parent_seed: u64, index: u64) -> u64 {
    let salted = mix64(parent_seed ^ 0xD1B5_4A32_D192_ED03);
    mix64(salted.wrapping_add(mix64(index.wrapping_add(1).wrapping_mul(0x9E3779B97F4A7C15))))
}

/// FNV-1a over a string; stable across platforms and runs.
pub fn hash_str(s: &str) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
