//! dg-rng: Seeded random draws for dungeon graph synthesis
//!
//! Wraps a ChaCha8 stream so that every consumer draws from one explicit,
//! reproducible generator. Nothing in the synthesis pipeline holds a global
//! or thread-local RNG; callers pass `&mut DungeonRng` down the stack.
//!
//! An optional draw trace records every call so two runs that should agree
//! can be diffed draw by draw when they don't.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Value recorded for a traced draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DrawValue {
    Int(u64),
    Float(f64),
}

/// A draw trace entry for debugging divergences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawTraceEntry {
    /// Sequence number (0-indexed, counts every draw since creation)
    pub seq: u64,
    /// Drawing function (e.g. "rn2", "next_f64")
    pub func: &'static str,
    /// Argument (modulus for integer draws, 0 for float draws)
    pub arg: u64,
    /// Result value
    pub result: DrawValue,
}

/// Dungeon random number generator
///
/// Wraps ChaCha8Rng for reproducible generation.
/// Note: stream position is not serialized - a restored generator restarts from its seed.
#[derive(Debug, Clone)]
pub struct DungeonRng {
    rng: ChaCha8Rng,
    seed: u64,
    draws: u64,
    tracing: bool,
    trace: Vec<DrawTraceEntry>,
}

// Custom serialization - only serialize seed, recreate RNG on deserialize
impl Serialize for DungeonRng {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.seed.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DungeonRng {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let seed = u64::deserialize(deserializer)?;
        Ok(DungeonRng::new(seed))
    }
}

impl DungeonRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            draws: 0,
            tracing: false,
            trace: Vec::new(),
        }
    }

    /// Get the seed used to create this RNG
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of draws consumed so far
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Returns 0..n-1
    ///
    /// Returns 0 if n is 0 without consuming a draw.
    pub fn rn2(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let res = self.rng.gen_range(0..n);
        self.record("rn2", n as u64, DrawValue::Int(res as u64));
        res
    }

    /// Returns 1..n
    ///
    /// Returns 0 if n is 0 without consuming a draw.
    pub fn rnd(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.rn2(n) + 1
    }

    /// Uniform integer in `lo..=hi`. Swapped bounds are normalised.
    pub fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        lo + self.rn2(hi - lo + 1)
    }

    /// Uniform float in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        let res: f64 = self.rng.gen_range(0.0..1.0);
        self.record("next_f64", 0, DrawValue::Float(res));
        res
    }

    /// Uniform float in `[lo, hi)`
    ///
    /// Always consumes exactly one draw, even for an empty interval, so the
    /// stream position does not depend on the parameters.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let u = self.next_f64();
        if hi <= lo { lo } else { lo + (hi - lo) * u }
    }

    /// Returns true with probability `p` (clamped to [0, 1])
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p.clamp(0.0, 1.0)
    }

    /// Choose a random element from a slice
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.rn2(items.len() as u32) as usize])
        }
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Returns None when every weight is zero or the slice is empty.
    pub fn weighted_index(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.rn2(total);
        for (i, &w) in weights.iter().enumerate() {
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        None
    }

    /// Shuffle a slice in place (Fisher-Yates)
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rn2(i as u32 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Enable draw tracing; clears any previous trace
    pub fn enable_tracing(&mut self) {
        self.tracing = true;
        self.trace.clear();
    }

    /// Disable draw tracing (the recorded trace is kept)
    pub fn disable_tracing(&mut self) {
        self.tracing = false;
    }

    /// Draws recorded since tracing was last enabled
    pub fn trace(&self) -> &[DrawTraceEntry] {
        &self.trace
    }

    fn record(&mut self, func: &'static str, arg: u64, result: DrawValue) {
        if self.tracing {
            self.trace.push(DrawTraceEntry {
                seq: self.draws,
                func,
                arg,
                result,
            });
        }
        self.draws += 1;
    }
}
