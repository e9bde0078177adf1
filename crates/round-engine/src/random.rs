//! Random sources for synthetic decisions and payoff draws
//!
//! Every draw the engine makes goes through [`RandomSource`], so a session
//! seeded with the same bytes replays the same game. Tests can substitute a
//! scripted source to pin individual draws.

/// A source of uniformly distributed 64-bit values.
///
/// Only `next_u64` is required; the derived helpers are what games use.
pub trait RandomSource {
    /// Generate next u64
    fn next_u64(&mut self) -> u64;

    /// Uniform draw in `[0, 1)`
    fn next_unit(&mut self) -> f64 {
        // 53 high bits fill an f64 mantissa exactly
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a value 0-99 (for percentage checks)
    fn next_percent(&mut self) -> u8 {
        (self.next_u64() % 100) as u8
    }

    /// Generate a value in range [0, max)
    fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        ((self.next_u64() >> 32) as u32) % max
    }

    /// Bernoulli trial: `true` with probability `p` (clamped to `[0, 1]`)
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p.clamp(0.0, 1.0)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Seeded random number generator
///
/// Deterministic: same seed + stream = same sequence
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a new RNG from a 32-byte seed and a stream index
    pub fn new(seed: &[u8; 32], stream: u32) -> Self {
        let mut state = 0u64;
        for (i, chunk) in seed.chunks(8).enumerate() {
            let mut bytes = [0u8; 8];
            bytes[..chunk.len()].copy_from_slice(chunk);
            state ^= u64::from_le_bytes(bytes).wrapping_add(i as u64);
        }

        state ^= (stream as u64).wrapping_mul(0x517cc1b727220a95);

        // xorshift never leaves the all-zero state
        if state == 0 {
            state = 0x9e3779b97f4a7c15;
        }

        let mut rng = Self { state };
        for _ in 0..8 {
            rng.next_u64();
        }

        rng
    }

    /// Convenience constructor from a single integer seed
    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        Self::new(&bytes, 0)
    }

    /// Fork an independent stream for a specific round
    pub fn for_round(&self, round: u32) -> Self {
        let mut state = self.state ^ (round as u64).wrapping_mul(0x9e3779b97f4a7c15);
        if state == 0 {
            state = 0x2545f4914f6cdd1d;
        }
        let mut rng = Self { state };
        rng.next_u64();
        rng
    }
}

impl RandomSource for SeededRng {
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545f4914f6cdd1d)
    }
}
