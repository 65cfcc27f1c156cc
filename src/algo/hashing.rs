use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Second SipHash key word; the first is the run seed.
const KEY1: u64 = 0xCAFEBABE;

/// Keyed 32-bit hash of a byte string.
///
/// SipHash-1-3 keyed by `seed`, truncated to the low 32 bits and reinterpreted
/// as signed. Callers must take `unsigned_abs()` before reducing modulo
/// anything; [`bucket_index`] does that.
pub fn hash32(bytes: &[u8], seed: u64) -> i32 {
    let mut hasher = SipHasher13::new_with_keys(seed, KEY1);
    hasher.write(bytes);
    hasher.finish() as u32 as i32
}

/// Non-negative bucket index for a signed hash.
pub fn bucket_index(hash: i32, num_buckets: usize) -> usize {
    hash.unsigned_abs() as usize % num_buckets
}

/// Linear congruential generator for reproducible parameter draws.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        // LCG constants from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform-ish draw in `[0, bound)`. The low 16 bits of an LCG cycle with
    /// short periods, so they are discarded.
    pub fn below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        (self.next_u64() >> 16) % bound
    }
}
