use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

const BITS_PER_KEY: u64 = 10;
const NUM_HASHES: u32 = 7;
const SECOND_SEED: u64 = 0x9747_b28c;

/// Bloom filter over partition keys. Two XxHash64 passes with fixed seeds
/// are combined per probe, so identical key sets always produce identical
/// filter bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    pub fn with_capacity(expected_keys: usize) -> Self {
        let wanted = (expected_keys.max(1) as u64) * BITS_PER_KEY;
        let words = wanted.div_ceil(64).max(1);
        Self {
            bits: vec![0u64; words as usize],
            num_bits: words * 64,
            num_hashes: NUM_HASHES,
        }
    }

    pub fn key_hashes(key: &[u8]) -> (u64, u64) {
        let mut first = XxHash64::with_seed(0);
        first.write(key);
        let mut second = XxHash64::with_seed(SECOND_SEED);
        second.write(key);
        (first.finish(), second.finish())
    }

    pub fn insert(&mut self, key: &[u8]) {
        self.insert_hashes(Self::key_hashes(key));
    }

    pub fn insert_hashes(&mut self, hashes: (u64, u64)) {
        let (h1, h2) = hashes;
        for i in 0..self.num_hashes {
            let bit = h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] |= 1u64 << (bit % 64);
        }
    }

    pub fn might_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = Self::key_hashes(key);
        for i in 0..self.num_hashes {
            let bit = h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits;
            if self.bits[(bit / 64) as usize] & (1u64 << (bit % 64)) == 0 {
                return false;
            }
        }
        true
    }
}
