//! Bloom filter holding the trigram set of a single file.
//!
//! Bit positions are persisted in the cache file, so the hash functions must
//! produce the same output on every platform and every build. Both hashes are
//! derived from a splitmix64 finalizer over the packed trigram.

use crate::index::types::Trigram;

/// Smallest filter ever allocated, in bits
const MIN_BITS: usize = 64;

/// Upper bound on hash functions per key
const MAX_HASHES: u8 = 16;

/// A space-efficient probabilistic set of trigrams.
///
/// No false negatives: every inserted trigram tests positive. A trigram that
/// was never inserted tests positive with roughly the configured probability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit array stored as u64 words
    bits: Vec<u64>,
    /// Number of bits in the filter (always a multiple of 64)
    num_bits: usize,
    /// Number of hash functions to use
    num_hashes: u8,
}

impl BloomFilter {
    /// Create a filter sized for `expected_elements` distinct keys at the
    /// desired false positive rate.
    ///
    /// m = ceil(-n ln p / ln²2) bits, rounded up to whole words;
    /// k = round(m / n · ln 2), clamped to [1, 16].
    pub fn new(expected_elements: usize, false_positive_rate: f64) -> Self {
        let n = expected_elements.max(1) as f64;
        let p = false_positive_rate.clamp(0.0001, 0.5);
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;

        let num_bits = ((-n * p.ln()) / ln2_sq).ceil() as usize;
        let num_words = num_bits.max(MIN_BITS).div_ceil(64);
        let num_bits = num_words * 64;

        let num_hashes = ((num_bits as f64 / n) * std::f64::consts::LN_2).round() as u8;
        let num_hashes = num_hashes.clamp(1, MAX_HASHES);

        Self {
            bits: vec![0u64; num_words],
            num_bits,
            num_hashes,
        }
    }

    /// Build a filter containing every trigram in `trigrams`
    pub fn from_trigrams(trigrams: &[Trigram], false_positive_rate: f64) -> Self {
        let mut filter = Self::new(trigrams.len(), false_positive_rate);
        for &t in trigrams {
            filter.insert(t);
        }
        filter
    }

    /// Restore a filter from its raw state (for loading from disk).
    ///
    /// Returns `None` if the state could not have been produced by [`new`](Self::new).
    pub fn from_raw(bits: Vec<u64>, num_hashes: u8) -> Option<Self> {
        if bits.is_empty() || num_hashes == 0 || num_hashes > MAX_HASHES {
            return None;
        }
        let num_bits = bits.len() * 64;
        Some(Self {
            bits,
            num_bits,
            num_hashes,
        })
    }

    /// Insert a trigram into the filter
    #[inline]
    pub fn insert(&mut self, item: Trigram) {
        let (h1, h2) = hash_pair(item);
        for i in 0..self.num_hashes as u64 {
            // Double hashing: h(i) = h1 + i*h2
            let bit = (h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits as u64) as usize;
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    /// Returns false if `item` is definitely absent, true if possibly present.
    #[inline]
    pub fn might_contain(&self, item: Trigram) -> bool {
        let (h1, h2) = hash_pair(item);
        (0..self.num_hashes as u64).all(|i| {
            let bit = (h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits as u64) as usize;
            self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    /// Check that every item might be contained (for query trigram sets).
    /// An empty slice is vacuously contained.
    #[inline]
    pub fn might_contain_all(&self, items: &[Trigram]) -> bool {
        items.iter().all(|&item| self.might_contain(item))
    }

    /// Get the raw words for serialization
    pub fn bits(&self) -> &[u64] {
        &self.bits
    }

    /// Get the number of hash functions
    pub fn num_hashes(&self) -> u8 {
        self.num_hashes
    }

    /// Get the number of bits
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Get approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.bits.len() * 8 + std::mem::size_of::<Self>()
    }
}

/// splitmix64 finalizer
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Two independent 64-bit hashes of a trigram for double hashing.
/// h2 is forced odd so the probe sequence never collapses onto one bit.
#[inline]
fn hash_pair(item: Trigram) -> (u64, u64) {
    let seed = item as u64;
    let h1 = mix64(seed.wrapping_add(0x9e3779b97f4a7c15));
    let h2 = mix64(seed ^ 0x517cc1b727220a95) | 1;
    (h1, h2)
}
