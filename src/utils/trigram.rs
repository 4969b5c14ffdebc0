use crate::index::types::{Trigram, bytes_to_trigram};

/// Files at or above this size dedup through the bitset instead of sorting.
const BITSET_THRESHOLD: usize = 1024;

/// Bitset over the whole 24-bit trigram space (2MB).
/// Much faster than a HashSet for deduplicating trigrams of large files.
struct TrigramBitset {
    words: Vec<u64>,
}

impl TrigramBitset {
    fn new() -> Self {
        // 2^24 trigrams / 64 bits per word
        Self {
            words: vec![0u64; 1 << 18],
        }
    }

    /// Set the bit for `trigram`. Returns true if it was not set before.
    #[inline]
    fn insert(&mut self, trigram: Trigram) -> bool {
        let word = &mut self.words[(trigram >> 6) as usize];
        let bit = 1u64 << (trigram & 63);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    /// Drain the set bits in ascending order
    fn into_sorted(self, capacity: usize) -> Vec<Trigram> {
        let mut out = Vec::with_capacity(capacity);
        for (idx, &word) in self.words.iter().enumerate() {
            let base = (idx as u32) << 6;
            let mut w = word;
            while w != 0 {
                out.push(base | w.trailing_zeros());
                w &= w - 1;
            }
        }
        out
    }
}

/// Every overlapping 3-byte window of `content`, in order.
///
/// Yields `content.len() - 2` windows, or nothing when the input is shorter
/// than three bytes. Windows are raw bytes; a multi-byte UTF-8 sequence may be
/// split across two windows.
pub fn trigrams(content: &[u8]) -> impl Iterator<Item = [u8; 3]> + '_ {
    content.windows(3).map(|w| [w[0], w[1], w[2]])
}

/// Distinct trigrams of `content`, packed and sorted ascending.
pub fn extract_trigrams(content: &[u8]) -> Vec<Trigram> {
    if content.len() < 3 {
        return Vec::new();
    }

    if content.len() < BITSET_THRESHOLD {
        let mut packed: Vec<Trigram> = trigrams(content)
            .map(|[a, b, c]| bytes_to_trigram(a, b, c))
            .collect();
        packed.sort_unstable();
        packed.dedup();
        return packed;
    }

    let mut bitset = TrigramBitset::new();
    let mut distinct = 0usize;
    for [a, b, c] in trigrams(content) {
        if bitset.insert(bytes_to_trigram(a, b, c)) {
            distinct += 1;
        }
    }
    bitset.into_sorted(distinct)
}

/// Trigrams of a query, deduplicated. Empty for queries under three bytes.
pub fn query_trigrams(query: &[u8]) -> Vec<Trigram> {
    // Queries are short, the sort path is always the right one
    let mut packed: Vec<Trigram> = trigrams(query)
        .map(|[a, b, c]| bytes_to_trigram(a, b, c))
        .collect();
    packed.sort_unstable();
    packed.dedup();
    packed
}

/// Check if content is likely binary
pub fn is_binary(content: &[u8]) -> bool {
    let sample = &content[..content.len().min(8192)];
    if sample.is_empty() {
        return false;
    }

    let nul_count = sample.iter().filter(|&&b| b == 0).count();
    if nul_count > sample.len() / 10 {
        return true;
    }

    let control_count = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t' | 0x0c))
        .count();

    control_count > sample.len() / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigrams_windows() {
        let windows: Vec<[u8; 3]> = trigrams(b"abcde").collect();
        assert_eq!(windows, vec![*b"abc", *b"bcd", *b"cde"]);
    }

    #[test]
    fn test_trigrams_short_input() {
        assert_eq!(trigrams(b"").count(), 0);
        assert_eq!(trigrams(b"a").count(), 0);
        assert_eq!(trigrams(b"ab").count(), 0);
        assert_eq!(trigrams(b"abc").count(), 1);
    }

    #[test]
    fn test_trigrams_split_utf8() {
        // "é" is two bytes; windows cut straight through it
        let windows: Vec<[u8; 3]> = trigrams("aé".as_bytes()).collect();
        assert_eq!(windows, vec![[b'a', 0xc3, 0xa9]]);
        let windows: Vec<[u8; 3]> = trigrams("aéb".as_bytes()).collect();
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn test_extract_trigrams_dedup() {
        assert_eq!(extract_trigrams(b"hello").len(), 3);
        assert_eq!(extract_trigrams(b"aaaaaa").len(), 1);
        assert_eq!(extract_trigrams(b"ab").len(), 0);
    }

    #[test]
    fn test_extract_trigrams_paths_agree() {
        // The bitset path and the sort path must produce the same set
        let content: Vec<u8> = (0..3000u32).map(|i| (i * 7 % 251) as u8).collect();
        let via_bitset = extract_trigrams(&content);

        let mut via_sort: Vec<Trigram> = trigrams(&content)
            .map(|[a, b, c]| bytes_to_trigram(a, b, c))
            .collect();
        via_sort.sort_unstable();
        via_sort.dedup();

        assert_eq!(via_bitset, via_sort);
    }

    #[test]
    fn test_query_trigrams() {
        assert_eq!(query_trigrams(b"hello").len(), 3);
        assert_eq!(query_trigrams(b"abab").len(), 2);
        assert!(query_trigrams(b"").is_empty());
        assert!(query_trigrams(b"hi").is_empty());
    }

    #[test]
    fn test_trigram_bitset() {
        let mut bitset = TrigramBitset::new();
        assert!(bitset.insert(0x626364));
        assert!(!bitset.insert(0x626364));
        assert!(bitset.insert(0x616263));
        assert_eq!(bitset.into_sorted(2), vec![0x616263, 0x626364]);
    }

    #[test]
    fn test_is_binary() {
        assert!(!is_binary(b"hello world\n"));
        assert!(!is_binary(b""));
        assert!(is_binary(b"\x00\x00\x00\x00\x00\x00\x00\x00"));
        assert!(is_binary(b"\x01\x02\x03\x04\x05\x06abc"));
    }
}
