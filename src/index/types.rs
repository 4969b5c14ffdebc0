use crate::utils::BloomFilter;
use serde::{Deserialize, Serialize};

/// A trigram is a 3-byte sequence stored as u32 (only lower 24 bits used)
pub type Trigram = u32;

/// Default number of blobs one query worker tests
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// One indexed file: its path and the filter over its trigrams.
///
/// `filter` is `None` when the file was deliberately skipped at build time
/// (binary or oversized content). Such a blob only surfaces for queries too
/// short to carry a trigram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Repo-relative, slash-separated path
    pub path: String,
    pub filter: Option<BloomFilter>,
}

impl Blob {
    pub fn new(path: impl Into<String>, filter: Option<BloomFilter>) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }

    /// True if the filter says every trigram may be present
    #[inline]
    pub fn may_contain_all(&self, trigrams: &[Trigram]) -> bool {
        self.filter
            .as_ref()
            .is_some_and(|f| f.might_contain_all(trigrams))
    }
}

/// Configuration for building and querying an index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Files above this size get no filter
    pub max_file_size: u64,
    /// Target false positive rate of each per-file filter
    pub false_positive_rate: f64,
    /// Blobs per query worker
    pub batch_size: usize,
    /// Glob patterns excluded from the working-tree walk
    pub ignored_paths: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100MB - matches GitHub's file size limit
            false_positive_rate: 0.01,
            batch_size: DEFAULT_BATCH_SIZE,
            ignored_paths: Vec::new(),
        }
    }
}

impl IndexConfig {
    /// Batch size with 0 treated as 1
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// CRC32 over the fields that shape a built index.
    ///
    /// Stored in the cache so an index built under other settings is rebuilt
    /// instead of reused. `batch_size` only affects querying and is left out.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.max_file_size.to_le_bytes());
        hasher.update(&self.false_positive_rate.to_bits().to_le_bytes());
        hasher.update(&(self.ignored_paths.len() as u64).to_le_bytes());
        for pattern in &self.ignored_paths {
            hasher.update(&(pattern.len() as u64).to_le_bytes());
            hasher.update(pattern.as_bytes());
        }
        hasher.finalize()
    }
}

/// Summary numbers about an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub blobs: usize,
    pub filtered: usize,
    pub skipped: usize,
    pub filter_bytes: usize,
}

/// Convert 3 bytes to a trigram
#[inline]
pub fn bytes_to_trigram(b0: u8, b1: u8, b2: u8) -> Trigram {
    ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32)
}

/// Convert trigram back to bytes
#[inline]
pub fn trigram_to_bytes(t: Trigram) -> [u8; 3] {
    [
        ((t >> 16) & 0xFF) as u8,
        ((t >> 8) & 0xFF) as u8,
        (t & 0xFF) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigram_packing() {
        let t = bytes_to_trigram(b'a', b'b', b'c');
        assert_eq!(t, 0x616263);
        assert_eq!(trigram_to_bytes(t), *b"abc");
        assert_eq!(trigram_to_bytes(bytes_to_trigram(0xff, 0, 0x80)), [0xff, 0, 0x80]);
    }

    #[test]
    fn test_blob_without_filter_never_matches() {
        let blob = Blob::new("bin/tool", None);
        assert!(!blob.may_contain_all(&[]));
        assert!(!blob.may_contain_all(&[0x616263]));
    }

    #[test]
    fn test_effective_batch_size() {
        let mut config = IndexConfig::default();
        assert_eq!(config.effective_batch_size(), DEFAULT_BATCH_SIZE);
        config.batch_size = 0;
        assert_eq!(config.effective_batch_size(), 1);
    }

    #[test]
    fn test_fingerprint_tracks_build_settings() {
        let base = IndexConfig::default();
        assert_eq!(base.fingerprint(), IndexConfig::default().fingerprint());

        let batch_only = IndexConfig {
            batch_size: 7,
            ..IndexConfig::default()
        };
        assert_eq!(batch_only.fingerprint(), base.fingerprint());

        let changed = [
            IndexConfig {
                max_file_size: 4,
                ..IndexConfig::default()
            },
            IndexConfig {
                false_positive_rate: 0.3,
                ..IndexConfig::default()
            },
            IndexConfig {
                ignored_paths: vec!["*.lock".to_string()],
                ..IndexConfig::default()
            },
        ];
        for config in &changed {
            assert_ne!(config.fingerprint(), base.fingerprint(), "{:?}", config);
        }

        // Pattern boundaries are part of the fingerprint
        let split = IndexConfig {
            ignored_paths: vec!["ab".to_string(), "c".to_string()],
            ..IndexConfig::default()
        };
        let joined = IndexConfig {
            ignored_paths: vec!["a".to_string(), "bc".to_string()],
            ..IndexConfig::default()
        };
        assert_ne!(split.fingerprint(), joined.fingerprint());
    }
}
