//! Typed errors for cache decoding.
//!
//! Everything else in the crate reports failures through `anyhow`; the cache
//! needs a closed set of variants so callers can tell "the file is unusable,
//! rebuild" apart from "the disk failed".

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a bitmask cache file (bad magic bytes)")]
    BadMagic,

    #[error("unsupported cache version {found} (expected {expected})")]
    BadVersion { found: u32, expected: u32 },

    #[error("cache file truncated at offset {0}")]
    Truncated(usize),

    #[error("corrupt cache file at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: &'static str },

    #[error("cache checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("cache built with other index settings (fingerprint {found:#010x}, current {expected:#010x})")]
    ConfigMismatch { found: u32, expected: u32 },
}

impl CacheError {
    /// True when the cache content itself is unusable and the index has to be
    /// rebuilt from the filesystem. I/O failures are reported, not papered over.
    pub fn requires_rebuild(&self) -> bool {
        !matches!(self, CacheError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_rebuild() {
        assert!(CacheError::BadMagic.requires_rebuild());
        assert!(CacheError::BadVersion { found: 9, expected: 1 }.requires_rebuild());
        assert!(CacheError::Truncated(12).requires_rebuild());
        assert!(CacheError::ConfigMismatch { found: 1, expected: 2 }.requires_rebuild());
        assert!(
            !CacheError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
                .requires_rebuild()
        );
    }

    #[test]
    fn test_display() {
        let err = CacheError::ChecksumMismatch {
            expected: 0xdeadbeef,
            actual: 0x1,
        };
        assert_eq!(
            err.to_string(),
            "cache checksum mismatch: expected 0xdeadbeef, got 0x00000001"
        );
    }
}
