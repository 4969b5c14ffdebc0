//! Utility functions and data structures.
//!
//! ## Modules
//!
//! - [`app_data`] - Configuration file and cache location (XDG-compliant)
//! - [`bloom`] - Bloom filter holding one file's trigrams
//! - [`encoding`] - Variable-length integer and little-endian primitives
//! - [`progress`] - Progress bars, no-op without the `progress` feature
//! - [`trigram`] - 3-byte window extraction and binary detection
//!
//! ```
//! use bitmask::utils::{extract_trigrams, trigrams};
//!
//! // Every overlapping window, in order
//! let windows: Vec<[u8; 3]> = trigrams(b"hello").collect();
//! assert_eq!(windows, vec![*b"hel", *b"ell", *b"llo"]);
//!
//! // Distinct windows packed as integers, ready for a filter
//! assert_eq!(extract_trigrams(b"aaaa").len(), 1);
//! ```

pub mod app_data;
pub mod bloom;
pub mod encoding;
pub mod progress;
pub mod trigram;

pub use app_data::*;
pub use bloom::*;
pub use encoding::*;
pub use trigram::*;
