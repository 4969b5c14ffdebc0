//! # bitmask - Bloom-filtered trigram search
//!
//! bitmask answers literal substring queries over a whole repository without
//! keeping an inverted index. Every file gets a small bloom filter holding the
//! 3-byte windows ("trigrams") of its content. A query is decomposed into its
//! own trigrams, every filter is probed in parallel, and the surviving
//! candidates are re-read and matched exactly to discard false positives.
//!
//! ## Architecture
//!
//! - [`fs`] - The [`FileSystem`](fs::FileSystem) capability and its backends
//! - [`index`] - Building a [`RepoIndex`] and persisting it as a binary cache
//! - [`query`] - Parallel candidate selection and the exact grep verifier
//! - [`output`] - Hit formatting (plain or colored)
//! - [`utils`] - Trigrams, bloom filters, encoding, configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use bitmask::fs::WalkFileSystem;
//! use bitmask::index::{IndexConfig, RepoIndex};
//! use bitmask::output::PlainPrinter;
//!
//! let fs = WalkFileSystem::new("/path/to/repo", &IndexConfig::default()).unwrap();
//! let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();
//!
//! // Cheap, probabilistic: may include false positives, never misses a file
//! for path in index.paths_matching_query(b"fn main") {
//!     println!("candidate: {}", path);
//! }
//!
//! // Exact: re-reads candidates and prints path:line:column hits
//! let mut printer = PlainPrinter::new(std::io::stdout());
//! index.grep(&fs, b"fn main", &mut printer).unwrap();
//! ```

pub mod error;
pub mod fs;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;

pub use error::CacheError;
pub use index::RepoIndex;
