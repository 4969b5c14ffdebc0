pub mod build;
pub mod cache;
pub mod types;

pub use build::RepoIndex;
pub use cache::load_or_build;
pub use types::*;
