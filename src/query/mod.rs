pub mod engine;
pub mod grep;

pub use engine::Candidates;
pub use grep::{GrepHit, GrepSummary};
