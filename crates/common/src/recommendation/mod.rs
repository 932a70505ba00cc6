//! Cache-first recommendation coordination layered over the auction runner
//! (spec §4.8).

pub mod coordinator;
pub mod types;

pub use coordinator::RecommendationCoordinator;
pub use types::{weave_content, Recommendation, RecommendationStatus};
