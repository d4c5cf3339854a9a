//! Scoring strategies on top of the raw link scores, and the graph they produce.

pub mod base;
pub mod cache;
pub mod hypergeom;
pub mod likelihood;
pub mod link_graph;
pub mod metcalf;
pub mod score;
pub mod session;

pub use base::{LinkParams, ScoringBase};
pub use cache::{CacheKey, ScoreCache};
pub use hypergeom::HypergeomScoring;
pub use likelihood::LikelihoodScoring;
pub use link_graph::{LinkGraph, LinkRow, ObjectLink};
pub use metcalf::MetcalfScoring;
pub use score::{Score, ScoreParams, ScoringMethod};
pub use session::{NullModelCache, ScoringOptions, ScoringSession};
