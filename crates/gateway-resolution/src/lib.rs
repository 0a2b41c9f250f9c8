//! Entity resolution: reconciles source-specific model names against the
//! canonical catalog (C2), built on top of metric normalizers (C1).

pub mod matcher;
pub mod name_normalizer;
pub mod normalizers;
pub mod resolver;

pub use matcher::{MatchResult, SimilarityMatcher};
pub use name_normalizer::NameNormalizer;
pub use normalizers::{ContextLengthNormalizer, CostNormalizer, LatencyNormalizer, QualityNormalizer};
pub use resolver::{EntityResolver, MatchConfidence, ResolvedEntity};
