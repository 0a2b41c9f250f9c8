//! Entity resolution decision (C2): reconcile a source-specific model name
//! against the canonical catalog.

use crate::matcher::SimilarityMatcher;
use crate::name_normalizer::NameNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Exact,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub source_name: String,
    pub canonical_id: Option<i64>,
    pub canonical_name: Option<String>,
    pub confidence: MatchConfidence,
    pub score: f64,
    pub needs_review: bool,
}

pub struct EntityResolver {
    normalizer: NameNormalizer,
    matcher: SimilarityMatcher,
    auto_link_threshold: f64,
    review_threshold: f64,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self {
            normalizer: NameNormalizer::default(),
            matcher: SimilarityMatcher::default(),
            auto_link_threshold: 0.95,
            review_threshold: 0.80,
        }
    }
}

impl EntityResolver {
    pub fn new(
        normalizer: NameNormalizer,
        matcher: SimilarityMatcher,
        auto_link_threshold: f64,
        review_threshold: f64,
    ) -> Self {
        Self { normalizer, matcher, auto_link_threshold, review_threshold }
    }

    /// Resolve `source_name` against `canonical_models` (id -> canonical
    /// name). Canonical ids are used as a deterministic tie-break: among
    /// candidates sharing the top score, the smallest id wins.
    pub fn resolve(&self, source_name: &str, canonical_models: &BTreeMap<i64, String>) -> ResolvedEntity {
        if canonical_models.is_empty() {
            return ResolvedEntity {
                source_name: source_name.to_string(),
                canonical_id: None,
                canonical_name: None,
                confidence: MatchConfidence::Low,
                score: 0.0,
                needs_review: false,
            };
        }

        let normalized_source = self.normalizer.normalize(source_name);

        // Exact match after normalization, smallest id wins on a tie.
        let mut exact: Option<(i64, &String)> = None;
        for (id, name) in canonical_models {
            if self.normalizer.normalize(name) == normalized_source {
                exact = Some((*id, name));
                break;
            }
        }
        if let Some((id, name)) = exact {
            return ResolvedEntity {
                source_name: source_name.to_string(),
                canonical_id: Some(id),
                canonical_name: Some(name.clone()),
                confidence: MatchConfidence::Exact,
                score: 1.0,
                needs_review: false,
            };
        }

        // Fuzzy match: keep the maximum score, smallest id on a tie.
        let mut best: Option<(i64, &String, f64)> = None;
        for (id, name) in canonical_models {
            let normalized_candidate = self.normalizer.normalize(name);
            let score = SimilarityMatcher::similarity_score(&normalized_source, &normalized_candidate);
            best = match best {
                None => Some((*id, name, score)),
                Some((best_id, best_name, best_score)) => {
                    if score > best_score || (score == best_score && *id < best_id) {
                        Some((*id, name, score))
                    } else {
                        Some((best_id, best_name, best_score))
                    }
                }
            };
        }

        let (id, name, score) = best.expect("canonical_models is non-empty");

        if score >= self.auto_link_threshold {
            ResolvedEntity {
                source_name: source_name.to_string(),
                canonical_id: Some(id),
                canonical_name: Some(name.clone()),
                confidence: MatchConfidence::High,
                score,
                needs_review: false,
            }
        } else if score >= self.review_threshold {
            ResolvedEntity {
                source_name: source_name.to_string(),
                canonical_id: Some(id),
                canonical_name: Some(name.clone()),
                confidence: MatchConfidence::Medium,
                score,
                needs_review: true,
            }
        } else {
            ResolvedEntity {
                source_name: source_name.to_string(),
                canonical_id: None,
                canonical_name: None,
                confidence: MatchConfidence::Low,
                score,
                needs_review: false,
            }
        }
    }

    pub fn resolve_batch(
        &self,
        source_names: &[String],
        canonical_models: &BTreeMap<i64, String>,
    ) -> Vec<ResolvedEntity> {
        source_names.iter().map(|n| self.resolve(n, canonical_models)).collect()
    }

    pub fn is_pending_review(entity: &ResolvedEntity) -> bool {
        entity.needs_review
    }

    pub fn is_auto_linked(entity: &ResolvedEntity) -> bool {
        matches!(entity.confidence, MatchConfidence::Exact | MatchConfidence::High)
    }

    pub fn is_unmatched(entity: &ResolvedEntity) -> bool {
        matches!(entity.confidence, MatchConfidence::Low)
    }
}
