//! Similarity matching between normalized names via Levenshtein distance.

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub candidate: String,
    pub score: f64,
    pub distance: usize,
}

#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self { threshold: 0.8 }
    }
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold: threshold.clamp(0.0, 1.0) }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    /// Classic O(n*m) Levenshtein edit distance with a row-swap optimization
    /// so the inner loop always iterates over the shorter string.
    pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
        let (a, b) = if s1.len() < s2.len() { (s2, s1) } else { (s1, s2) };
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        if b.is_empty() {
            return a.len();
        }

        let mut prev: Vec<usize> = (0..=b.len()).collect();
        let mut curr = vec![0usize; b.len() + 1];

        for (i, ca) in a.iter().enumerate() {
            curr[0] = i + 1;
            for (j, cb) in b.iter().enumerate() {
                let cost = if ca == cb { 0 } else { 1 };
                curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev[b.len()]
    }

    pub fn similarity_score(s1: &str, s2: &str) -> f64 {
        if s1 == s2 {
            return 1.0;
        }
        if s1.is_empty() || s2.is_empty() {
            return 0.0;
        }
        let distance = Self::levenshtein_distance(s1, s2);
        let max_len = s1.chars().count().max(s2.chars().count()).max(1);
        1.0 - (distance as f64 / max_len as f64)
    }

    pub fn match_one(&self, query: &str, candidate: &str) -> MatchResult {
        MatchResult {
            candidate: candidate.to_string(),
            score: Self::similarity_score(query, candidate),
            distance: Self::levenshtein_distance(query, candidate),
        }
    }

    pub fn find_best_match<'a, I: IntoIterator<Item = &'a str>>(
        &self,
        query: &str,
        candidates: I,
    ) -> Option<MatchResult> {
        self.find_all_matches(query, candidates, None).into_iter().next()
    }

    /// All candidates at or above the configured threshold, sorted by score
    /// descending (ties retain input order).
    pub fn find_all_matches<'a, I: IntoIterator<Item = &'a str>>(
        &self,
        query: &str,
        candidates: I,
        max_results: Option<usize>,
    ) -> Vec<MatchResult> {
        let mut results: Vec<MatchResult> = candidates
            .into_iter()
            .map(|c| self.match_one(query, c))
            .filter(|m| m.score >= self.threshold)
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(limit) = max_results {
            results.truncate(limit);
        }
        results
    }
}
