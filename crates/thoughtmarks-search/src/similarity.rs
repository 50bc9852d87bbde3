//! Cosine similarity scoring and ranking.

use std::cmp::Ordering;

use tracing::debug;

use thoughtmarks_core::{SimilarityCandidate, SimilarityMatch};

/// Cosine similarity between two vectors.
///
/// Defined as 0 when the lengths differ (a guard against partially-migrated
/// or corrupted stored vectors) and when either norm is zero (a zero vector
/// carries no directional information). Non-finite intermediate results also
/// degrade to 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Rank candidates against a query vector.
///
/// Candidates below `threshold` are dropped; survivors are sorted by score
/// descending and truncated to `limit`. The sort is stable, so exact ties
/// keep the caller's candidate order (which matches storage fetch order and
/// is deterministic across repeated runs with unchanged input).
///
/// An empty query vector returns an empty list: there is nothing to compare
/// against.
pub fn rank_candidates(
    query: &[f32],
    candidates: &[SimilarityCandidate],
    threshold: f32,
    limit: usize,
) -> Vec<SimilarityMatch> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<SimilarityMatch> = candidates
        .iter()
        .filter(|c| !c.embedding.is_empty())
        .map(|c| SimilarityMatch {
            id: c.id,
            score: cosine_similarity(query, &c.embedding),
        })
        .filter(|m| m.score >= threshold)
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(limit);

    debug!(
        subsystem = "search",
        component = "similarity",
        op = "rank",
        candidate_count = candidates.len(),
        result_count = matches.len(),
        "Ranked similarity candidates"
    );

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i32, embedding: Vec<f32>) -> SimilarityCandidate {
        SimilarityCandidate { id, embedding }
    }

    #[test]
    fn self_similarity_is_maximal() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unequal_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-0.5, 0.25, 4.0];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_negative_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn magnitude_does_not_change_score() {
        let a = vec![1.0, 1.0];
        let b = vec![10.0, 10.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rank_filters_below_threshold() {
        let candidates = vec![
            candidate(1, vec![1.0, 0.0]),
            candidate(2, vec![0.0, 1.0]),
            candidate(3, vec![0.9, 0.1]),
        ];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 10);
        assert!(results.iter().all(|m| m.score >= 0.5));
        assert!(!results.iter().any(|m| m.id == 2));
    }

    #[test]
    fn rank_known_scenario() {
        let candidates = vec![
            candidate(1, vec![1.0, 0.0]),
            candidate(2, vec![0.0, 1.0]),
            candidate(3, vec![0.9, 0.1]),
        ];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].id, 3);
        assert!((results[1].score - 0.994).abs() < 0.001);
    }

    #[test]
    fn rank_sorted_descending() {
        let candidates = vec![
            candidate(1, vec![0.5, 0.5]),
            candidate(2, vec![1.0, 0.0]),
            candidate(3, vec![0.8, 0.2]),
        ];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.0, 10);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn rank_respects_limit() {
        let candidates: Vec<SimilarityCandidate> =
            (0..10).map(|i| candidate(i, vec![1.0, 0.0])).collect();
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn rank_returns_all_when_fewer_than_limit_survive() {
        let candidates = vec![
            candidate(1, vec![1.0, 0.0]),
            candidate(2, vec![0.0, 1.0]),
        ];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 5);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_query_returns_empty() {
        let candidates = vec![candidate(1, vec![1.0, 0.0])];
        assert!(rank_candidates(&[], &candidates, 0.0, 5).is_empty());
    }

    #[test]
    fn candidates_with_empty_embeddings_are_skipped() {
        let candidates = vec![candidate(1, vec![]), candidate(2, vec![1.0, 0.0])];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.0, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn exact_ties_keep_candidate_order() {
        let candidates = vec![
            candidate(7, vec![1.0, 0.0]),
            candidate(3, vec![1.0, 0.0]),
            candidate(9, vec![1.0, 0.0]),
        ];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 10);
        let ids: Vec<i32> = results.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![7, 3, 9]);

        // Repeat with the same input order: the tie order must not change.
        let again = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 10);
        assert_eq!(ids, again.iter().map(|m| m.id).collect::<Vec<_>>());
    }

    #[test]
    fn mismatched_candidate_lengths_drop_out_via_threshold() {
        let candidates = vec![
            candidate(1, vec![1.0, 0.0, 0.0]),
            candidate(2, vec![1.0, 0.0]),
        ];
        let results = rank_candidates(&[1.0, 0.0], &candidates, 0.5, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }
}
