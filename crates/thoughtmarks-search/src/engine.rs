//! Similarity search engine.
//!
//! Embeds the query text through an injected backend, then ranks candidate
//! thoughtmarks by cosine similarity. Embedding failures degrade to an empty
//! result set rather than surfacing an error: similarity is an enrichment,
//! not a required capability.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use thoughtmarks_core::defaults::{SIMILARITY_LIMIT, SIMILARITY_THRESHOLD};
use thoughtmarks_core::{EmbeddingBackend, SimilarityCandidate, SimilarityMatch};

use crate::similarity::rank_candidates;

/// Options for a similarity query.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityOptions {
    /// Minimum cosine similarity for a candidate to be reported.
    pub threshold: f32,
    /// Maximum number of matches to return.
    pub limit: usize,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
            limit: SIMILARITY_LIMIT,
        }
    }
}

impl SimilarityOptions {
    /// Set the minimum similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Embedding-based similarity search over a candidate set.
#[derive(Clone)]
pub struct SimilaritySearch {
    backend: Arc<dyn EmbeddingBackend>,
}

impl SimilaritySearch {
    /// Create a new similarity search engine over an embedding backend.
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    /// Find candidates similar to `query_text`.
    ///
    /// Embeds the query, scores every candidate, and returns matches above
    /// the threshold sorted by score descending, capped at the limit. When
    /// the backend fails or returns an empty vector, the result is an empty
    /// list and the failure is logged.
    #[instrument(skip(self, query_text, candidates), fields(
        subsystem = "search",
        component = "similarity_search",
        op = "find_similar",
        candidate_count = candidates.len(),
        threshold = options.threshold,
        limit = options.limit,
    ))]
    pub async fn find_similar(
        &self,
        query_text: &str,
        candidates: &[SimilarityCandidate],
        options: SimilarityOptions,
    ) -> Vec<SimilarityMatch> {
        let start = Instant::now();

        let query_embedding = match self.backend.embed_text(query_text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    model = self.backend.model_name(),
                    error_msg = %e,
                    "Query embedding failed, returning no matches"
                );
                return Vec::new();
            }
        };

        if query_embedding.is_empty() {
            debug!("Query embedding is empty, returning no matches");
            return Vec::new();
        }

        let matches = rank_candidates(
            &query_embedding,
            candidates,
            options.threshold,
            options.limit,
        );

        let duration_ms = start.elapsed().as_millis() as u64;
        if duration_ms > 1000 {
            warn!(
                result_count = matches.len(),
                duration_ms, slow = true,
                "Similarity search completed"
            );
        } else {
            info!(
                result_count = matches.len(),
                duration_ms,
                "Similarity search completed"
            );
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use thoughtmarks_core::{Error, Result};

    /// Backend that returns a fixed vector, or fails when configured to.
    struct FixedBackend {
        vector: Vec<f32>,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingBackend for FixedBackend {
        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                Err(Error::Embedding("connection refused".to_string()))
            } else {
                Ok(self.vector.clone())
            }
        }

        fn dimension(&self) -> usize {
            self.vector.len()
        }

        fn model_name(&self) -> &str {
            "fixed-test-model"
        }
    }

    fn engine(vector: Vec<f32>, fail: bool) -> SimilaritySearch {
        SimilaritySearch::new(Arc::new(FixedBackend { vector, fail }))
    }

    fn candidate(id: i32, embedding: Vec<f32>) -> SimilarityCandidate {
        SimilarityCandidate { id, embedding }
    }

    #[test]
    fn options_defaults() {
        let opts = SimilarityOptions::default();
        assert_eq!(opts.threshold, SIMILARITY_THRESHOLD);
        assert_eq!(opts.limit, SIMILARITY_LIMIT);
    }

    #[test]
    fn options_builders() {
        let opts = SimilarityOptions::default()
            .with_threshold(0.6)
            .with_limit(10);
        assert_eq!(opts.threshold, 0.6);
        assert_eq!(opts.limit, 10);
    }

    #[tokio::test]
    async fn finds_matches_above_threshold() {
        let search = engine(vec![1.0, 0.0], false);
        let candidates = vec![
            candidate(1, vec![1.0, 0.0]),
            candidate(2, vec![0.0, 1.0]),
            candidate(3, vec![0.9, 0.1]),
        ];

        let matches = search
            .find_similar("query", &candidates, SimilarityOptions::default())
            .await;

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, 1);
        assert_eq!(matches[1].id, 3);
    }

    #[tokio::test]
    async fn backend_failure_returns_empty() {
        let search = engine(vec![1.0, 0.0], true);
        let candidates = vec![candidate(1, vec![1.0, 0.0])];

        let matches = search
            .find_similar("query", &candidates, SimilarityOptions::default())
            .await;

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn empty_backend_vector_returns_empty() {
        let search = engine(Vec::new(), false);
        let candidates = vec![candidate(1, vec![1.0, 0.0])];

        let matches = search
            .find_similar("query", &candidates, SimilarityOptions::default())
            .await;

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn empty_candidate_set_returns_empty() {
        let search = engine(vec![1.0, 0.0], false);

        let matches = search
            .find_similar("query", &[], SimilarityOptions::default())
            .await;

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn respects_custom_options() {
        let search = engine(vec![1.0, 0.0], false);
        let candidates: Vec<SimilarityCandidate> =
            (0..8).map(|i| candidate(i, vec![1.0, 0.0])).collect();

        let matches = search
            .find_similar(
                "query",
                &candidates,
                SimilarityOptions::default().with_limit(2),
            )
            .await;

        assert_eq!(matches.len(), 2);
    }
}
