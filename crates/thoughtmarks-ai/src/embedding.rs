//! Best-effort embedding generation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use thoughtmarks_core::EmbeddingBackend;

/// Build the text a thoughtmark is embedded from.
pub fn embedding_text(title: &str, content: &str) -> String {
    format!("{} {}", title, content)
}

/// Embedding generator that never fails.
///
/// Wraps an injected backend; every failure path (network, auth, rate limit,
/// malformed response, timeout) logs a warning and yields an empty vector.
/// Callers treat an empty vector as "no embedding" and proceed, so note
/// capture is never blocked by the provider.
#[derive(Clone)]
pub struct EmbeddingGenerator {
    backend: Arc<dyn EmbeddingBackend>,
}

impl EmbeddingGenerator {
    /// Create a new generator over an embedding backend.
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    /// Generate an embedding for `text`.
    ///
    /// Empty or whitespace-only input returns an empty vector without a
    /// provider call.
    #[instrument(skip(self, text), fields(
        subsystem = "ai",
        component = "embedding_generator",
        op = "generate",
        model = self.backend.model_name(),
    ))]
    pub async fn generate(&self, text: &str) -> Vec<f32> {
        if text.trim().is_empty() {
            debug!("Empty input, skipping provider call");
            return Vec::new();
        }

        let start = Instant::now();
        match self.backend.embed_text(text).await {
            Ok(vector) => {
                debug!(
                    dimension = vector.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Embedding generated"
                );
                vector
            }
            Err(e) => {
                warn!(
                    error_msg = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Embedding generation failed, continuing without embedding"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAiBackend;

    #[test]
    fn embedding_text_joins_title_and_content() {
        assert_eq!(embedding_text("Title", "Content"), "Title Content");
    }

    #[tokio::test]
    async fn generates_embedding_from_backend() {
        let backend = Arc::new(MockAiBackend::new());
        let generator = EmbeddingGenerator::new(backend.clone());

        let vector = generator.generate("some note text").await;
        assert!(!vector.is_empty());
        assert_eq!(backend.embed_calls(), 1);
    }

    #[tokio::test]
    async fn deterministic_for_identical_input() {
        let generator = EmbeddingGenerator::new(Arc::new(MockAiBackend::new()));

        let a = generator.generate("repeatable").await;
        let b = generator.generate("repeatable").await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_input_skips_provider() {
        let backend = Arc::new(MockAiBackend::new());
        let generator = EmbeddingGenerator::new(backend.clone());

        assert!(generator.generate("").await.is_empty());
        assert!(generator.generate("   \n\t").await.is_empty());
        assert_eq!(backend.embed_calls(), 0);
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_empty() {
        let backend = Arc::new(MockAiBackend::new().with_embed_failure());
        let generator = EmbeddingGenerator::new(backend.clone());

        let vector = generator.generate("some note text").await;
        assert!(vector.is_empty());
        assert_eq!(backend.embed_calls(), 1);
    }
}
