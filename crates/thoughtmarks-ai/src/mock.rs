//! Deterministic mock provider backend for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use thoughtmarks_core::{CompletionOptions, EmbeddingBackend, Error, Result, SuggestionBackend};

/// Dimension of mock embedding vectors. Small on purpose.
pub const MOCK_DIMENSION: usize = 8;

/// Mock backend implementing both provider traits.
///
/// Embeddings are derived from character sums, so identical input always
/// produces identical vectors and different input usually diverges. JSON
/// completions replay a scripted response. Both sides can be toggled to
/// fail, and call counts are tracked for asserting on degrade paths.
pub struct MockAiBackend {
    embed_fail: bool,
    suggest_fail: bool,
    scripted_response: Mutex<String>,
    embed_calls: AtomicUsize,
    suggest_calls: AtomicUsize,
}

impl MockAiBackend {
    /// Create a mock that succeeds and answers `{"suggestions": []}`.
    pub fn new() -> Self {
        Self {
            embed_fail: false,
            suggest_fail: false,
            scripted_response: Mutex::new(r#"{"suggestions": []}"#.to_string()),
            embed_calls: AtomicUsize::new(0),
            suggest_calls: AtomicUsize::new(0),
        }
    }

    /// Make every embedding call fail.
    pub fn with_embed_failure(mut self) -> Self {
        self.embed_fail = true;
        self
    }

    /// Make every completion call fail.
    pub fn with_suggest_failure(mut self) -> Self {
        self.suggest_fail = true;
        self
    }

    /// Script the JSON text returned by completion calls.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        if let Ok(mut scripted) = self.scripted_response.lock() {
            *scripted = response.into();
        }
        self
    }

    /// Number of embedding calls made so far.
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of completion calls made so far.
    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockAiBackend {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);

        if self.embed_fail {
            return Err(Error::Embedding("mock embedding failure".to_string()));
        }

        // Bucket character values by position so anagrams still differ.
        let mut vector = vec![0.0_f32; MOCK_DIMENSION];
        for (i, c) in text.chars().enumerate() {
            vector[i % MOCK_DIMENSION] += (c as u32 % 97) as f32 / 97.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        MOCK_DIMENSION
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl SuggestionBackend for MockAiBackend {
    async fn complete_json(
        &self,
        _system: &str,
        _prompt: &str,
        _opts: CompletionOptions,
    ) -> Result<String> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);

        if self.suggest_fail {
            return Err(Error::Suggestion("mock completion failure".to_string()));
        }

        let scripted = self
            .scripted_response
            .lock()
            .map_err(|_| Error::Internal("mock response lock poisoned".to_string()))?;
        Ok(scripted.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}
