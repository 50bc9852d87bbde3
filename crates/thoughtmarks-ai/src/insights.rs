//! Insight analysis over a user's thoughtmark collection.
//!
//! Unlike embedding generation and categorization, this surface is not
//! best-effort: the caller asked for the analysis itself, so provider
//! failures propagate instead of degrading to an empty document.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use thoughtmarks_core::defaults::{INSIGHTS_MAX_TOKENS, INSIGHTS_TEMPERATURE};
use thoughtmarks_core::{CompletionOptions, Error, Result, SuggestionBackend, Thoughtmark};

const SYSTEM_PROMPT: &str = "You are an expert at analyzing personal knowledge and identifying \
patterns in thinking. Provide thoughtful, actionable insights based on the user's thoughtmarks. \
Always respond with valid JSON.";

/// Render the thoughtmark context block fed to the model.
fn thoughtmark_context(thoughtmarks: &[Thoughtmark]) -> String {
    thoughtmarks
        .iter()
        .map(|tm| {
            let tags = if tm.tags.is_empty() {
                "none".to_string()
            } else {
                tm.tags.join(", ")
            };
            format!(
                "Title: {}\nContent: {}\nTags: {}\nBin: {}",
                tm.title,
                tm.content,
                tags,
                tm.bin_name.as_deref().unwrap_or("uncategorized")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the insight analysis prompt.
fn build_prompt(query: &str, thoughtmarks: &[Thoughtmark]) -> String {
    let context = thoughtmark_context(thoughtmarks);

    format!(
        r#"You are an AI assistant analyzing a user's personal thoughtmarks (ideas, notes, and thoughts).

User Query: "{query}"

Thoughtmarks:
{context}

Please provide insights in the following JSON format:
{{
  "insights": [
    {{
      "type": "summary",
      "title": "Thoughtmark Summary",
      "content": "A comprehensive overview of the user's thoughtmarks, identifying key themes and patterns."
    }},
    {{
      "type": "connections",
      "title": "Hidden Connections",
      "content": "Unexpected relationships and connections between different ideas in the thoughtmarks."
    }},
    {{
      "type": "recommendations",
      "title": "Content Recommendations",
      "content": "Based on the analysis, here are relevant resources:",
      "items": [
        {{
          "title": "Resource Title",
          "description": "Brief description of why this resource is relevant",
          "type": "book|podcast|article",
          "url": "https://example.com (if available)"
        }}
      ]
    }}
  ]
}}

Focus on providing genuine insights based on the actual content. Be specific about patterns you observe in the user's thinking and interests."#
    )
}

/// Insight analyzer over a JSON completion backend.
#[derive(Clone)]
pub struct InsightsAnalyzer {
    backend: Arc<dyn SuggestionBackend>,
}

impl InsightsAnalyzer {
    /// Create a new analyzer over a suggestion backend.
    pub fn new(backend: Arc<dyn SuggestionBackend>) -> Self {
        Self { backend }
    }

    /// Analyze a user's thoughtmarks against their query.
    ///
    /// Returns the model's insights document as parsed JSON. Backend errors
    /// and non-JSON responses propagate.
    #[instrument(skip(self, query, thoughtmarks), fields(
        subsystem = "ai",
        component = "insights_analyzer",
        op = "analyze",
        model = self.backend.model_name(),
        candidate_count = thoughtmarks.len(),
    ))]
    pub async fn analyze(
        &self,
        query: &str,
        thoughtmarks: &[Thoughtmark],
    ) -> Result<serde_json::Value> {
        let start = Instant::now();
        let prompt = build_prompt(query, thoughtmarks);

        let opts = CompletionOptions {
            temperature: INSIGHTS_TEMPERATURE,
            max_tokens: Some(INSIGHTS_MAX_TOKENS),
        };

        let raw = self.backend.complete_json(SYSTEM_PROMPT, &prompt, opts).await?;

        let document: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| Error::Suggestion(format!("Analysis response was not JSON: {}", e)))?;

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Insight analysis complete"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAiBackend;
    use chrono::Utc;

    fn thoughtmark(title: &str, tags: Vec<&str>, bin_name: Option<&str>) -> Thoughtmark {
        Thoughtmark {
            id: 1,
            title: title.to_string(),
            content: format!("{} content", title),
            tags: tags.into_iter().map(str::to_string).collect(),
            bin_id: None,
            bin_name: bin_name.map(str::to_string),
            user_id: 1,
            is_deleted: false,
            deleted_at_utc: None,
            embedding: None,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    #[test]
    fn context_renders_tags_and_bin_fallbacks() {
        let tms = vec![
            thoughtmark("First", vec!["rust", "notes"], Some("Learning")),
            thoughtmark("Second", vec![], None),
        ];
        let context = thoughtmark_context(&tms);
        assert!(context.contains("Tags: rust, notes"));
        assert!(context.contains("Bin: Learning"));
        assert!(context.contains("Tags: none"));
        assert!(context.contains("Bin: uncategorized"));
    }

    #[test]
    fn prompt_carries_query_and_context() {
        let tms = vec![thoughtmark("First", vec![], None)];
        let prompt = build_prompt("what am I thinking about?", &tms);
        assert!(prompt.contains(r#"User Query: "what am I thinking about?""#));
        assert!(prompt.contains("Title: First"));
        assert!(prompt.contains(r#""type": "summary""#));
    }

    #[tokio::test]
    async fn analyze_returns_parsed_document() {
        let backend = Arc::new(MockAiBackend::new().with_response(
            r#"{"insights": [{"type": "summary", "title": "T", "content": "C"}]}"#,
        ));
        let analyzer = InsightsAnalyzer::new(backend);
        let tms = vec![thoughtmark("First", vec![], None)];

        let document = analyzer.analyze("query", &tms).await.unwrap();
        assert_eq!(document["insights"][0]["type"], "summary");
    }

    #[tokio::test]
    async fn analyze_propagates_backend_errors() {
        let backend = Arc::new(MockAiBackend::new().with_suggest_failure());
        let analyzer = InsightsAnalyzer::new(backend);

        let result = analyzer.analyze("query", &[]).await;
        assert!(matches!(result, Err(Error::Suggestion(_))));
    }

    #[tokio::test]
    async fn analyze_propagates_non_json_responses() {
        let backend = Arc::new(MockAiBackend::new().with_response("not json"));
        let analyzer = InsightsAnalyzer::new(backend);

        let result = analyzer.analyze("query", &[]).await;
        assert!(matches!(result, Err(Error::Suggestion(_))));
    }
}
