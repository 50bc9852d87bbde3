//! Bin categorization advisor.
//!
//! Prompts a JSON-mode completion backend to suggest bins for a thoughtmark,
//! then strictly parses and validates the response. Suggestions are advisory:
//! any failure degrades to an empty list so capture flows never block on the
//! provider.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use thoughtmarks_core::defaults::SUGGESTION_CAP;
use thoughtmarks_core::{
    Bin, BinSuggestion, CompletionOptions, SuggestionBackend, SuggestionParse,
};

const SYSTEM_PROMPT: &str = "You are an expert at categorizing notes and thoughts into \
appropriate organizational bins. Always respond with valid JSON.";

#[derive(Debug, Deserialize)]
struct SuggestionDocument {
    suggestions: Vec<BinSuggestion>,
}

/// Build the categorization prompt for a thoughtmark and its candidate bins.
fn build_prompt(title: &str, content: &str, bins: &[Bin]) -> String {
    let bin_list = bins
        .iter()
        .map(|bin| {
            format!(
                "{}: {}",
                bin.name,
                bin.description.as_deref().unwrap_or("No description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze this thoughtmark and suggest the most appropriate bins for categorization:

Title: {title}
Content: {content}

Available bins:
{bin_list}

Provide suggestions in JSON format with the following structure:
{{
  "suggestions": [
    {{
      "binName": "exact bin name from the list",
      "confidence": 0.95,
      "reasoning": "brief explanation of why this bin fits"
    }}
  ]
}}

Rules:
- Only suggest bins that exist in the available bins list
- Provide 1-3 suggestions maximum
- Confidence should be between 0.0 and 1.0
- Order by confidence (highest first)
- Be concise in reasoning"#
    )
}

/// Strictly parse a model response into a tagged outcome.
///
/// Malformed JSON, a non-object document, and a missing or ill-typed
/// `suggestions` array all yield [`SuggestionParse::Unparseable`] carrying
/// the parse error, never a silent empty default.
pub fn parse_suggestions(raw: &str) -> SuggestionParse {
    match serde_json::from_str::<SuggestionDocument>(raw) {
        Ok(doc) => SuggestionParse::Parsed(doc.suggestions),
        Err(e) => SuggestionParse::Unparseable(e.to_string()),
    }
}

/// Validate parsed suggestions against the candidate bins.
///
/// Suggestions naming a bin outside the candidate list (case-insensitive)
/// are rejected. Confidences are clamped to [0, 1]. Survivors are stably
/// sorted by descending confidence and capped.
pub fn validate_suggestions(
    suggestions: Vec<BinSuggestion>,
    bins: &[Bin],
) -> Vec<BinSuggestion> {
    let mut valid: Vec<BinSuggestion> = suggestions
        .into_iter()
        .filter(|s| {
            bins.iter()
                .any(|bin| bin.name.eq_ignore_ascii_case(&s.bin_name))
        })
        .map(|mut s| {
            s.confidence = s.confidence.clamp(0.0, 1.0);
            s
        })
        .collect();

    valid.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    valid.truncate(SUGGESTION_CAP);
    valid
}

/// Categorization advisor over a JSON completion backend.
#[derive(Clone)]
pub struct CategorizationAdvisor {
    backend: Arc<dyn SuggestionBackend>,
}

impl CategorizationAdvisor {
    /// Create a new advisor over a suggestion backend.
    pub fn new(backend: Arc<dyn SuggestionBackend>) -> Self {
        Self { backend }
    }

    /// Suggest bins for a thoughtmark.
    ///
    /// Never fails: backend errors and unparseable responses degrade to an
    /// empty list with a warning. Zero candidate bins short-circuits to
    /// empty without a provider call.
    #[instrument(skip(self, title, content, bins), fields(
        subsystem = "ai",
        component = "categorization_advisor",
        op = "suggest",
        model = self.backend.model_name(),
        candidate_count = bins.len(),
    ))]
    pub async fn suggest(&self, title: &str, content: &str, bins: &[Bin]) -> Vec<BinSuggestion> {
        if bins.is_empty() {
            debug!("No candidate bins, skipping provider call");
            return Vec::new();
        }

        let start = Instant::now();
        let prompt = build_prompt(title, content, bins);

        let raw = match self
            .backend
            .complete_json(SYSTEM_PROMPT, &prompt, CompletionOptions::default())
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    error_msg = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Categorization call failed, returning no suggestions"
                );
                return Vec::new();
            }
        };

        match parse_suggestions(&raw) {
            SuggestionParse::Parsed(suggestions) => {
                let valid = validate_suggestions(suggestions, bins);
                debug!(
                    result_count = valid.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Categorization suggestions ready"
                );
                valid
            }
            SuggestionParse::Unparseable(reason) => {
                warn!(
                    error_msg = %reason,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Categorization response unparseable, returning no suggestions"
                );
                Vec::new()
            }
        }
    }
}
