//! Centralized default constants for the Thoughtmarks backend.
//!
//! **This module is the single source of truth** for all shared default
//! values. Other crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (OpenAI).
pub const EMBED_MODEL: &str = "text-embedding-3-small";

/// Embedding vector dimension for text-embedding-3-small.
pub const EMBED_DIMENSION: usize = 1536;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SIMILARITY SEARCH
// =============================================================================

/// Default minimum cosine similarity for a candidate to count as a match.
pub const SIMILARITY_THRESHOLD: f32 = 0.7;

/// Threshold used by the similar-thoughtmarks HTTP route. Looser than the
/// service default so the route surfaces marginal matches the client can
/// still rank visually.
pub const SIMILARITY_THRESHOLD_ROUTE: f32 = 0.6;

/// Default maximum number of similarity matches returned per query.
pub const SIMILARITY_LIMIT: usize = 5;

// =============================================================================
// CATEGORIZATION & INSIGHTS
// =============================================================================

/// Default chat model name (OpenAI).
pub const CHAT_MODEL: &str = "gpt-4o";

/// Timeout for chat completion requests in seconds.
pub const CHAT_TIMEOUT_SECS: u64 = 120;

/// Maximum number of bin suggestions returned by the advisor.
pub const SUGGESTION_CAP: usize = 3;

/// Sampling temperature for categorization. Low, because the advisor picks
/// from a fixed candidate list and should not get creative.
pub const CATEGORIZE_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for insight analysis.
pub const INSIGHTS_TEMPERATURE: f32 = 0.7;

/// Token cap for insight analysis responses.
pub const INSIGHTS_MAX_TOKENS: u32 = 2000;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Maximum request body size in bytes (1 MB; thoughtmarks are short text).
pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

// =============================================================================
// BINS
// =============================================================================

/// Default bin color when the caller supplies none.
pub const BIN_COLOR: &str = "#6B7280";

/// Default bin icon when the caller supplies none.
pub const BIN_ICON: &str = "📝";

/// Bins seeded for every new user, in display order:
/// (name, description, color, icon).
pub const DEFAULT_BINS: [(&str, &str, &str, &str); 5] = [
    (
        "💡 Quick Ideas",
        "Capture spontaneous thoughts and inspiration",
        "#3B82F6",
        "💡",
    ),
    (
        "📚 Learning",
        "Knowledge, insights, and things to remember",
        "#10B981",
        "📚",
    ),
    (
        "🎯 Goals & Projects",
        "Long-term objectives and project planning",
        "#F59E0B",
        "🎯",
    ),
    (
        "🔍 Research",
        "Interesting findings and things to explore",
        "#8B5CF6",
        "🔍",
    ),
    (
        "📝 Notes",
        "General notes and miscellaneous thoughts",
        "#6B7280",
        "📝",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_valid_cosine_bounds() {
        assert!(SIMILARITY_THRESHOLD > 0.0 && SIMILARITY_THRESHOLD <= 1.0);
        assert!(SIMILARITY_THRESHOLD_ROUTE > 0.0 && SIMILARITY_THRESHOLD_ROUTE <= 1.0);
        assert!(SIMILARITY_THRESHOLD_ROUTE <= SIMILARITY_THRESHOLD);
    }

    #[test]
    fn embed_dimension_matches_model() {
        assert_eq!(EMBED_MODEL, "text-embedding-3-small");
        assert_eq!(EMBED_DIMENSION, 1536);
    }

    #[test]
    fn default_bins_have_distinct_names() {
        let mut names: Vec<&str> = DEFAULT_BINS.iter().map(|b| b.0).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_BINS.len());
    }
}
