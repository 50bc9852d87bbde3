//! Core data models for Thoughtmarks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::decode_embedding;

// =============================================================================
// USERS
// =============================================================================

/// A registered user account.
///
/// Authentication itself happens upstream; the backend stores the mapping
/// from the external auth uid to the numeric id used everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub display_name: Option<String>,
    pub firebase_uid: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Request for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub firebase_uid: String,
}

// =============================================================================
// BINS
// =============================================================================

/// A bin: a named grouping of thoughtmarks, chosen manually or suggested
/// by the categorization advisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub sort_order: i32,
    pub user_id: i32,
    pub created_at_utc: DateTime<Utc>,
}

/// A bin together with its live (non-deleted) thoughtmark count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinWithCount {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub sort_order: i32,
    pub user_id: i32,
    pub created_at_utc: DateTime<Utc>,
    pub thoughtmark_count: i64,
}

/// Request for creating a new bin. Color and icon fall back to the
/// defaults in [`crate::defaults`] when not provided.
#[derive(Debug, Clone, Default)]
pub struct CreateBinRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Partial update for a bin. `None` fields are left untouched.
/// `description` is tri-state: `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateBinRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

/// One entry of a bin reorder batch.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BinOrderUpdate {
    pub id: i32,
    pub sort_order: i32,
}

// =============================================================================
// THOUGHTMARKS
// =============================================================================

/// A thoughtmark: a single user-authored piece of text content.
///
/// The stored embedding is the raw JSON float-array text written back after
/// generation. It is an internal attribute and never serialized into API
/// responses; consumers go through [`Thoughtmark::similarity_candidate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thoughtmark {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub bin_id: Option<i32>,
    /// Name of the owning bin, joined in for display. `None` when unfiled.
    pub bin_name: Option<String>,
    pub user_id: i32,
    pub is_deleted: bool,
    pub deleted_at_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub embedding: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl Thoughtmark {
    /// Decode the stored embedding into a scoring candidate.
    ///
    /// Returns `None` when no embedding is stored or the stored text does
    /// not decode to a non-empty float vector, so corrupt rows drop out of
    /// similarity scans instead of failing them.
    pub fn similarity_candidate(&self) -> Option<SimilarityCandidate> {
        let vector = decode_embedding(self.embedding.as_deref()?)?;
        Some(SimilarityCandidate {
            id: self.id,
            embedding: vector,
        })
    }
}

/// Request for creating a new thoughtmark.
#[derive(Debug, Clone, Default)]
pub struct CreateThoughtmarkRequest {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub bin_id: Option<i32>,
}

/// Partial update for a thoughtmark.
///
/// Outer `None` leaves a field untouched. `bin_id` and `embedding` are
/// tri-state: `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateThoughtmarkRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub bin_id: Option<Option<i32>>,
    pub embedding: Option<Option<String>>,
}

// =============================================================================
// SIMILARITY
// =============================================================================

/// A candidate for similarity scoring: thoughtmark id plus its decoded
/// embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCandidate {
    pub id: i32,
    pub embedding: Vec<f32>,
}

/// An ephemeral similarity result pairing a thoughtmark id with its cosine
/// score against the query. Produced fresh per query, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub id: i32,
    pub score: f32,
}

// =============================================================================
// CATEGORY SUGGESTIONS
// =============================================================================

/// An ephemeral bin suggestion from the categorization advisor.
///
/// Uses the camelCase `binName` key in JSON, matching both the model's
/// response format and the shape API clients consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSuggestion {
    #[serde(rename = "binName")]
    pub bin_name: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Short natural-language justification.
    #[serde(default)]
    pub reasoning: String,
}

/// Tagged outcome of parsing a categorization model response.
///
/// Malformed responses are an explicit variant rather than an implicit
/// empty default, so the degrade path stays a testable branch.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionParse {
    /// The response carried a well-formed `suggestions` array.
    Parsed(Vec<BinSuggestion>),
    /// The response could not be interpreted; the reason is kept for logs.
    Unparseable(String),
}
