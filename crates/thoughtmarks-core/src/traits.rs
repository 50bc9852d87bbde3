//! Core traits for Thoughtmarks abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. Provider backends
//! are injected (`Arc<dyn ...>`) into the components that use them; there are
//! no module-level singleton clients.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and seed their default bins in one transaction.
    async fn create(&self, req: CreateUserRequest) -> Result<User>;

    /// Fetch a user by id.
    async fn get(&self, id: i32) -> Result<Option<User>>;

    /// Fetch a user by their external auth uid.
    async fn get_by_firebase_uid(&self, uid: &str) -> Result<Option<User>>;
}

// =============================================================================
// BIN REPOSITORY
// =============================================================================

/// Repository for bins (thoughtmark groupings).
#[async_trait]
pub trait BinRepository: Send + Sync {
    /// Create a bin for a user, applying default color/icon when absent.
    async fn create(&self, user_id: i32, req: CreateBinRequest) -> Result<Bin>;

    /// Fetch a bin by id.
    async fn get(&self, id: i32) -> Result<Option<Bin>>;

    /// Fetch a bin by id together with its live thoughtmark count.
    async fn get_with_count(&self, id: i32) -> Result<Option<BinWithCount>>;

    /// List a user's bins with live thoughtmark counts, in display order.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<BinWithCount>>;

    /// Partially update a bin. Returns the updated row, or `None` when the
    /// bin does not exist.
    async fn update(&self, id: i32, req: UpdateBinRequest) -> Result<Option<Bin>>;

    /// Delete a bin. Thoughtmarks in it become unfiled (`bin_id = NULL`).
    /// Returns whether a row was deleted.
    async fn delete(&self, id: i32) -> Result<bool>;

    /// Apply a batch of sort-order updates for one user's bins in a single
    /// transaction. Entries for bins the user does not own are ignored.
    async fn reorder(&self, user_id: i32, updates: &[BinOrderUpdate]) -> Result<()>;
}

// =============================================================================
// THOUGHTMARK REPOSITORY
// =============================================================================

/// Repository for thoughtmark CRUD and search.
#[async_trait]
pub trait ThoughtmarkRepository: Send + Sync {
    /// Insert a new thoughtmark. `embedding` carries the already-encoded
    /// stored text when generation succeeded, `None` otherwise.
    async fn create(
        &self,
        user_id: i32,
        req: CreateThoughtmarkRequest,
        embedding: Option<String>,
    ) -> Result<Thoughtmark>;

    /// Fetch a thoughtmark by id, deleted or not.
    async fn get(&self, id: i32) -> Result<Option<Thoughtmark>>;

    /// List a user's live thoughtmarks, newest first, bin name joined.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Thoughtmark>>;

    /// List live thoughtmarks in a bin, newest first.
    async fn list_for_bin(&self, bin_id: i32) -> Result<Vec<Thoughtmark>>;

    /// List a user's soft-deleted thoughtmarks, newest first.
    async fn list_deleted(&self, user_id: i32) -> Result<Vec<Thoughtmark>>;

    /// Partially update a thoughtmark. `bin_id` and `embedding` are
    /// tri-state (see [`UpdateThoughtmarkRequest`]). Returns the updated
    /// row, or `None` when the thoughtmark does not exist.
    async fn update(&self, id: i32, req: UpdateThoughtmarkRequest) -> Result<Option<Thoughtmark>>;

    /// Soft-delete: set the flag and deletion timestamp. Returns whether a
    /// live row was affected.
    async fn soft_delete(&self, id: i32) -> Result<bool>;

    /// Undo a soft delete. Returns `false` when the row is absent or not
    /// currently deleted.
    async fn restore(&self, id: i32) -> Result<bool>;

    /// Case-insensitive substring search over title and content of a user's
    /// live thoughtmarks, optionally narrowed to those carrying any of
    /// `tags`. Newest first.
    async fn search(
        &self,
        user_id: i32,
        query: &str,
        tags: Option<&[String]>,
    ) -> Result<Vec<Thoughtmark>>;
}

// =============================================================================
// PROVIDER BACKENDS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate an embedding vector for the given text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Sampling options for a JSON completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: crate::defaults::CATEGORIZE_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// Backend for structured (JSON-mode) chat completions.
#[async_trait]
pub trait SuggestionBackend: Send + Sync {
    /// Run a completion constrained to JSON output and return the raw model
    /// text. Callers own parsing and validation.
    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        opts: CompletionOptions,
    ) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
