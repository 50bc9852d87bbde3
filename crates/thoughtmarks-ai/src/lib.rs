//! # thoughtmarks-ai
//!
//! AI provider integration for Thoughtmarks.
//!
//! This crate provides:
//! - OpenAI-compatible backend implementing the core provider traits
//! - Best-effort embedding generation for thoughtmark text
//! - Bin categorization suggestions with strict response parsing
//! - Insight analysis over a user's thoughtmark collection
//!
//! Embedding and categorization are enrichments: every failure path in those
//! components degrades to an empty result so note capture is never blocked.
//! Insight analysis is the exception and propagates provider errors.

pub mod advisor;
pub mod embedding;
pub mod insights;
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use advisor::CategorizationAdvisor;
pub use embedding::{embedding_text, EmbeddingGenerator};
pub use insights::InsightsAnalyzer;
pub use openai::{OpenAIBackend, OpenAIConfig};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockAiBackend;
