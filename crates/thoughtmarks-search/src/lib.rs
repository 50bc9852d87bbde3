//! # thoughtmarks-search
//!
//! Embedding similarity search for Thoughtmarks.
//!
//! This crate provides:
//! - Pure cosine-similarity scoring over decoded embedding vectors
//! - A search engine that embeds a query via an injected backend and ranks
//!   candidate thoughtmarks against it
//!
//! Scoring is a full linear scan per query. That is deliberate: candidate
//! sets are one user's notes, small enough that an index structure would be
//! overhead without payoff.

pub mod engine;
pub mod similarity;

pub use engine::{SimilarityOptions, SimilaritySearch};
pub use similarity::{cosine_similarity, rank_candidates};
