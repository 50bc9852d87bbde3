//! # thoughtmarks-core
//!
//! Core types, traits, and abstractions for the Thoughtmarks backend.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other Thoughtmarks crates depend on.

pub mod defaults;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use embedding::{decode_embedding, encode_embedding};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
