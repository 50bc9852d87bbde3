//! OpenAI-compatible provider backend.

mod backend;
pub mod types;

pub use backend::{OpenAIBackend, OpenAIConfig, DEFAULT_OPENAI_URL};
