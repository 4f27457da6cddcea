//! Embedding provider adapters.

mod ollama;

pub use ollama::{OllamaConfig, OllamaEmbedder};
