//! Embedding provider boundary contract.

use crate::BoxFuture;
use javalens_shared::{RequestContext, Result};

/// Provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingProviderInfo {
    /// Stable provider identifier (e.g. `ollama`).
    pub id: Box<str>,
    /// Model name the provider embeds with.
    pub model: Box<str>,
}

/// Owned request for a single-text embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRequest {
    /// Text to embed. The caller is responsible for any truncation policy.
    pub text: Box<str>,
}

impl EmbedRequest {
    /// Builds a request from any string-like text.
    #[must_use]
    pub fn new(text: impl Into<Box<str>>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for EmbedRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for EmbedRequest {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Boundary contract for text embedding providers.
pub trait EmbeddingPort: Send + Sync {
    /// Provider info for this implementation.
    fn provider(&self) -> &EmbeddingProviderInfo;

    /// Embed a single text into a dense vector.
    fn embed(&self, ctx: &RequestContext, request: EmbedRequest)
        -> BoxFuture<'_, Result<Vec<f32>>>;
}
