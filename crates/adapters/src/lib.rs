//! Infrastructure adapters behind the javalens port traits.
//!
//! Each submodule owns one boundary: `embedding` talks to an Ollama-style
//! embeddings endpoint, `vector_index` to a Chroma-style collection API,
//! and `parser` lowers Java source through tree-sitter. Adapters translate
//! transport failures into `ErrorEnvelope` values and never log; the
//! application layer decides what is worth reporting.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod embedding;
pub mod parser;
pub mod vector_index;

pub use embedding::{OllamaConfig, OllamaEmbedder};
pub use parser::TreeSitterJavaParser;
pub use vector_index::{ChromaConfig, ChromaVectorIndex};

/// Crate version, exposed for diagnostics.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
