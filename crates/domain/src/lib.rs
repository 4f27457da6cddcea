//! # javalens-domain
//!
//! Domain entities, primitives, and value objects for Java code retrieval.
//!
//! This crate contains the core domain model with no infrastructure dependencies:
//!
//! - **Primitives** - `ChunkId`, `CollectionName`, `TenantId`, `DatabaseName`
//! - **Ast** - parsed Java declarations as closed tagged variants
//! - **Chunk** - `Chunk`, `ChunkKind`, `MethodGroupKind`, `ChunkingStrategy`
//! - **Metadata** - derived role flags and embedding metadata
//! - **Search** - `Embedding`, `SearchResult`, `CodeMatch`, `QueryOutcome`
//!
//! ## Dependency Rules
//!
//! - Depends only on the `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use javalens_shared::shared_crate_version;

pub mod ast;
pub mod chunk;
pub mod metadata;
pub mod primitives;
pub mod search;

pub use ast::{FieldDecl, MethodDecl, MethodParam, Modifiers, ParsedFile, TypeDecl};
pub use chunk::{
    Chunk, ChunkKind, ChunkMetadata, ChunkingStrategy, MethodGroupKind, UnknownStrategyError,
};
pub use metadata::{
    class_chunk_metadata, embedding_metadata, has_annotation, is_spring_component,
    method_chunk_metadata, ENDPOINT_ANNOTATIONS,
};
pub use primitives::{
    derive_chunk_id, ChunkId, ChunkIdInput, CollectionName, DatabaseName, PrimitiveError, TenantId,
};
pub use search::{CodeMatch, Embedding, QueryOutcome, SearchResult};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }
}
