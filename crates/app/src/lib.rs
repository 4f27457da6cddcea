//! # javalens-app
//!
//! Application use cases: chunking Java files, batch embedding, the
//! collection-scoped index client, the indexing pipeline, and query
//! orchestration. This crate depends on `ports`, `domain`, `config`,
//! and `shared`; concrete adapters are wired in by the binary.

pub mod chunker;
pub mod embedder;
pub mod index_client;
pub mod index_repository;
pub mod query;
pub mod scanner;

/// Crate version, exposed for wiring checks.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use chunker::{chunk_file, ChunkerSettings};
pub use embedder::{
    embed_chunks, embed_query, embedding_health_check, EmbedderDeps, EmbedderSettings,
    QUERY_PREFIX,
};
pub use index_client::{index_client_from_config, IndexClient, IndexClientSettings};
pub use index_repository::{
    index_repository, IndexReport, IndexRepositoryDeps, IndexRepositoryInput, IndexStatus,
};
pub use query::{answer_query, search_stats, QueryDeps, QueryInput};
pub use scanner::{scan_java_files, ScannedFile};

#[cfg(test)]
mod tests {
    use super::*;
    use javalens_config::config_crate_version;
    use javalens_domain::domain_crate_version;
    use javalens_ports::ports_crate_version;
    use javalens_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_its_workspace_siblings() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
