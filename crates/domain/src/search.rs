//! Embedding and search result types.

use crate::chunk::ChunkMetadata;
use crate::primitives::ChunkId;
use serde::{Deserialize, Serialize};

/// A chunk's vector representation plus everything stored alongside it.
///
/// Created by the batch embedder; immutable. Chunks whose embedding call
/// failed never produce an `Embedding` (no partial or empty vectors are
/// persisted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embedding {
    /// Id of the source chunk.
    pub chunk_id: ChunkId,
    /// Fixed-dimension vector, dimension set by the embedding model.
    pub vector: Vec<f32>,
    /// Copy of the chunk text, stored for retrieval.
    pub content: Box<str>,
    /// Chunk metadata merged with embedding-level facts.
    pub metadata: ChunkMetadata,
}

/// One row returned by the vector index, distances untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Remote document id (a chunk id).
    pub id: Box<str>,
    /// Stored content.
    pub document: Box<str>,
    /// Stored metadata.
    pub metadata: ChunkMetadata,
    /// Dissimilarity score from the index; lower is more similar.
    pub distance: f32,
}

/// A search result lifted into typed fields with a similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMatch {
    /// Chunk id of the match.
    pub id: Box<str>,
    /// Matched source text.
    pub code: Box<str>,
    /// Similarity, computed as `1 - distance`.
    pub similarity: f32,
    /// Chunk kind tag, empty when missing from metadata.
    pub kind: Box<str>,
    /// Declaring class name, empty when missing.
    pub class_name: Box<str>,
    /// Method name for method chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<Box<str>>,
    /// Declared package, empty when missing.
    pub package_name: Box<str>,
    /// Source file path, empty when missing.
    pub file_path: Box<str>,
    /// Annotations recovered from the comma-joined metadata string.
    pub annotations: Vec<Box<str>>,
}

impl CodeMatch {
    /// Lift a raw search result, converting distance to similarity and
    /// extracting typed fields from the flat metadata map.
    #[must_use]
    pub fn from_search_result(result: &SearchResult) -> Self {
        let metadata = &result.metadata;
        let field = |key: &str| -> Box<str> {
            metadata
                .get(key)
                .map(String::as_str)
                .unwrap_or_default()
                .into()
        };

        let annotations = metadata
            .get("annotations")
            .filter(|joined| !joined.is_empty())
            .map(|joined| joined.split(',').map(Box::from).collect())
            .unwrap_or_default();

        Self {
            id: result.id.clone(),
            code: result.document.clone(),
            similarity: 1.0 - result.distance,
            kind: field("type"),
            class_name: field("className"),
            method_name: metadata
                .get("methodName")
                .filter(|name| !name.is_empty())
                .map(|name| name.as_str().into()),
            package_name: field("packageName"),
            file_path: field("filePath"),
            annotations,
        }
    }
}

/// Final answer assembled by the query orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    /// The raw query text submitted by the caller.
    pub query: Box<str>,
    /// Matches ordered as returned by the index.
    pub matches: Vec<CodeMatch>,
    /// Optional generated explanation; on internal failure this carries an
    /// error notice instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Box<str>>,
    /// Number of matches found.
    pub total_matches: usize,
}
