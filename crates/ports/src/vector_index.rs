//! Vector index boundary contract.
//!
//! The surface mirrors a tenant/database-scoped collection API: collections
//! are created lazily, records are appended in parallel-array form by the
//! adapter, and nearest-neighbour queries return distances.

use crate::BoxFuture;
use javalens_domain::{ChunkMetadata, CollectionName, SearchResult};
use javalens_shared::{RequestContext, Result};
use std::collections::BTreeMap;

/// Provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorIndexProviderInfo {
    /// Stable provider identifier (e.g. `chroma`).
    pub id: Box<str>,
    /// Human-readable provider name.
    pub name: Box<str>,
}

/// A record stored in the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Stable record identifier (typically a chunk id).
    pub id: Box<str>,
    /// Dense embedding vector.
    pub embedding: Vec<f32>,
    /// Content payload stored alongside the vector.
    pub document: Box<str>,
    /// Flat string metadata for filters and result shaping.
    pub metadata: ChunkMetadata,
}

/// Owned request for a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQueryRequest {
    /// Target collection name.
    pub collection_name: CollectionName,
    /// Dense query vector.
    pub query_embedding: Vec<f32>,
    /// Maximum number of results to return.
    pub n_results: u32,
    /// Equality filter on metadata keys. An empty map means no filter.
    pub metadata_filter: BTreeMap<String, String>,
}

/// Summary facts about a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    /// Collection name.
    pub name: CollectionName,
    /// Number of records currently stored.
    pub record_count: u64,
}

/// Boundary contract for vector storage + retrieval.
pub trait VectorIndexPort: Send + Sync {
    /// Provider info for this implementation.
    fn provider(&self) -> &VectorIndexProviderInfo;

    /// Create the collection when it does not already exist.
    ///
    /// Creating a collection that already exists is not an error.
    fn ensure_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<()>>;

    /// Delete a collection and all of its records.
    fn delete_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<()>>;

    /// Return record-count stats for a collection.
    fn collection_stats(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<CollectionStats>>;

    /// Append records to a collection.
    ///
    /// Records whose ids already exist in the collection are handed to the
    /// provider as-is; deduplication is a provider concern, not a client one.
    fn add_records(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        records: Vec<IndexRecord>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Run a nearest-neighbour query, returning results ordered by distance.
    fn query(
        &self,
        ctx: &RequestContext,
        request: IndexQueryRequest,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>>>;

    /// Liveness probe against the remote index.
    fn heartbeat(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<()>>;
}
