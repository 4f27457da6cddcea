//! High-level client over the vector index port.
//!
//! The port surfaces transport failures as error envelopes; this client
//! absorbs them. Add reports a per-run boolean, search degrades to an empty
//! result list, stats to an empty map, health to `false`. Indexing and
//! querying keep working against a flaky index instead of failing the run.

use javalens_config::VectorIndexConfig;
use javalens_domain::{CollectionName, Embedding, SearchResult};
use javalens_ports::{IndexQueryRequest, IndexRecord, VectorIndexPort};
use javalens_shared::{ErrorEnvelope, RequestContext, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Add-batch knobs resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexClientSettings {
    /// Records per add batch.
    pub add_batch_size: usize,
    /// Pause between add batches.
    pub add_batch_delay: Duration,
}

impl IndexClientSettings {
    /// Resolve settings from the validated vector index section.
    #[must_use]
    pub fn from_vector_index_config(config: &VectorIndexConfig) -> Self {
        Self {
            add_batch_size: config.batch_size.max(1) as usize,
            add_batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }
}

impl Default for IndexClientSettings {
    fn default() -> Self {
        Self::from_vector_index_config(&VectorIndexConfig::default())
    }
}

/// Collection-scoped facade over a [`VectorIndexPort`].
#[derive(Clone)]
pub struct IndexClient {
    index: Arc<dyn VectorIndexPort>,
    collection: CollectionName,
    settings: IndexClientSettings,
}

impl IndexClient {
    /// Build a client bound to one collection.
    #[must_use]
    pub fn new(
        index: Arc<dyn VectorIndexPort>,
        collection: CollectionName,
        settings: IndexClientSettings,
    ) -> Self {
        Self {
            index,
            collection,
            settings,
        }
    }

    /// The collection this client operates on.
    #[must_use]
    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    /// Create the collection when missing. Errors propagate: without a
    /// collection nothing downstream can work.
    pub async fn ensure_collection(&self, ctx: &RequestContext) -> Result<()> {
        self.index
            .ensure_collection(ctx, self.collection.clone())
            .await
    }

    /// Store embeddings in batches, returning true only when every batch
    /// succeeded. Batches after a failed one are still attempted; there is
    /// no rollback. Records with ids already present are handed to the
    /// provider as-is, duplicate handling is a provider concern.
    pub async fn add_all(&self, ctx: &RequestContext, embeddings: Vec<Embedding>) -> bool {
        if embeddings.is_empty() {
            return true;
        }

        let total = embeddings.len();
        let records: Vec<IndexRecord> = embeddings.into_iter().map(to_record).collect();
        let mut all_succeeded = true;

        for (index, batch) in records.chunks(self.settings.add_batch_size).enumerate() {
            let outcome = self
                .index
                .add_records(ctx, self.collection.clone(), batch.to_vec())
                .await;

            if let Err(error) = outcome {
                tracing::error!(
                    batch = index,
                    records = batch.len(),
                    collection = self.collection.as_str(),
                    %error,
                    "failed to store embedding batch"
                );
                all_succeeded = false;
            }

            tokio::time::sleep(self.settings.add_batch_delay).await;
        }

        tracing::info!(
            records = total,
            collection = self.collection.as_str(),
            success = all_succeeded,
            "finished storing embeddings"
        );
        all_succeeded
    }

    /// Nearest-neighbour search. An empty filter map sends no filter at all;
    /// failures degrade to an empty result list.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        query_embedding: Vec<f32>,
        n_results: u32,
        metadata_filter: BTreeMap<String, String>,
    ) -> Vec<SearchResult> {
        let request = IndexQueryRequest {
            collection_name: self.collection.clone(),
            query_embedding,
            n_results,
            metadata_filter,
        };

        match self.index.query(ctx, request).await {
            Ok(results) => results,
            Err(error) => {
                tracing::error!(
                    collection = self.collection.as_str(),
                    %error,
                    "vector search failed"
                );
                Vec::new()
            },
        }
    }

    /// Collection stats as a flat string map; empty on failure.
    pub async fn stats(&self, ctx: &RequestContext) -> BTreeMap<String, String> {
        match self.index.collection_stats(ctx, self.collection.clone()).await {
            Ok(stats) => BTreeMap::from([
                ("collection_name".to_owned(), stats.name.as_str().to_owned()),
                ("documents_count".to_owned(), stats.record_count.to_string()),
            ]),
            Err(error) => {
                tracing::error!(
                    collection = self.collection.as_str(),
                    %error,
                    "failed to read collection stats"
                );
                BTreeMap::new()
            },
        }
    }

    /// Liveness of the remote index.
    pub async fn health_check(&self, ctx: &RequestContext) -> bool {
        match self.index.heartbeat(ctx).await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(%error, "vector index heartbeat failed");
                false
            },
        }
    }

    /// Drop the collection and all of its records; false on failure.
    pub async fn delete_collection(&self, ctx: &RequestContext) -> bool {
        match self
            .index
            .delete_collection(ctx, self.collection.clone())
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    collection = self.collection.as_str(),
                    %error,
                    "failed to delete collection"
                );
                false
            },
        }
    }
}

/// Default collection client for a validated config.
pub fn index_client_from_config(
    index: Arc<dyn VectorIndexPort>,
    config: &VectorIndexConfig,
) -> Result<IndexClient> {
    let collection =
        CollectionName::parse(config.collection.as_ref()).map_err(ErrorEnvelope::from)?;
    Ok(IndexClient::new(
        index,
        collection,
        IndexClientSettings::from_vector_index_config(config),
    ))
}

fn to_record(embedding: Embedding) -> IndexRecord {
    IndexRecord {
        id: embedding.chunk_id.into_inner(),
        embedding: embedding.vector,
        document: embedding.content,
        metadata: embedding.metadata,
    }
}
