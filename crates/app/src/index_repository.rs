//! End-to-end indexing pipeline: scan, parse, chunk, embed, store.

use crate::chunker::{chunk_file, ChunkerSettings};
use crate::embedder::{embed_chunks, EmbedderDeps, EmbedderSettings};
use crate::index_client::IndexClient;
use crate::scanner::{scan_java_files, ScannedFile};
use javalens_config::ScanConfig;
use javalens_domain::Chunk;
use javalens_ports::{EmbeddingPort, JavaParserPort};
use javalens_shared::{RequestContext, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Final status of an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexStatus {
    /// Every stage succeeded.
    Completed,
    /// The store stage (or an earlier fatal stage) failed.
    Failed,
}

/// Counts and timing for one indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    /// Java files discovered by the scanner.
    pub total_files: usize,
    /// Files that parsed successfully.
    pub parsed_files: usize,
    /// Chunks produced across all parsed files.
    pub total_chunks: usize,
    /// Embeddings stored (chunks may be dropped by the embedder).
    pub stored_embeddings: usize,
    /// Chunk counts per kind tag.
    pub chunks_by_kind: BTreeMap<String, usize>,
    /// Run status.
    pub status: IndexStatus,
    /// Wall-clock duration of the run.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u128(value.as_millis())
    }
}

/// Dependencies required by the indexing pipeline.
#[derive(Clone)]
pub struct IndexRepositoryDeps {
    /// Java source parser.
    pub parser: Arc<dyn JavaParserPort>,
    /// Embedding provider adapter.
    pub embedding: Arc<dyn EmbeddingPort>,
    /// Collection-scoped index client.
    pub index_client: IndexClient,
}

/// Input payload for an indexing run.
#[derive(Debug, Clone)]
pub struct IndexRepositoryInput {
    /// Repository root to scan.
    pub repository_root: PathBuf,
    /// Scanner settings.
    pub scan: ScanConfig,
    /// Chunker settings.
    pub chunker: ChunkerSettings,
    /// Embedder settings.
    pub embedder: EmbedderSettings,
}

/// Index a repository: scan, parse, chunk, embed, and store.
///
/// Per-file parse failures are logged and skipped; the run keeps going.
/// A store failure marks the run `Failed` but the report still carries the
/// counts accumulated up to that point.
pub async fn index_repository(
    ctx: &RequestContext,
    deps: &IndexRepositoryDeps,
    input: IndexRepositoryInput,
) -> Result<IndexReport> {
    let started_at = Instant::now();
    tracing::info!(
        root = %input.repository_root.display(),
        collection = deps.index_client.collection().as_str(),
        "indexing repository"
    );

    let files = scan_java_files(&input.repository_root, &input.scan)?;
    let total_files = files.len();

    ctx.ensure_not_cancelled("index_repository.parse")?;
    let (chunks, parsed_files) = parse_and_chunk(deps, input.chunker, files);
    let total_chunks = chunks.len();
    let chunks_by_kind = count_by_kind(&chunks);
    tracing::info!(
        total_files,
        parsed_files,
        total_chunks,
        "parse and chunk stages complete"
    );

    let embedder_deps = EmbedderDeps {
        embedding: deps.embedding.clone(),
    };
    let embeddings = embed_chunks(ctx, &embedder_deps, input.embedder, chunks).await?;
    let stored_embeddings = embeddings.len();

    let status = match deps.index_client.ensure_collection(ctx).await {
        Ok(()) => {
            if deps.index_client.add_all(ctx, embeddings).await {
                IndexStatus::Completed
            } else {
                IndexStatus::Failed
            }
        },
        Err(error) if error.is_cancelled() => return Err(error),
        Err(error) => {
            tracing::error!(%error, "failed to ensure collection before store");
            IndexStatus::Failed
        },
    };

    let report = IndexReport {
        total_files,
        parsed_files,
        total_chunks,
        stored_embeddings,
        chunks_by_kind,
        status,
        duration: started_at.elapsed(),
    };
    tracing::info!(
        status = ?report.status,
        stored = report.stored_embeddings,
        duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        "indexing run finished"
    );
    Ok(report)
}

fn parse_and_chunk(
    deps: &IndexRepositoryDeps,
    settings: ChunkerSettings,
    files: Vec<ScannedFile>,
) -> (Vec<Chunk>, usize) {
    let mut chunks = Vec::new();
    let mut parsed_files = 0usize;

    for file in files {
        let source = match std::fs::read_to_string(&file.absolute_path) {
            Ok(source) => source,
            Err(error) => {
                tracing::warn!(file = file.relative_path.as_ref(), %error, "skipping unreadable file");
                continue;
            },
        };

        match deps.parser.parse(&file.relative_path, &source) {
            Ok(parsed) => {
                parsed_files += 1;
                chunks.extend(chunk_file(settings, &parsed, &file.relative_path));
            },
            Err(error) => {
                tracing::warn!(file = file.relative_path.as_ref(), %error, "skipping unparsable file");
            },
        }
    }

    (chunks, parsed_files)
}

fn count_by_kind(chunks: &[Chunk]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for chunk in chunks {
        *counts.entry(chunk.kind.as_str().to_owned()).or_insert(0) += 1;
    }
    counts
}
