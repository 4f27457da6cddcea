//! Batch embedding of chunks with bounded concurrency.
//!
//! Chunks are embedded in fixed-size batches, at most two batches in flight,
//! with a pause after each batch so a local embedding server is not
//! saturated. A chunk whose embedding fails after retries is dropped and the
//! run continues; only cancellation stops the whole pass.

use futures_util::stream::{self, StreamExt};
use javalens_config::EmbeddingConfig;
use javalens_domain::{embedding_metadata, Chunk, Embedding};
use javalens_ports::{EmbedRequest, EmbeddingPort};
use javalens_shared::{retry_async, RequestContext, Result, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Prefix applied to query text before embedding, steering the model toward
/// the indexed corpus.
pub const QUERY_PREFIX: &str = "Java Spring Boot code: ";

/// Embedder knobs resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedderSettings {
    /// Chunks per batch.
    pub batch_size: usize,
    /// Batches in flight at once.
    pub concurrency: usize,
    /// Pause after each completed batch.
    pub batch_delay: Duration,
    /// Input cap in characters; longer texts are truncated with a `...` suffix.
    pub max_input_chars: usize,
    /// Retry policy for transient provider failures.
    pub retry: RetryPolicy,
}

impl EmbedderSettings {
    /// Resolve settings from the validated embedding section.
    #[must_use]
    pub fn from_embedding_config(config: &EmbeddingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1) as usize,
            concurrency: config.concurrency.max(1) as usize,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            max_input_chars: config.max_input_chars as usize,
            retry: RetryPolicy {
                max_attempts: config.retry.max_attempts,
                base_delay_ms: config.retry.base_delay_ms,
                max_delay_ms: config.retry.max_delay_ms,
                jitter_ratio_pct: config.retry.jitter_ratio_pct,
            },
        }
    }
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self::from_embedding_config(&EmbeddingConfig::default())
    }
}

/// Dependencies required by the batch embedder.
#[derive(Clone)]
pub struct EmbedderDeps {
    /// Embedding provider adapter.
    pub embedding: Arc<dyn EmbeddingPort>,
}

/// Embed chunks batch-by-batch, returning one `Embedding` per surviving chunk.
///
/// Blank chunks never reach the provider. Failed chunks are logged and
/// dropped; output order follows input order. The only error returned is
/// cancellation.
pub async fn embed_chunks(
    ctx: &RequestContext,
    deps: &EmbedderDeps,
    settings: EmbedderSettings,
    chunks: Vec<Chunk>,
) -> Result<Vec<Embedding>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let total = chunks.len();
    tracing::info!(
        chunks = total,
        batch_size = settings.batch_size,
        provider = deps.embedding.provider().id.as_ref(),
        model = deps.embedding.provider().model.as_ref(),
        "embedding chunks"
    );

    let batches: Vec<Vec<Chunk>> = chunks
        .chunks(settings.batch_size)
        .map(<[Chunk]>::to_vec)
        .collect();

    let mut batch_stream = stream::iter(batches.into_iter().enumerate())
        .map(|(index, batch)| embed_batch(ctx, deps, settings, index, batch))
        .buffered(settings.concurrency);

    let mut embeddings = Vec::with_capacity(total);
    while let Some(batch) = batch_stream.next().await {
        embeddings.extend(batch?);
    }

    tracing::info!(
        embedded = embeddings.len(),
        dropped = total - embeddings.len(),
        "embedding pass finished"
    );
    Ok(embeddings)
}

async fn embed_batch(
    ctx: &RequestContext,
    deps: &EmbedderDeps,
    settings: EmbedderSettings,
    index: usize,
    batch: Vec<Chunk>,
) -> Result<Vec<Embedding>> {
    let mut embeddings = Vec::with_capacity(batch.len());

    for chunk in batch {
        if chunk.content.trim().is_empty() {
            tracing::warn!(chunk_id = %chunk.id, "skipping blank chunk");
            continue;
        }

        match embed_text(ctx, deps, settings, &chunk.content).await {
            Ok(vector) => embeddings.push(Embedding {
                metadata: embedding_metadata(&chunk),
                content: chunk.content.clone(),
                chunk_id: chunk.id,
                vector,
            }),
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                tracing::warn!(chunk_id = %chunk.id, %error, "dropping chunk after failed embedding");
            },
        }
    }

    tracing::debug!(batch = index, embedded = embeddings.len(), "batch embedded");
    tokio::time::sleep(settings.batch_delay).await;

    Ok(embeddings)
}

/// Embed query text with the corpus prefix applied.
pub async fn embed_query(
    ctx: &RequestContext,
    deps: &EmbedderDeps,
    settings: EmbedderSettings,
    query: &str,
) -> Result<Vec<f32>> {
    let prefixed = format!("{QUERY_PREFIX}{query}");
    embed_text(ctx, deps, settings, &prefixed).await
}

/// Probe the provider by embedding a trivial text.
pub async fn embedding_health_check(ctx: &RequestContext, deps: &EmbedderDeps) -> bool {
    let request = EmbedRequest::new("test");
    match deps.embedding.embed(ctx, request).await {
        Ok(vector) => !vector.is_empty(),
        Err(error) => {
            tracing::error!(%error, "embedding health check failed");
            false
        },
    }
}

async fn embed_text(
    ctx: &RequestContext,
    deps: &EmbedderDeps,
    settings: EmbedderSettings,
    text: &str,
) -> Result<Vec<f32>> {
    let bounded = truncate_input(text, settings.max_input_chars);
    retry_async(ctx, settings.retry, "embed", || {
        deps.embedding.embed(ctx, EmbedRequest::new(bounded.as_ref()))
    })
    .await
}

fn truncate_input(text: &str, max_chars: usize) -> Box<str> {
    if text.chars().count() <= max_chars {
        return text.into();
    }

    let mut bounded: String = text.chars().take(max_chars).collect();
    bounded.push_str("...");
    bounded.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use javalens_domain::{ChunkId, ChunkKind, ChunkMetadata};
    use javalens_ports::{BoxFuture, EmbeddingProviderInfo};
    use javalens_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result as SharedResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TestEmbedding {
        provider: EmbeddingProviderInfo,
        calls: AtomicUsize,
        prompts: Mutex<Vec<Box<str>>>,
        fail_on_prompt: Option<Box<str>>,
        transient_failures: AtomicUsize,
    }

    impl TestEmbedding {
        fn new() -> Self {
            Self {
                provider: EmbeddingProviderInfo {
                    id: "test".into(),
                    model: "test-model".into(),
                },
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fail_on_prompt: None,
                transient_failures: AtomicUsize::new(0),
            }
        }

        fn failing_on(prompt: &str) -> Self {
            Self {
                fail_on_prompt: Some(prompt.into()),
                ..Self::new()
            }
        }

        fn with_transient_failures(count: usize) -> Self {
            Self {
                transient_failures: AtomicUsize::new(count),
                ..Self::new()
            }
        }

        fn prompts(&self) -> Vec<Box<str>> {
            self.prompts
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default()
        }
    }

    impl EmbeddingPort for TestEmbedding {
        fn provider(&self) -> &EmbeddingProviderInfo {
            &self.provider
        }

        fn embed(
            &self,
            _ctx: &RequestContext,
            request: EmbedRequest,
        ) -> BoxFuture<'_, SharedResult<Vec<f32>>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Ok(mut guard) = self.prompts.lock() {
                    guard.push(request.text.clone());
                }

                if self.transient_failures.load(Ordering::SeqCst) > 0 {
                    self.transient_failures.fetch_sub(1, Ordering::SeqCst);
                    return Err(ErrorEnvelope::unexpected(
                        ErrorCode::timeout(),
                        "simulated timeout",
                        ErrorClass::Retriable,
                    ));
                }
                if let Some(banned) = &self.fail_on_prompt {
                    if request.text == *banned {
                        return Err(ErrorEnvelope::expected(
                            ErrorCode::invalid_input(),
                            "simulated bad request",
                        ));
                    }
                }

                Ok(vec![0.1, 0.2, 0.3])
            })
        }
    }

    fn chunk(id_suffix: &str, content: &str) -> SharedResult<Chunk> {
        Ok(Chunk {
            id: ChunkId::parse(format!("com.acme.Demo.Demo.{id_suffix}"))
                .map_err(ErrorEnvelope::from)?,
            content: content.into(),
            kind: ChunkKind::Class,
            class_name: "Demo".into(),
            method_name: None,
            package_name: "com.acme".into(),
            file_path: "Demo.java".into(),
            annotations: Vec::new(),
            imports: Vec::new(),
            metadata: ChunkMetadata::new(),
        })
    }

    fn fast_settings() -> EmbedderSettings {
        EmbedderSettings {
            batch_delay: Duration::from_millis(0),
            ..EmbedderSettings::default()
        }
    }

    #[tokio::test]
    async fn twelve_chunks_with_one_failure_yield_eleven_embeddings() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::failing_on("bad"));
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };

        let mut chunks = Vec::new();
        for i in 0..11 {
            chunks.push(chunk(&format!("c{i}"), &format!("content {i}"))?);
        }
        chunks.insert(4, chunk("poison", "bad")?);

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, fast_settings(), chunks).await?;

        assert_eq!(embeddings.len(), 11);
        // One provider call per chunk; the bad request is not retried.
        assert_eq!(embedding.calls.load(Ordering::SeqCst), 12);
        Ok(())
    }

    #[tokio::test]
    async fn blank_chunks_never_reach_the_provider() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::new());
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };
        let chunks = vec![chunk("blank", "   \n  ")?];

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, fast_settings(), chunks).await?;

        assert!(embeddings.is_empty());
        assert_eq!(embedding.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::new());
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, fast_settings(), Vec::new()).await?;

        assert!(embeddings.is_empty());
        assert_eq!(embedding.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::with_transient_failures(2));
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };
        let chunks = vec![chunk("c0", "content")?];

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, fast_settings(), chunks).await?;

        assert_eq!(embeddings.len(), 1);
        assert_eq!(embedding.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    struct ConcurrencyProbe {
        provider: EmbeddingProviderInfo,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ConcurrencyProbe {
        fn new() -> Self {
            Self {
                provider: EmbeddingProviderInfo {
                    id: "test".into(),
                    model: "test-model".into(),
                },
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingPort for ConcurrencyProbe {
        fn provider(&self) -> &EmbeddingProviderInfo {
            &self.provider
        }

        fn embed(
            &self,
            _ctx: &RequestContext,
            _request: EmbedRequest,
        ) -> BoxFuture<'_, SharedResult<Vec<f32>>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![0.1])
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_batches_never_exceed_the_cap() -> SharedResult<()> {
        let probe = Arc::new(ConcurrencyProbe::new());
        let deps = EmbedderDeps {
            embedding: probe.clone(),
        };
        let settings = EmbedderSettings {
            batch_size: 1,
            concurrency: 2,
            ..fast_settings()
        };

        let mut chunks = Vec::new();
        for i in 0..6 {
            chunks.push(chunk(&format!("c{i}"), &format!("content {i}"))?);
        }

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, settings, chunks).await?;

        assert_eq!(embeddings.len(), 6);
        // One call per single-chunk batch.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 6);
        assert!(probe.max_in_flight.load(Ordering::SeqCst) <= 2);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_content_is_truncated_with_suffix() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::new());
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };
        let settings = EmbedderSettings {
            max_input_chars: 10,
            ..fast_settings()
        };
        let chunks = vec![chunk("c0", "abcdefghijKLMNOP")?];

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, settings, chunks).await?;

        assert_eq!(embeddings.len(), 1);
        // The stored content keeps the full text; only the prompt is bounded.
        assert_eq!(embeddings[0].content.as_ref(), "abcdefghijKLMNOP");
        let prompts = embedding.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].as_ref(), "abcdefghij...");
        Ok(())
    }

    #[tokio::test]
    async fn query_embedding_applies_the_corpus_prefix() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::new());
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };

        let ctx = RequestContext::new_request();
        let vector = embed_query(&ctx, &deps, fast_settings(), "how are users saved?").await?;

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        let prompts = embedding.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0].as_ref(),
            "Java Spring Boot code: how are users saved?"
        );
        Ok(())
    }

    #[tokio::test]
    async fn health_check_embeds_the_probe_text() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::new());
        let deps = EmbedderDeps {
            embedding: embedding.clone(),
        };

        let ctx = RequestContext::new_request();
        assert!(embedding_health_check(&ctx, &deps).await);
        let prompts = embedding.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].as_ref(), "test");

        let failing = EmbedderDeps {
            embedding: Arc::new(TestEmbedding::failing_on("test")),
        };
        assert!(!embedding_health_check(&ctx, &failing).await);
        Ok(())
    }

    #[tokio::test]
    async fn embedding_carries_merged_metadata() -> SharedResult<()> {
        let embedding = Arc::new(TestEmbedding::new());
        let deps = EmbedderDeps { embedding };
        let chunks = vec![chunk("c0", "public class Demo {}")?];

        let ctx = RequestContext::new_request();
        let embeddings = embed_chunks(&ctx, &deps, fast_settings(), chunks).await?;

        let metadata = &embeddings[0].metadata;
        assert_eq!(
            metadata.get("chunkId").map(String::as_str),
            Some("com.acme.Demo.Demo.c0")
        );
        assert_eq!(metadata.get("type").map(String::as_str), Some("CLASS"));
        assert_eq!(
            metadata.get("className").map(String::as_str),
            Some("Demo")
        );
        Ok(())
    }
}
