//! Query orchestration: embed, search, convert, explain.
//!
//! `answer_query` never returns an error. Whatever goes wrong inside is
//! folded into a `QueryOutcome` whose explanation carries the failure text
//! and whose match list is empty, so callers always get an answer shape.

use crate::embedder::{embed_query, EmbedderDeps, EmbedderSettings};
use crate::index_client::IndexClient;
use javalens_domain::{CodeMatch, QueryOutcome};
use javalens_ports::{EmbeddingPort, ExplainRequest, ExplainerPort};
use javalens_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Matches included in the explanation context window.
const CONTEXT_MATCH_LIMIT: usize = 5;

/// Dependencies required by query orchestration.
#[derive(Clone)]
pub struct QueryDeps {
    /// Embedding provider adapter.
    pub embedding: Arc<dyn EmbeddingPort>,
    /// Collection-scoped index client.
    pub index_client: IndexClient,
    /// Optional explanation generator; `None` skips explanations entirely.
    pub explainer: Option<Arc<dyn ExplainerPort>>,
    /// Embedder settings for the query vector.
    pub embedder: EmbedderSettings,
}

/// Input payload for a semantic query.
#[derive(Debug, Clone)]
pub struct QueryInput {
    /// Natural-language question or code description.
    pub query: Box<str>,
    /// Maximum matches requested from the index.
    pub max_results: u32,
    /// Equality filters over stored metadata; empty means unfiltered.
    pub metadata_filter: BTreeMap<String, String>,
    /// Whether to generate a prose explanation for the matches.
    pub include_explanation: bool,
}

/// Execute a semantic query against the indexed corpus.
pub async fn answer_query(
    ctx: &RequestContext,
    deps: &QueryDeps,
    input: QueryInput,
) -> QueryOutcome {
    let query = input.query.clone();
    tracing::info!(
        query = query.as_ref(),
        max_results = input.max_results,
        include_explanation = input.include_explanation,
        "processing query"
    );

    match run_query(ctx, deps, input).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::error!(query = query.as_ref(), %error, "query processing failed");
            QueryOutcome {
                query,
                matches: Vec::new(),
                explanation: Some(
                    format!("Sorry, I encountered an error while searching the code: {error}")
                        .into(),
                ),
                total_matches: 0,
            }
        },
    }
}

async fn run_query(
    ctx: &RequestContext,
    deps: &QueryDeps,
    input: QueryInput,
) -> Result<QueryOutcome> {
    let embedder_deps = EmbedderDeps {
        embedding: deps.embedding.clone(),
    };
    let query_embedding = embed_query(ctx, &embedder_deps, deps.embedder, &input.query).await?;
    if query_embedding.is_empty() {
        return Err(ErrorEnvelope::unexpected(
            ErrorCode::new("embedding", "empty_vector"),
            "failed to generate query embedding",
            javalens_shared::ErrorClass::NonRetriable,
        ));
    }

    let results = deps
        .index_client
        .search(ctx, query_embedding, input.max_results, input.metadata_filter)
        .await;
    let matches: Vec<CodeMatch> = results.iter().map(CodeMatch::from_search_result).collect();
    tracing::debug!(matches = matches.len(), "search results converted");

    if let Some(best) = matches.first() {
        tracing::debug!(
            similarity = best.similarity,
            kind = best.kind.as_ref(),
            class_name = best.class_name.as_ref(),
            "best match"
        );
    }

    let explanation = if input.include_explanation && !matches.is_empty() {
        explain_matches(ctx, deps, &input.query, &matches).await
    } else {
        None
    };

    Ok(QueryOutcome {
        query: input.query,
        total_matches: matches.len(),
        matches,
        explanation,
    })
}

async fn explain_matches(
    ctx: &RequestContext,
    deps: &QueryDeps,
    query: &str,
    matches: &[CodeMatch],
) -> Option<Box<str>> {
    let explainer = deps.explainer.as_ref()?;
    let context = build_code_context(matches);

    let request = ExplainRequest {
        question: query.into(),
        context: context.into(),
    };
    match explainer.explain(ctx, request).await {
        Ok(explanation) => Some(explanation),
        Err(error) => {
            tracing::error!(%error, "explanation generation failed");
            None
        },
    }
}

/// Render the top matches as a code-context block for the explainer.
fn build_code_context(matches: &[CodeMatch]) -> String {
    let mut context = String::new();

    for code_match in matches.iter().take(CONTEXT_MATCH_LIMIT) {
        let _ = writeln!(
            context,
            "// {} from {} (similarity: {:.2})",
            code_match.kind, code_match.class_name, code_match.similarity
        );
        context.push_str(&code_match.code);
        context.push_str("\n\n");
    }

    context
}

/// Collection stats plus the filter keys and chunk kinds a caller can use.
pub async fn search_stats(
    ctx: &RequestContext,
    index_client: &IndexClient,
) -> BTreeMap<String, String> {
    let mut stats = index_client.stats(ctx).await;
    stats.insert(
        "totalDocuments".to_owned(),
        stats
            .get("documents_count")
            .cloned()
            .unwrap_or_else(|| "0".to_owned()),
    );
    stats.insert(
        "availableFilters".to_owned(),
        "type,className,isSpringComponent,isEndpoint".to_owned(),
    );
    stats.insert(
        "supportedTypes".to_owned(),
        "CLASS,METHOD,INTERFACE".to_owned(),
    );
    stats
}
