//! Chroma vector index adapter.
//!
//! Speaks the tenant/database-scoped v2 collection API. Collections are
//! addressed by name at the surface and by server-assigned id on the wire;
//! the first successful resolution is cached for the life of the adapter.
//! Records travel as parallel arrays, the way the API expects them.

use javalens_config::VectorIndexConfig;
use javalens_domain::{ChunkMetadata, CollectionName, DatabaseName, SearchResult, TenantId};
use javalens_ports::{
    CollectionStats, IndexQueryRequest, IndexRecord, VectorIndexPort, VectorIndexProviderInfo,
};
use javalens_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::OnceCell;

const HEARTBEAT_PATH: &str = "/api/v2/heartbeat";
const QUERY_INCLUDE: [&str; 3] = ["documents", "metadatas", "distances"];

/// Chroma adapter configuration.
#[derive(Debug, Clone)]
pub struct ChromaConfig {
    /// Base URL of the Chroma server.
    pub base_url: Box<str>,
    /// Tenant scope for all collection operations.
    pub tenant: Box<str>,
    /// Database scope for all collection operations.
    pub database: Box<str>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ChromaConfig {
    /// Build from the application vector index config.
    #[must_use]
    pub fn from_vector_index_config(config: &VectorIndexConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            tenant: config.tenant.clone(),
            database: config.database.clone(),
            timeout_ms: config.timeout_ms,
        }
    }

    fn validate(&self) -> Result<(TenantId, DatabaseName)> {
        if self.base_url.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Chroma base url must be non-empty",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Chroma timeout must be greater than zero",
            ));
        }
        let tenant = TenantId::parse(self.tenant.as_ref()).map_err(ErrorEnvelope::from)?;
        let database = DatabaseName::parse(self.database.as_ref()).map_err(ErrorEnvelope::from)?;
        Ok((tenant, database))
    }
}

/// Cached name-to-id resolution for one collection.
#[derive(Debug, Clone)]
struct CachedCollection {
    name: Box<str>,
    id: Box<str>,
}

/// Chroma vector index adapter implementation.
#[derive(Debug)]
pub struct ChromaVectorIndex {
    provider: VectorIndexProviderInfo,
    client: reqwest::Client,
    base_url: Box<str>,
    collections_url: Box<str>,
    collection_cache: OnceCell<CachedCollection>,
}

impl ChromaVectorIndex {
    /// Create a new Chroma adapter.
    pub fn new(config: &ChromaConfig) -> Result<Self> {
        let (tenant, database) = config.validate()?;
        let base_url = config
            .base_url
            .trim()
            .trim_end_matches('/')
            .to_owned()
            .into_boxed_str();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("vector", "chroma_client_init_failed"),
                    format!("failed to build Chroma client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        let provider = VectorIndexProviderInfo {
            id: "chroma".into(),
            name: "Chroma".into(),
        };
        let collections_url = format!(
            "{base_url}/api/v2/tenants/{}/databases/{}/collections",
            tenant.as_str(),
            database.as_str()
        )
        .into_boxed_str();

        Ok(Self {
            provider,
            client,
            base_url,
            collections_url,
            collection_cache: OnceCell::new(),
        })
    }

    /// Resolve a collection name to its server-assigned id, creating the
    /// collection when it does not exist yet.
    ///
    /// The first resolution is cached; a concurrent first resolution is
    /// idempotent because creation treats "already exists" as success.
    async fn collection_id(
        &self,
        ctx: &RequestContext,
        name: &CollectionName,
    ) -> Result<Box<str>> {
        if let Some(cached) = self.collection_cache.get() {
            if cached.name.as_ref() == name.as_str() {
                return Ok(cached.id.clone());
            }
        }

        let id = self.ensure_remote_collection(ctx, name).await?;
        let _ = self.collection_cache.set(CachedCollection {
            name: name.as_str().into(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn ensure_remote_collection(
        &self,
        ctx: &RequestContext,
        name: &CollectionName,
    ) -> Result<Box<str>> {
        let url = format!("{}/{}", self.collections_url, name.as_str());
        let (status, payload) = self
            .send_raw::<CreateCollectionBody<'_>>(
                ctx,
                Method::GET,
                &url,
                None,
                "chroma.get_collection",
            )
            .await?;
        if status.is_success() {
            return parse_collection_id(&payload);
        }
        if status != StatusCode::NOT_FOUND {
            return Err(map_chroma_http_error(status, &payload));
        }

        let body = CreateCollectionBody {
            name: name.as_str(),
        };
        let (status, payload) = self
            .send_raw(
                ctx,
                Method::POST,
                self.collections_url.as_ref(),
                Some(&body),
                "chroma.create_collection",
            )
            .await?;
        if status.is_success() {
            return parse_collection_id(&payload);
        }
        if status != StatusCode::CONFLICT {
            return Err(map_chroma_http_error(status, &payload));
        }

        // Lost a creation race; the collection exists now.
        let (status, payload) = self
            .send_raw::<CreateCollectionBody<'_>>(
                ctx,
                Method::GET,
                &url,
                None,
                "chroma.get_collection",
            )
            .await?;
        if status.is_success() {
            return parse_collection_id(&payload);
        }
        Err(map_chroma_http_error(status, &payload))
    }

    async fn send_raw<B: Serialize + Sync>(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<&B>,
        operation: &'static str,
    ) -> Result<(StatusCode, Vec<u8>)> {
        ctx.ensure_not_cancelled(operation)?;
        let request = self.client.request(method, url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = request.send() => result.map_err(|error| map_reqwest_error(&error))?,
        };

        let status = response.status();
        let payload = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = response.bytes() => result.map_err(|error| map_reqwest_error(&error))?,
        };

        Ok((status, payload.to_vec()))
    }

    async fn request_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<&B>,
        operation: &'static str,
    ) -> Result<T> {
        let (status, payload) = self.send_raw(ctx, method, url, body, operation).await?;
        if !status.is_success() {
            return Err(map_chroma_http_error(status, &payload));
        }
        // Some mutating endpoints answer with an empty body on success.
        let payload = if payload.is_empty() {
            b"null".to_vec()
        } else {
            payload
        };
        serde_json::from_slice(&payload).map_err(|error| invalid_response(&error.to_string()))
    }
}

impl VectorIndexPort for ChromaVectorIndex {
    fn provider(&self) -> &VectorIndexProviderInfo {
        &self.provider
    }

    fn ensure_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> javalens_ports::BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.collection_id(&ctx, &collection_name).await?;
            Ok(())
        })
    }

    fn delete_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> javalens_ports::BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let url = format!("{}/{}", self.collections_url, collection_name.as_str());
            let _: serde_json::Value = self
                .request_json::<serde_json::Value, ()>(
                    &ctx,
                    Method::DELETE,
                    &url,
                    None,
                    "chroma.delete_collection",
                )
                .await?;
            Ok(())
        })
    }

    fn collection_stats(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> javalens_ports::BoxFuture<'_, Result<CollectionStats>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let id = self.collection_id(&ctx, &collection_name).await?;
            let url = format!("{}/{id}/count", self.collections_url);
            let record_count: u64 = self
                .request_json::<u64, ()>(&ctx, Method::GET, &url, None, "chroma.collection_stats")
                .await?;
            Ok(CollectionStats {
                name: collection_name,
                record_count,
            })
        })
    }

    fn add_records(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        records: Vec<IndexRecord>,
    ) -> javalens_ports::BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            if records.is_empty() {
                return Ok(());
            }
            let id = self.collection_id(&ctx, &collection_name).await?;
            let url = format!("{}/{id}/add", self.collections_url);
            let body = AddRecordsBody::from_records(records);
            let _: serde_json::Value = self
                .request_json(&ctx, Method::POST, &url, Some(&body), "chroma.add_records")
                .await?;
            Ok(())
        })
    }

    fn query(
        &self,
        ctx: &RequestContext,
        request: IndexQueryRequest,
    ) -> javalens_ports::BoxFuture<'_, Result<Vec<SearchResult>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let id = self.collection_id(&ctx, &request.collection_name).await?;
            let url = format!("{}/{id}/query", self.collections_url);
            let body = QueryBody {
                query_embeddings: vec![request.query_embedding],
                n_results: request.n_results,
                include: QUERY_INCLUDE,
                r#where: build_where_filter(&request.metadata_filter),
            };
            let response: QueryResponseBody = self
                .request_json(&ctx, Method::POST, &url, Some(&body), "chroma.query")
                .await?;
            map_query_response(response)
        })
    }

    fn heartbeat(&self, ctx: &RequestContext) -> javalens_ports::BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let url = format!("{}{HEARTBEAT_PATH}", self.base_url);
            let _: serde_json::Value = self
                .request_json::<serde_json::Value, ()>(
                    &ctx,
                    Method::GET,
                    &url,
                    None,
                    "chroma.heartbeat",
                )
                .await?;
            Ok(())
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateCollectionBody<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CollectionDto {
    id: String,
}

#[derive(Debug, Serialize)]
struct AddRecordsBody {
    ids: Vec<Box<str>>,
    embeddings: Vec<Vec<f32>>,
    documents: Vec<Box<str>>,
    metadatas: Vec<ChunkMetadata>,
}

impl AddRecordsBody {
    fn from_records(records: Vec<IndexRecord>) -> Self {
        let mut ids = Vec::with_capacity(records.len());
        let mut embeddings = Vec::with_capacity(records.len());
        let mut documents = Vec::with_capacity(records.len());
        let mut metadatas = Vec::with_capacity(records.len());
        for record in records {
            ids.push(record.id);
            embeddings.push(record.embedding);
            documents.push(record.document);
            metadatas.push(record.metadata);
        }
        Self {
            ids,
            embeddings,
            documents,
            metadatas,
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryBody {
    query_embeddings: Vec<Vec<f32>>,
    n_results: u32,
    include: [&'static str; 3],
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    r#where: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponseBody {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<BTreeMap<String, serde_json::Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

/// Build the `where` clause for a query, or `None` when the filter is empty.
///
/// A single entry becomes a plain equality; multiple entries are joined with
/// `$and`, as the server requires.
fn build_where_filter(filter: &BTreeMap<String, String>) -> Option<serde_json::Value> {
    match filter.len() {
        0 => None,
        1 => filter
            .iter()
            .next()
            .map(|(key, value)| serde_json::json!({ key: value })),
        _ => {
            let clauses: Vec<serde_json::Value> = filter
                .iter()
                .map(|(key, value)| serde_json::json!({ key: { "$eq": value } }))
                .collect();
            Some(serde_json::json!({ "$and": clauses }))
        },
    }
}

fn map_query_response(response: QueryResponseBody) -> Result<Vec<SearchResult>> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response
        .documents
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();

    let mut results = Vec::with_capacity(ids.len());
    for (position, id) in ids.into_iter().enumerate() {
        let document = documents
            .get(position)
            .and_then(|value| value.as_deref())
            .unwrap_or_default();
        let metadata = metadatas
            .get(position)
            .and_then(Clone::clone)
            .map(stringify_metadata)
            .unwrap_or_default();
        let distance = distances.get(position).copied().ok_or_else(|| {
            invalid_response("query response is missing a distance for a returned id")
        })?;
        results.push(SearchResult {
            id: id.into_boxed_str(),
            document: document.into(),
            metadata,
            distance,
        });
    }
    Ok(results)
}

/// Flatten JSON metadata values to the string-valued map the domain uses.
fn stringify_metadata(raw: BTreeMap<String, serde_json::Value>) -> ChunkMetadata {
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

fn parse_collection_id(payload: &[u8]) -> Result<Box<str>> {
    let dto: CollectionDto = serde_json::from_slice(payload)
        .map_err(|error| invalid_response(&format!("collection payload: {error}")))?;
    Ok(dto.id.into_boxed_str())
}

fn invalid_response(detail: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("vector", "chroma_invalid_response"),
        format!("invalid Chroma response: {detail}"),
        ErrorClass::NonRetriable,
    )
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "Chroma request timed out",
            ErrorClass::Retriable,
        );
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("Chroma connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::new("vector", "chroma_request_failed"),
        format!("Chroma request failed: {error}"),
        ErrorClass::NonRetriable,
    )
}

fn map_chroma_http_error(status: StatusCode, payload: &[u8]) -> ErrorEnvelope {
    let message = if payload.is_empty() {
        "Chroma request failed".to_owned()
    } else {
        String::from_utf8_lossy(payload).into_owned()
    };

    let envelope = match status.as_u16() {
        400 | 409 | 422 => ErrorEnvelope::expected(ErrorCode::invalid_input(), message),
        404 => ErrorEnvelope::expected(ErrorCode::not_found(), message),
        401 | 403 => ErrorEnvelope::expected(ErrorCode::permission_denied(), message),
        408 => ErrorEnvelope::unexpected(ErrorCode::timeout(), message, ErrorClass::Retriable),
        429 => ErrorEnvelope::unexpected(
            ErrorCode::new("core", "rate_limited"),
            message,
            ErrorClass::Retriable,
        ),
        _ if status.is_server_error() => ErrorEnvelope::unexpected(
            ErrorCode::new("core", "dependency_unavailable"),
            message,
            ErrorClass::Retriable,
        ),
        _ => ErrorEnvelope::unexpected(
            ErrorCode::new("vector", "chroma_http_error"),
            message,
            ErrorClass::NonRetriable,
        ),
    };

    envelope.with_metadata("status", status.as_u16().to_string())
}
