//! Ollama embedding adapter.
//!
//! Speaks the single-prompt embeddings endpoint: `POST {base}/api/embeddings`
//! with `{"model": ..., "prompt": ...}`, answered by `{"embedding": [...]}`.
//! Batching, truncation, and retry live in the application layer; this
//! adapter embeds one text per call.

use javalens_config::EmbeddingConfig;
use javalens_ports::{EmbedRequest, EmbeddingPort, EmbeddingProviderInfo};
use javalens_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EMBEDDINGS_PATH: &str = "/api/embeddings";

/// Ollama embedding adapter configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    pub base_url: Box<str>,
    /// Embedding model name.
    pub model: Box<str>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl OllamaConfig {
    /// Build from the application embedding config.
    #[must_use]
    pub fn from_embedding_config(config: &EmbeddingConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_ms: config.timeout_ms,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Ollama base url must be non-empty",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Ollama model must be non-empty",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Ollama timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Ollama embedding adapter implementation.
#[derive(Debug)]
pub struct OllamaEmbedder {
    provider: EmbeddingProviderInfo,
    client: reqwest::Client,
    endpoint: Box<str>,
    model: Box<str>,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedding adapter.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url.trim().trim_end_matches('/');
        let model = config.model.trim().to_owned().into_boxed_str();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("embedding", "ollama_client_init_failed"),
                    format!("failed to build Ollama client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        let provider = EmbeddingProviderInfo {
            id: "ollama".into(),
            model: model.clone(),
        };
        let endpoint = format!("{base_url}{EMBEDDINGS_PATH}").into_boxed_str();

        Ok(Self {
            provider,
            client,
            endpoint,
            model,
        })
    }

    async fn send_request(
        &self,
        ctx: &RequestContext,
        request: OllamaEmbeddingsRequest<'_>,
        operation: &'static str,
    ) -> Result<OllamaEmbeddingsResponse> {
        ctx.ensure_not_cancelled(operation)?;

        let response = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = self.client.post(self.endpoint.as_ref()).json(&request).send() => {
                result.map_err(|error| map_reqwest_error(&error))?
            }
        };

        let status = response.status();
        let payload = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = response.bytes() => result.map_err(|error| map_reqwest_error(&error))?,
        };

        if !status.is_success() {
            return Err(map_ollama_http_error(status, &payload));
        }

        serde_json::from_slice(&payload).map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::new("embedding", "ollama_invalid_response"),
                format!("failed to decode Ollama response: {error}"),
                ErrorClass::NonRetriable,
            )
        })
    }
}

impl EmbeddingPort for OllamaEmbedder {
    fn provider(&self) -> &EmbeddingProviderInfo {
        &self.provider
    }

    fn embed(
        &self,
        ctx: &RequestContext,
        request: EmbedRequest,
    ) -> javalens_ports::BoxFuture<'_, Result<Vec<f32>>> {
        let ctx = ctx.clone();
        let text = request.text;
        Box::pin(async move {
            let request = OllamaEmbeddingsRequest {
                model: &self.model,
                prompt: &text,
            };
            let response = self
                .send_request(&ctx, request, "ollama_embedder.embed")
                .await?;
            if response.embedding.is_empty() {
                return Err(ErrorEnvelope::unexpected(
                    ErrorCode::new("embedding", "ollama_invalid_response"),
                    "Ollama returned an empty embedding",
                    ErrorClass::NonRetriable,
                ));
            }
            Ok(response.embedding)
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: Option<String>,
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "Ollama request timed out",
            ErrorClass::Retriable,
        );
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("Ollama connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::new("embedding", "ollama_request_failed"),
        format!("Ollama request failed: {error}"),
        ErrorClass::NonRetriable,
    )
}

fn map_ollama_http_error(status: StatusCode, payload: &[u8]) -> ErrorEnvelope {
    let message = serde_json::from_slice::<OllamaErrorResponse>(payload)
        .ok()
        .and_then(|response| response.error)
        .unwrap_or_else(|| "Ollama request failed".to_owned());

    let envelope = match status.as_u16() {
        400 | 404 | 422 => ErrorEnvelope::expected(ErrorCode::invalid_input(), message),
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
            ErrorCode::new("embedding", "ollama_http_error"),
            message,
            ErrorClass::NonRetriable,
        ),
    };

    envelope.with_metadata("status", status.as_u16().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embeddings_request_serializes_model_and_prompt() {
        let request = OllamaEmbeddingsRequest {
            model: "nomic-embed-text",
            prompt: "public class User {}",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "nomic-embed-text",
                "prompt": "public class User {}"
            })
        );
    }

    #[test]
    fn bad_request_maps_to_non_retriable_invalid_input() {
        let payload = serde_json::to_vec(&json!({ "error": "model not found" })).unwrap();
        let envelope = map_ollama_http_error(StatusCode::NOT_FOUND, &payload);
        assert_eq!(envelope.code, ErrorCode::invalid_input());
        assert_eq!(envelope.class, ErrorClass::NonRetriable);
        assert_eq!(envelope.metadata.get("status").map(String::as_str), Some("404"));
    }

    #[test]
    fn rate_limited_maps_to_retriable() {
        let payload = serde_json::to_vec(&json!({ "error": "rate limited" })).unwrap();
        let envelope = map_ollama_http_error(StatusCode::TOO_MANY_REQUESTS, &payload);
        assert_eq!(envelope.code, ErrorCode::new("core", "rate_limited"));
        assert_eq!(envelope.class, ErrorClass::Retriable);
    }

    #[test]
    fn server_error_maps_to_retriable_dependency_unavailable() {
        let envelope = map_ollama_http_error(StatusCode::INTERNAL_SERVER_ERROR, b"oops");
        assert_eq!(envelope.code, ErrorCode::new("core", "dependency_unavailable"));
        assert_eq!(envelope.class, ErrorClass::Retriable);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let config = OllamaConfig {
            base_url: "   ".into(),
            model: "nomic-embed-text".into(),
            timeout_ms: 1_000,
        };
        let error = OllamaEmbedder::new(&config).unwrap_err();
        assert_eq!(error.code, ErrorCode::invalid_input());
    }

    #[test]
    fn endpoint_strips_trailing_slash() -> Result<()> {
        let config = OllamaConfig {
            base_url: "http://localhost:11434/".into(),
            model: "nomic-embed-text".into(),
            timeout_ms: 1_000,
        };
        let adapter = OllamaEmbedder::new(&config)?;
        assert_eq!(adapter.endpoint.as_ref(), "http://localhost:11434/api/embeddings");
        Ok(())
    }
}
