// HTTP embedding adapter integration tests.
#![allow(missing_docs)]

use javalens_adapters::{OllamaConfig, OllamaEmbedder};
use javalens_ports::EmbeddingPort;
use javalens_shared::{ErrorClass, ErrorCode, RequestContext, Result};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OllamaConfig {
    OllamaConfig {
        base_url: server.uri().into(),
        model: "nomic-embed-text".into(),
        timeout_ms: 5_000,
    }
}

#[tokio::test]
async fn embed_posts_model_and_prompt() -> Result<()> {
    let server = MockServer::start().await;
    let response = ResponseTemplate::new(200).set_body_json(json!({
        "embedding": [0.1, 0.2, 0.3]
    }));

    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_json(json!({
            "model": "nomic-embed-text",
            "prompt": "public class User {}"
        })))
        .respond_with(response)
        .mount(&server)
        .await;

    let adapter = OllamaEmbedder::new(&config_for(&server))?;
    let ctx = RequestContext::new_request();
    let embedding = adapter.embed(&ctx, "public class User {}".into()).await?;
    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    Ok(())
}

#[tokio::test]
async fn server_error_is_retriable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "model runner crashed"
        })))
        .mount(&server)
        .await;

    let adapter = OllamaEmbedder::new(&config_for(&server))?;
    let ctx = RequestContext::new_request();
    let error = adapter.embed(&ctx, "hello".into()).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::new("core", "dependency_unavailable"));
    assert_eq!(error.class, ErrorClass::Retriable);
    assert_eq!(error.metadata.get("status").map(String::as_str), Some("500"));
    Ok(())
}

#[tokio::test]
async fn unknown_model_is_non_retriable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "model \"missing\" not found"
        })))
        .mount(&server)
        .await;

    let adapter = OllamaEmbedder::new(&config_for(&server))?;
    let ctx = RequestContext::new_request();
    let error = adapter.embed(&ctx, "hello".into()).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::invalid_input());
    assert_eq!(error.class, ErrorClass::NonRetriable);
    Ok(())
}

#[tokio::test]
async fn empty_embedding_in_response_is_rejected() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": []
        })))
        .mount(&server)
        .await;

    let adapter = OllamaEmbedder::new(&config_for(&server))?;
    let ctx = RequestContext::new_request();
    let error = adapter.embed(&ctx, "hello".into()).await.unwrap_err();
    assert_eq!(
        error.code,
        ErrorCode::new("embedding", "ollama_invalid_response")
    );
    Ok(())
}

#[tokio::test]
async fn cancelled_context_short_circuits() -> Result<()> {
    let server = MockServer::start().await;
    let adapter = OllamaEmbedder::new(&config_for(&server))?;
    let ctx = RequestContext::new_request();
    ctx.cancel();

    let error = adapter.embed(&ctx, "hello".into()).await.unwrap_err();
    assert!(error.is_cancelled());
    Ok(())
}
