//! Integration tests for the OpenAI backend over a mock HTTP server.

use thoughtmarks_ai::openai::{OpenAIBackend, OpenAIConfig};
use thoughtmarks_core::{CompletionOptions, EmbeddingBackend, Error, SuggestionBackend};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: String) -> OpenAIConfig {
    OpenAIConfig {
        base_url,
        api_key: Some("test-key".to_string()),
        embed_model: "test-embed".to_string(),
        chat_model: "test-chat".to_string(),
        embed_dimension: 4,
        embed_timeout_secs: 5,
        chat_timeout_secs: 5,
    }
}

#[tokio::test]
async fn embed_text_sends_auth_and_parses_vector() {
    let mock_server = MockServer::start().await;

    let embedding_response = serde_json::json!({
        "data": [
            {"embedding": [0.1, 0.2, 0.3, 0.4], "index": 0}
        ],
        "model": "test-embed",
        "usage": {"prompt_tokens": 2, "total_tokens": 2}
    });

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-embed",
            "input": "hello world",
            "encoding_format": "float"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&embedding_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let vector = backend.embed_text("hello world").await.unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3, 0.4]);
}

#[tokio::test]
async fn embed_text_surfaces_provider_error_envelope() {
    let mock_server = MockServer::start().await;

    let error_response = serde_json::json!({
        "error": {
            "message": "Rate limit reached",
            "type": "rate_limit_error",
            "code": "rate_limit_exceeded"
        }
    });

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_json(&error_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let err = backend.embed_text("hello").await.unwrap_err();
    match err {
        Error::Embedding(msg) => {
            assert!(msg.contains("429"));
            assert!(msg.contains("Rate limit reached"));
        }
        other => panic!("expected embedding error, got {:?}", other),
    }
}

#[tokio::test]
async fn embed_text_rejects_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let err = backend.embed_text("hello").await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
}

#[tokio::test]
async fn embed_text_rejects_empty_data_array() {
    let mock_server = MockServer::start().await;

    let empty_response = serde_json::json!({
        "data": [],
        "model": "test-embed",
        "usage": {"prompt_tokens": 0, "total_tokens": 0}
    });

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&empty_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let err = backend.embed_text("hello").await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
}

#[tokio::test]
async fn embed_text_times_out_as_error() {
    let mock_server = MockServer::start().await;

    let embedding_response = serde_json::json!({
        "data": [{"embedding": [0.1], "index": 0}],
        "model": "test-embed",
        "usage": {"prompt_tokens": 1, "total_tokens": 1}
    });

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&embedding_response)
                .set_delay(std::time::Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config(mock_server.uri());
    config.embed_timeout_secs = 1;
    let backend = OpenAIBackend::new(config).unwrap();

    let err = backend.embed_text("hello").await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
}

#[tokio::test]
async fn complete_json_sends_options_and_json_mode() {
    let mock_server = MockServer::start().await;

    let chat_response = serde_json::json!({
        "id": "chatcmpl-123",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "{\"suggestions\": []}"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-chat",
            "temperature": 0.7,
            "max_tokens": 2000,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": "be terse"},
                {"role": "user", "content": "categorize this"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&chat_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let opts = CompletionOptions {
        temperature: 0.7,
        max_tokens: Some(2000),
    };
    let content = backend
        .complete_json("be terse", "categorize this", opts)
        .await
        .unwrap();
    assert_eq!(content, "{\"suggestions\": []}");
}

#[tokio::test]
async fn complete_json_surfaces_provider_error_envelope() {
    let mock_server = MockServer::start().await;

    let error_response = serde_json::json!({
        "error": {
            "message": "Invalid API key",
            "type": "invalid_request_error",
            "code": "invalid_api_key"
        }
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(&error_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let err = backend
        .complete_json("system", "prompt", CompletionOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Suggestion(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("Invalid API key"));
        }
        other => panic!("expected suggestion error, got {:?}", other),
    }
}

#[tokio::test]
async fn complete_json_rejects_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OpenAIBackend::new(test_config(mock_server.uri())).unwrap();

    let err = backend
        .complete_json("system", "prompt", CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Suggestion(_)));
}
