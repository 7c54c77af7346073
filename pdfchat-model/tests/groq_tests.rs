//! HTTP contract tests for the Groq client against a local stub server.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pdfchat_model::{GroqClient, GroqConfig, Llm, LlmRequest, Message, ModelError};
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    auth: Arc<Mutex<Option<String>>>,
}

async fn spawn_server(router: Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server run");
    });

    (format!("http://{addr}/openai/v1"), handle)
}

async fn completions(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    *captured.auth.lock().await =
        headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
    *captured.body.lock().await = Some(body);

    Json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "llama3-8b-8192",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Nepal is in South Asia."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 52, "completion_tokens": 6, "total_tokens": 58}
    }))
}

fn client(base: &str, key: &str) -> GroqClient {
    GroqClient::new(GroqConfig::llama3(key).with_base_url(base)).unwrap()
}

#[tokio::test]
async fn chat_completion_round_trip() {
    let captured = Captured::default();
    let router = Router::new()
        .route("/openai/v1/chat/completions", post(completions))
        .with_state(captured.clone());
    let (base, handle) = spawn_server(router).await;

    let reply = client(&base, "gsk_test")
        .generate(LlmRequest::new(vec![
            Message::system("Answer from the documents."),
            Message::user("Where is Nepal?"),
        ]))
        .await
        .unwrap();

    assert_eq!(reply.text, "Nepal is in South Asia.");
    assert_eq!(reply.finish_reason.as_deref(), Some("stop"));
    assert_eq!(reply.usage.map(|u| u.completion_tokens), Some(6));

    assert_eq!(captured.auth.lock().await.as_deref(), Some("Bearer gsk_test"));
    let body = captured.body.lock().await.clone().expect("request body");
    assert_eq!(body["model"], "llama3-8b-8192");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Where is Nepal?");
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert!(body.get("max_tokens").is_none());

    handle.abort();
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"message": "Invalid API Key", "type": "invalid_request_error"}})),
            )
        }),
    );
    let (base, handle) = spawn_server(router).await;

    let err = client(&base, "gsk_wrong")
        .generate(LlmRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    match err {
        ModelError::ApiError { status, message, .. } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API Key");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn non_json_error_body_is_kept_verbatim() {
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let (base, handle) = spawn_server(router).await;

    let err = client(&base, "gsk_test")
        .generate(LlmRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::ApiError { status: 429, ref message, .. } if message == "slow down"));
    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/openai/v1"), "gsk_test")
        .generate(LlmRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::RequestError { .. }));
}
