//! Integration tests for the HTTP API
//!
//! Requests go through the axum router in-process with `oneshot`.

mod common;

use alfred_engine::llm::LLMError;
use alfred_engine::server::{router, AppState};
use alfred_engine::tools::Tool;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

fn app(provider: ScriptedProvider, tools: Vec<Arc<dyn Tool>>) -> (Router, Arc<alfred_engine::agent::AgentCore>) {
    let agent = Arc::new(agent(Arc::new(provider), tools));
    (router(AppState::new(Arc::clone(&agent))), agent)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_chat_returns_answer_and_history() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider::with_fallback(
        vec![
            calls_tools(vec![tool_call("c1", "weather_info", json!({"city": "Paris"}))]),
            answers("It's 15°C and cloudy in Paris."),
        ],
        Fallback::Echo,
    );
    let weather: Arc<dyn Tool> = Arc::new(FakeTool::new("weather_info", "15°C, cloudy", &log));
    let (app, _) = app(provider, vec![weather]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({"session_id": "web", "message": "What's the weather in Paris?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "web");
    assert_eq!(body["response"], "It's 15°C and cloudy in Paris.");
    assert_eq!(
        body["history"],
        json!([["What's the weather in Paris?", "It's 15°C and cloudy in Paris."]])
    );

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({"session_id": "web", "message": "Thanks"})),
    )
    .await;
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
    assert_eq!(body["history"][1], json!(["Thanks", "echo: Thanks"]));
}

#[tokio::test]
async fn test_chat_without_session_gets_one_assigned() {
    let (app, agent) = app(ScriptedProvider::echo(), vec![]);

    let (status, body) = send(&app, Method::POST, "/api/chat", Some(json!({"message": "Hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    let session_id = body["session_id"].as_str().unwrap();
    assert!(!session_id.is_empty());
    assert_eq!(agent.sessions().sessions(), vec![session_id.to_string()]);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let (app, agent) = app(ScriptedProvider::echo(), vec![]);

    let (status, body) = send(&app, Method::POST, "/api/chat", Some(json!({"message": "  "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
    assert!(agent.sessions().is_empty());
}

#[tokio::test]
async fn test_model_failure_is_bad_gateway() {
    let provider = ScriptedProvider::new(vec![Err(LLMError::ProviderUnavailable(
        "Cannot connect to Ollama".into(),
    ))]);
    let (app, _) = app(provider, vec![]);

    let (status, body) = send(&app, Method::POST, "/api/chat", Some(json!({"message": "Hi"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("Cannot connect"));
    assert!(body["hint"].as_str().is_some());
}

#[tokio::test]
async fn test_tool_failure_is_server_error() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider::new(vec![calls_tools(vec![tool_call(
        "c1",
        "hub_stats",
        json!({"author": "facebook"}),
    )])]);
    let hub: Arc<dyn Tool> = Arc::new(FakeTool::failing("hub_stats", "hub down", &log));
    let (app, _) = app(provider, vec![hub]);

    let (status, body) = send(&app, Method::POST, "/api/chat", Some(json!({"message": "Stats?"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("hub_stats"));
}

#[tokio::test]
async fn test_transcript_and_reset() {
    let (app, _) = app(ScriptedProvider::echo(), vec![]);

    send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({"session_id": "s1", "message": "Hello"})),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/sessions/s1/transcript", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "s1");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[2]["content"], "echo: Hello");

    let (status, _) = send(&app, Method::DELETE, "/api/sessions/s1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, "/api/sessions/s1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/api/sessions/s1/transcript", None).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tools_endpoint_lists_bound_tools() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(FakeTool::new("guest_info_retriever", "", &log)),
        Arc::new(FakeTool::new("web_search", "", &log)),
    ];
    let (app, _) = app(ScriptedProvider::echo(), tools);

    let (status, body) = send(&app, Method::GET, "/api/tools", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["guest_info_retriever", "web_search"]);
}

#[tokio::test]
async fn test_status_endpoint() {
    let (app, _) = app(ScriptedProvider::echo(), vec![]);

    let (status, body) = send(&app, Method::GET, "/api/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["model"], "scripted-1");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_index_serves_widget() {
    let (app, _) = app(ScriptedProvider::echo(), vec![]);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/api/chat"));
}
