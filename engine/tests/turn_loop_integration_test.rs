//! Integration tests for the turn loop
//!
//! These tests drive `AgentCore::submit` with a scripted model and fake tools.
//! No network access is needed.

mod common;

use alfred_engine::agent::TurnLimits;
use alfred_engine::llm::{LLMError, MessageRole};
use alfred_engine::tools::Tool;
use common::*;
use sdk::errors::EngineError;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn roles(messages: &[alfred_engine::llm::Message]) -> Vec<MessageRole> {
    messages.iter().map(|m| m.role).collect()
}

#[tokio::test]
async fn test_weather_in_paris_scenario() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::new(vec![
        calls_tools(vec![tool_call("call_1", "weather_info", json!({"city": "Paris"}))]),
        answers("It's 15°C and cloudy in Paris."),
    ]));
    let weather: Arc<dyn Tool> = Arc::new(FakeTool::new("weather_info", "15°C, cloudy", &log));
    let agent = agent(Arc::clone(&provider), vec![weather]);

    let result = agent
        .submit("s1", "What's the weather in Paris?")
        .await
        .unwrap();

    assert_eq!(result.answer, "It's 15°C and cloudy in Paris.");
    assert_eq!(result.rounds, 1);
    assert_eq!(result.session_id, "s1");
    assert_eq!(
        roles(&result.transcript),
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant,
        ]
    );

    let tool_msg = &result.transcript[3];
    assert_eq!(tool_msg.content, "15°C, cloudy");
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(tool_msg.name.as_deref(), Some("weather_info"));

    assert_eq!(*log.lock().unwrap(), vec![r#"weather_info({"city":"Paris"})"#]);

    // The model saw the whole history each time, with the tool bound
    assert_eq!(provider.calls(), vec![(2, 1), (4, 1)]);
}

#[tokio::test]
async fn test_loop_terminates_after_requested_rounds() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::new(vec![
        calls_tools(vec![tool_call("c1", "web_search", json!({"query": "gala"}))]),
        calls_tools(vec![tool_call("c2", "web_search", json!({"query": "dress code"}))]),
        calls_tools(vec![tool_call("c3", "web_search", json!({"query": "menu"}))]),
        answers("Black tie, sir."),
    ]));
    let search: Arc<dyn Tool> = Arc::new(FakeTool::new("web_search", "result", &log));
    let agent = agent(Arc::clone(&provider), vec![search]);

    let result = agent.submit("s1", "Plan the gala").await.unwrap();

    assert_eq!(result.rounds, 3);
    assert_eq!(result.answer, "Black tie, sir.");
    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(provider.calls().len(), 4);
}

#[tokio::test]
async fn test_multiple_tool_calls_keep_request_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::new(vec![
        calls_tools(vec![
            tool_call("a", "slow_tool", json!({})),
            tool_call("b", "fast_tool", json!({})),
        ]),
        answers("done"),
    ]));
    let slow: Arc<dyn Tool> = Arc::new(
        FakeTool::new("slow_tool", "result A", &log).with_delay(Duration::from_millis(50)),
    );
    let fast: Arc<dyn Tool> = Arc::new(FakeTool::new("fast_tool", "result B", &log));
    let agent = agent(provider, vec![slow, fast]);

    let result = agent.submit("s1", "both please").await.unwrap();

    let tool_results: Vec<(&str, &str)> = result
        .transcript
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .map(|m| (m.tool_call_id.as_deref().unwrap(), m.content.as_str()))
        .collect();
    assert_eq!(tool_results, vec![("a", "result A"), ("b", "result B")]);
    assert_eq!(*log.lock().unwrap(), vec!["slow_tool({})", "fast_tool({})"]);
}

#[tokio::test]
async fn test_system_prompt_injected_exactly_once() {
    let provider = Arc::new(ScriptedProvider::echo());
    let agent = agent(provider, vec![]);

    let first = agent.submit("s1", "hello").await.unwrap();
    assert_eq!(first.transcript[0].role, MessageRole::System);
    assert_eq!(first.transcript[0].content, SYSTEM_PROMPT);
    assert_eq!(first.transcript[1].content, "hello");

    let second = agent.submit("s1", "again").await.unwrap();
    let systems = second
        .transcript
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .count();
    assert_eq!(systems, 1);
    assert_eq!(second.answer, "echo: again");
}

#[tokio::test]
async fn test_direct_answer_grows_transcript_by_two() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::echo());
    let tool: Arc<dyn Tool> = Arc::new(FakeTool::new("weather_info", "unused", &log));
    let agent = agent(provider, vec![tool]);

    let first = agent.submit("s1", "Good evening").await.unwrap();
    // System prompt is added once on the first exchange
    assert_eq!(first.transcript.len(), 3);
    assert_eq!(first.rounds, 0);

    let second = agent.submit("s1", "Thank you").await.unwrap();
    assert_eq!(second.transcript.len(), 5);
    assert_eq!(
        roles(&second.transcript[3..]),
        vec![MessageRole::User, MessageRole::Assistant]
    );
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let provider = Arc::new(ScriptedProvider::echo());
    let agent = agent(provider, vec![]);

    agent.submit("s1", "one").await.unwrap();
    agent.submit("s1", "two").await.unwrap();
    let other = agent.submit("s2", "three").await.unwrap();

    assert_eq!(other.transcript.len(), 3);
    assert_eq!(other.transcript[0].role, MessageRole::System);
    assert_eq!(agent.sessions().transcript("s1").await.len(), 5);
    assert_eq!(agent.sessions().sessions(), vec!["s1", "s2"]);
}

#[tokio::test]
async fn test_tool_failure_propagates_and_keeps_partial_state() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::with_fallback(
        vec![calls_tools(vec![tool_call(
            "c1",
            "guest_info_retriever",
            json!({"query": "Tesla"}),
        )])],
        Fallback::Echo,
    ));
    let broken: Arc<dyn Tool> =
        Arc::new(FakeTool::failing("guest_info_retriever", "dataset offline", &log));
    let agent = agent(provider, vec![broken]);

    let err = agent.submit("s1", "Who is Tesla?").await.unwrap_err();
    match err {
        EngineError::ToolInvocation { tool, message } => {
            assert_eq!(tool, "guest_info_retriever");
            assert!(message.contains("dataset offline"));
        }
        other => panic!("Expected ToolInvocation, got: {:?}", other),
    }

    // No rollback: system, user and the tool-call request stay
    let transcript = agent.sessions().transcript("s1").await;
    assert_eq!(
        roles(&transcript),
        vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
    );
    assert!(transcript[2].has_tool_calls());

    // The next turn continues from the partial state
    let next = agent.submit("s1", "Never mind").await.unwrap();
    assert_eq!(next.transcript.len(), 5);
    assert_eq!(next.transcript[3].content, "Never mind");
}

#[tokio::test]
async fn test_model_failure_propagates() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(
        LLMError::ProviderUnavailable("connection refused".into()),
    )]));
    let agent = agent(provider, vec![]);

    let err = agent.submit("s1", "hello").await.unwrap_err();
    assert!(matches!(err, EngineError::ModelService(ref m) if m.contains("connection refused")));

    let transcript = agent.sessions().transcript("s1").await;
    assert_eq!(
        roles(&transcript),
        vec![MessageRole::System, MessageRole::User]
    );
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() {
    let provider = Arc::new(ScriptedProvider::new(vec![calls_tools(vec![tool_call(
        "c1",
        "summon_batmobile",
        json!({}),
    )])]));
    let agent = agent(provider, vec![]);

    let err = agent.submit("s1", "Get the car").await.unwrap_err();
    assert!(matches!(err, EngineError::ToolNotFound(ref n) if n == "summon_batmobile"));
}

#[tokio::test]
async fn test_max_rounds_guard() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::with_fallback(
        vec![],
        Fallback::CallTool("web_search".into()),
    ));
    let search: Arc<dyn Tool> = Arc::new(FakeTool::new("web_search", "more", &log));
    let agent = agent_with(
        provider,
        vec![search],
        TurnLimits {
            max_rounds: 2,
            ..TurnLimits::default()
        },
    );

    let err = agent.submit("s1", "Search forever").await.unwrap_err();
    assert!(matches!(err, EngineError::MaxIterationsExceeded));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_oversized_tool_result_fails_turn() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::new(vec![calls_tools(vec![tool_call(
        "c1",
        "web_search",
        json!({}),
    )])]));
    let search: Arc<dyn Tool> = Arc::new(FakeTool::new("web_search", &"x".repeat(64), &log));
    let agent = agent_with(
        provider,
        vec![search],
        TurnLimits {
            max_result_bytes: 16,
            ..TurnLimits::default()
        },
    );

    let err = agent.submit("s1", "Big").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::ResultSizeExceeded { size: 64, limit: 16 }
    ));
}

#[tokio::test]
async fn test_concurrent_turns_on_one_session_serialize() {
    let provider = Arc::new(ScriptedProvider::echo());
    let agent = Arc::new(agent(provider, vec![]));

    let a = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.submit("s1", "first").await })
    };
    let b = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.submit("s1", "second").await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let transcript = agent.sessions().transcript("s1").await;
    assert_eq!(
        roles(&transcript),
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
        ]
    );
    // Each answer directly follows its own question
    assert_eq!(
        transcript[2].content,
        format!("echo: {}", transcript[1].content)
    );
    assert_eq!(
        transcript[4].content,
        format!("echo: {}", transcript[3].content)
    );
}

#[tokio::test]
async fn test_reset_starts_fresh_conversation() {
    let provider = Arc::new(ScriptedProvider::echo());
    let agent = agent(provider, vec![]);

    agent.submit("s1", "hello").await.unwrap();
    assert!(agent.sessions().reset("s1").await);

    let result = agent.submit("s1", "hello again").await.unwrap();
    assert_eq!(result.transcript.len(), 3);
    assert_eq!(result.transcript[0].role, MessageRole::System);
}
