// ABOUTME: HTTP integration tests for the SSE stream, session control and health routes
// ABOUTME: Drives the full router in-process with a scripted generation backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use cadence_server::llm::ScriptedBackend;
use cadence_server::server;
use cadence_server::streaming::compression::decompress;
use cadence_server::streaming::{Codec, StartRequest, Transport};
use common::CapturingSink;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};
use std::time::Duration;

fn burst_body(prompt: &str) -> Value {
    json!({
        "prompt": prompt,
        "streamingConfig": { "variableSpeed": false },
    })
}

fn content_of(events: &[Value]) -> String {
    events
        .iter()
        .filter(|event| event["type"] == "content_chunk")
        .map(|event| event["content"].as_str().unwrap())
        .collect()
}

// ============================================================================
// POST /api/stream
// ============================================================================

#[tokio::test]
async fn test_post_stream_returns_event_stream() {
    let resources = common::create_test_resources(ScriptedBackend::echo());
    let prompt = "Hello there. This is `code()`. Done.";

    let response = AxumTestRequest::post("/api/stream")
        .json(&burst_body(prompt))
        .send(server::router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("content-type"), Some("text/event-stream"));
    assert_eq!(response.header("cache-control"), Some("no-cache"));
    assert!(response.header("x-session-id").is_some());
    assert!(response.header("content-encoding").is_none());

    let text = response.text();
    assert!(text.trim_end().ends_with("data: [DONE]"));

    let events: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    assert_eq!(content_of(&events), prompt);
    assert_eq!(events.last().unwrap()["type"], "stream_complete");
    assert!(events
        .iter()
        .all(|event| event["type"] != "stream_metadata"));
}

#[tokio::test]
async fn test_get_stream_with_query_prompt() {
    let resources = common::create_test_resources(ScriptedBackend::echo());

    let response = AxumTestRequest::get("/api/stream?prompt=Hi%20there")
        .send(server::router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(content_of(&response.sse_events()), "Hi there");
}

#[tokio::test]
async fn test_stream_body_is_gzip_encoded_when_accepted() {
    let resources = common::create_test_resources(ScriptedBackend::echo());
    let prompt = "Compressed streams still carry every word. ";

    let response = AxumTestRequest::post("/api/stream")
        .header("accept-encoding", "gzip, deflate")
        .json(&burst_body(prompt))
        .send(server::router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("content-encoding"), Some("gzip"));
    assert_eq!(response.header("vary"), Some("accept-encoding"));

    let decoded = decompress(&response.bytes(), Codec::Gzip).unwrap();
    let text = String::from_utf8(decoded).unwrap();
    assert!(text.contains("data: [DONE]"));
    assert!(text.contains("\"type\":\"stream_complete\""));
}

#[tokio::test]
async fn test_compression_disabled_ignores_accept_encoding() {
    let resources = common::create_test_resources(ScriptedBackend::echo());
    let body = json!({
        "prompt": "No compression please.",
        "streamingConfig": { "variableSpeed": false, "compression": false },
    });

    let response = AxumTestRequest::post("/api/stream")
        .header("accept-encoding", "br, gzip")
        .json(&body)
        .send(server::router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.header("content-encoding").is_none());
}

#[tokio::test]
async fn test_source_failure_is_streamed_as_error_event() {
    let backend = ScriptedBackend::fixed(["partial "]).failing_after(1);
    let resources = common::create_test_resources(backend);

    let response = AxumTestRequest::post("/api/stream")
        .json(&burst_body("fail please"))
        .send(server::router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let events = response.sse_events();
    let last = events.last().unwrap();
    assert_eq!(last["type"], "error");
    assert_eq!(last["code"], "EXTERNAL_SERVICE_ERROR");
    assert!(last["timestamp"].is_string());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let resources = common::create_test_resources(ScriptedBackend::echo());

    let response = AxumTestRequest::post("/api/stream")
        .json(&json!({ "prompt": "  " }))
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let response = AxumTestRequest::post("/api/stream")
        .json(&json!({ "prompt": "ok", "streamingConfig": { "chunkSize": 3 } }))
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("chunkSize"));
}

// ============================================================================
// Session control
// ============================================================================

#[tokio::test]
async fn test_control_unknown_session_returns_not_found() {
    let resources = common::create_test_resources(ScriptedBackend::echo());

    for path in [
        "/api/stream/no-such-session/pause",
        "/api/stream/no-such-session/resume",
        "/api/stream/no-such-session/stop",
    ] {
        let response = AxumTestRequest::post(path)
            .send(server::router(&resources))
            .await;
        assert_eq!(response.status(), 404, "{path}");
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
    }

    let response = AxumTestRequest::get("/api/stream/no-such-session")
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_control_running_session() {
    let backend = ScriptedBackend::fixed(["slow ", "answer"]).with_delay(Duration::from_secs(60));
    let resources = common::create_test_resources(backend);
    let (sink, _frames) = CapturingSink::new(Transport::Sse);
    let session_id = resources
        .sessions
        .start(StartRequest::new("control me"), Box::new(sink))
        .unwrap();

    let response = AxumTestRequest::post(&format!("/api/stream/{session_id}/pause"))
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "paused");
    assert_eq!(body["sessionId"], session_id.as_str());

    let response = AxumTestRequest::patch(&format!("/api/stream/{session_id}/preferences"))
        .json(&json!({
            "streamingConfig": { "pauseMultiplier": 2.0 },
            "uxConfig": { "showProgress": false },
        }))
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["streamingConfig"]["pauseMultiplier"], 2.0);
    assert_eq!(body["uxConfig"]["showProgress"], false);

    let response = AxumTestRequest::get(&format!("/api/stream/{session_id}"))
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "paused");
    assert_eq!(body["transport"], "sse");

    let response = AxumTestRequest::post(&format!("/api/stream/{session_id}/stop"))
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "stopped");
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let resources = common::create_test_resources(ScriptedBackend::echo());

    let response = AxumTestRequest::get("/health")
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["activeSessions"], 0);
    assert!(body["timestamp"].is_string());

    let response = AxumTestRequest::get("/ready")
        .send(server::router(&resources))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["backend"], "echo");
}
