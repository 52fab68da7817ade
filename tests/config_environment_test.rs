// ABOUTME: Integration tests for environment configuration and per-session options
// ABOUTME: Validates defaults, overrides, parse failures and option validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use cadence_server::config::environment::{BackendKind, ServerConfig};
use cadence_server::config::streaming::{
    ChunkSize, PreferencesUpdate, StreamingConfig, StreamingOptions, UxConfig, UxOptions,
};
use cadence_server::errors::{ErrorCode, StreamError};
use std::collections::HashMap;
use std::time::Duration;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    move |key| vars.get(key).cloned()
}

// ============================================================================
// ServerConfig
// ============================================================================

#[test]
fn test_defaults_without_variables() {
    let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();

    assert_eq!(config.http_port, 8081);
    assert_eq!(config.cors_allowed_origins, vec!["*".to_owned()]);
    assert_eq!(config.backend.kind, BackendKind::Echo);
    assert_eq!(config.stream.heartbeat_interval(), Duration::from_secs(15));
    assert_eq!(config.stream.heartbeat_timeout(), Duration::from_secs(30));
    assert_eq!(config.stream.session_idle_timeout_secs, 1800);
    assert_eq!(config.stream.pause_poll_interval(), Duration::from_millis(100));
    assert_eq!(config.stream.compression_threshold_bytes, 100);
}

#[test]
fn test_environment_overrides() {
    let config = ServerConfig::from_lookup(lookup_from(&[
        ("HTTP_HOST", "127.0.0.1"),
        ("HTTP_PORT", "9090"),
        ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ("STREAM_HEARTBEAT_INTERVAL_SECS", "5"),
        ("STREAM_HEARTBEAT_TIMEOUT_SECS", "12"),
        ("STREAM_COMPRESSION_THRESHOLD_BYTES", " 256 "),
        ("GENERATION_BACKEND", "openai-compatible"),
        ("LLM_MODEL", "llama3"),
        ("LLM_API_KEY", ""),
    ]))
    .unwrap();

    assert_eq!(config.http_host, "127.0.0.1");
    assert_eq!(config.http_port, 9090);
    assert_eq!(
        config.cors_allowed_origins,
        vec!["https://a.example".to_owned(), "https://b.example".to_owned()]
    );
    assert_eq!(config.stream.heartbeat_interval_secs, 5);
    assert_eq!(config.stream.heartbeat_timeout_secs, 12);
    assert_eq!(config.stream.compression_threshold_bytes, 256);
    assert_eq!(config.backend.kind, BackendKind::OpenAiCompatible);
    assert_eq!(config.backend.model, "llama3");
    assert!(config.backend.api_key.is_none());
}

#[test]
fn test_invalid_values_are_rejected() {
    let error = ServerConfig::from_lookup(lookup_from(&[("HTTP_PORT", "eighty")])).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert!(error.message.contains("HTTP_PORT"));

    let error =
        ServerConfig::from_lookup(lookup_from(&[("GENERATION_BACKEND", "magic")])).unwrap_err();
    assert!(error.message.contains("GENERATION_BACKEND"));
}

#[test]
fn test_summary_hides_api_key() {
    let config = ServerConfig::from_lookup(lookup_from(&[
        ("GENERATION_BACKEND", "openai"),
        ("LLM_API_KEY", "sk-secret"),
    ]))
    .unwrap();
    let summary = config.summary();
    assert!(summary.contains("openai_compatible"));
    assert!(!summary.contains("sk-secret"));
}

// ============================================================================
// Session options
// ============================================================================

#[test]
fn test_streaming_options_overlay_defaults() {
    let options: StreamingOptions = serde_json::from_str(
        r#"{"variableSpeed":false,"chunkSize":"auto","pauseMultiplier":1.5,"flushInterval":50}"#,
    )
    .unwrap();
    let config = StreamingConfig::default().apply(&options).unwrap();

    assert!(!config.variable_speed);
    assert!(config.semantic_chunking);
    assert_eq!(config.chunk_size, ChunkSize::Auto);
    assert!((config.pause_multiplier - 1.5).abs() < f64::EPSILON);
    assert_eq!(config.flush_interval_ms, 50);
}

#[test]
fn test_streaming_options_validation() {
    let cases = [
        StreamingOptions {
            chunk_size: Some(ChunkSize::Chars(5)),
            ..StreamingOptions::default()
        },
        StreamingOptions {
            speed_multiplier: Some(0.0),
            ..StreamingOptions::default()
        },
        StreamingOptions {
            pause_multiplier: Some(11.0),
            ..StreamingOptions::default()
        },
        StreamingOptions {
            buffer_size: Some(0),
            ..StreamingOptions::default()
        },
        StreamingOptions {
            flush_interval: Some(5000),
            ..StreamingOptions::default()
        },
    ];
    for options in cases {
        let result = StreamingConfig::default().apply(&options);
        assert!(
            matches!(result, Err(StreamError::InvalidConfig { .. })),
            "{options:?} should be rejected"
        );
    }
}

#[test]
fn test_preferences_update_keeps_unspecified_fields() {
    let update: PreferencesUpdate = serde_json::from_str(
        r#"{"uxConfig":{"showTypingIndicator":false},"streamingConfig":{"speedMultiplier":2}}"#,
    )
    .unwrap();
    let (streaming, ux) = update
        .apply(&StreamingConfig::default(), &UxConfig::default())
        .unwrap();

    assert!((streaming.speed_multiplier - 2.0).abs() < f64::EPSILON);
    assert!(streaming.contextual_pauses);
    assert!(!ux.show_typing_indicator);
    assert!(ux.show_progress);

    let unchanged = UxConfig::default().apply(&UxOptions::default());
    assert_eq!(unchanged, UxConfig::default());
}
