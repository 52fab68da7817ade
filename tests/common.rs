// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, scripted-backend resources and a frame-capturing sink
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `cadence_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use cadence_server::{
    config::environment::{BackendKind, ServerConfig},
    errors::StreamError,
    llm::ScriptedBackend,
    resources::ServerResources,
    streaming::{
        frames::ServerFrame,
        orchestrator::{SessionManager, SessionSettings},
        sink::{Transport, TransportSink},
    },
};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::mpsc;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // Check for TEST_LOG environment variable to control test logging level
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN, // Default to WARN for quiet tests
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Server configuration suitable for tests: echo backend, loopback host
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.http_host = "127.0.0.1".to_owned();
    config.backend.kind = BackendKind::Echo;
    config.cors_allowed_origins = vec!["*".to_owned()];
    config
}

/// Shared resources backed by `backend`
pub fn create_test_resources(backend: ScriptedBackend) -> Arc<ServerResources> {
    init_test_logging();
    Arc::new(ServerResources::with_backend(test_config(), Arc::new(backend)))
}

/// Session manager backed by `backend`
pub fn create_test_manager(backend: ScriptedBackend) -> SessionManager {
    init_test_logging();
    SessionManager::new(
        Arc::new(backend),
        SessionSettings {
            pause_poll_interval: Duration::from_millis(100),
        },
    )
}

/// Sink recording every frame it receives
pub struct CapturingSink {
    tx: mpsc::UnboundedSender<ServerFrame>,
    transport: Transport,
}

impl CapturingSink {
    /// Sink plus the receiver observing its frames
    pub fn new(transport: Transport) -> (Self, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, transport }, rx)
    }
}

impl TransportSink for CapturingSink {
    fn transport(&self) -> Transport {
        self.transport
    }

    fn send(&mut self, frame: ServerFrame) -> Result<(), StreamError> {
        self.tx
            .send(frame)
            .map_err(|_| StreamError::transport_write("capture receiver dropped"))
    }
}

/// Receive frames until `stop` matches one (inclusive) or the sender closes
pub async fn collect_until(
    rx: &mut mpsc::UnboundedReceiver<ServerFrame>,
    stop: impl Fn(&ServerFrame) -> bool,
) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        let done = stop(&frame);
        frames.push(frame);
        if done {
            break;
        }
    }
    frames
}

/// Drain everything the sender produces until it closes
pub async fn collect_all(rx: &mut mpsc::UnboundedReceiver<ServerFrame>) -> Vec<ServerFrame> {
    collect_until(rx, |_| false).await
}

/// Kinds of the given frames, in order
pub fn kinds(frames: &[ServerFrame]) -> Vec<&'static str> {
    frames.iter().map(ServerFrame::kind).collect()
}

/// Concatenated content of all content chunk frames
pub fn streamed_text(frames: &[ServerFrame]) -> String {
    frames
        .iter()
        .filter_map(|frame| match frame {
            ServerFrame::ContentChunk(payload) | ServerFrame::StreamChunk(payload) => {
                Some(payload.content.as_str())
            }
            _ => None,
        })
        .collect()
}
