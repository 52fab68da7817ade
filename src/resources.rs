// ABOUTME: Centralized resource container shared by routes and background tasks
// ABOUTME: Builds the backend, session manager, connection registry and WebSocket manager once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Server Resources
//!
//! Every route receives `Arc<ServerResources>` as its state instead of
//! constructing managers of its own.

// NOTE: `.clone()` calls here share `Arc`-backed managers between the
// registry, the WebSocket manager and route state.

use crate::config::environment::ServerConfig;
use crate::errors::AppResult;
use crate::llm::{backend_from_config, GenerationBackend};
use crate::streaming::orchestrator::{SessionManager, SessionSettings};
use crate::websocket::{ConnectionRegistry, WebSocketManager};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared server state
#[derive(Clone)]
pub struct ServerResources {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Generation backend
    pub backend: Arc<dyn GenerationBackend>,
    /// Live sessions
    pub sessions: SessionManager,
    /// Live WebSocket connections
    pub connections: ConnectionRegistry,
    /// WebSocket dispatcher
    pub websocket_manager: Arc<WebSocketManager>,
    /// Process start time
    pub started_at: DateTime<Utc>,
}

impl ServerResources {
    /// Resources using the backend named by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be constructed
    pub fn new(config: ServerConfig) -> AppResult<Self> {
        let backend = backend_from_config(&config.backend)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Resources using an explicit backend
    #[must_use]
    pub fn with_backend(config: ServerConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        let sessions = SessionManager::new(
            Arc::clone(&backend),
            SessionSettings::from(&config.stream),
        );
        let connections = ConnectionRegistry::new(sessions.clone(), &config.stream);
        let websocket_manager = Arc::new(WebSocketManager::new(
            sessions.clone(),
            connections.clone(),
            config.stream.compression_threshold_bytes,
        ));

        Self {
            config: Arc::new(config),
            backend,
            sessions,
            connections,
            websocket_manager,
            started_at: Utc::now(),
        }
    }
}
