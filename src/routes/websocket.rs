// ABOUTME: WebSocket route handler upgrading connections for bidirectional streaming
// ABOUTME: Reads compression capabilities from the query string or Accept-Encoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use crate::streaming::compression::parse_accept_encoding;
use crate::websocket::WebSocketManager;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::ACCEPT_ENCODING, HeaderMap},
    response::IntoResponse,
    routing::get,
    Router,
};
use cadence_core::constants::endpoints;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info};

/// Query string of `GET /ws`
#[derive(Debug, Default, Deserialize)]
pub struct WebSocketQuery {
    /// Comma-separated codecs, e.g. `br,gzip`
    pub compression: Option<String>,
}

/// WebSocket routes implementation
pub struct WebSocketRoutes;

impl WebSocketRoutes {
    /// Create the WebSocket route with injected `WebSocketManager`
    pub fn routes(manager: Arc<WebSocketManager>) -> Router {
        Router::new()
            .route(endpoints::WEBSOCKET, get(Self::handle_websocket))
            .with_state(manager)
    }

    /// Upgrade the connection and hand it to the manager
    async fn handle_websocket(
        ws: WebSocketUpgrade,
        State(manager): State<Arc<WebSocketManager>>,
        Query(query): Query<WebSocketQuery>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        info!("New WebSocket connection request");

        let capabilities = query
            .compression
            .as_deref()
            .or_else(|| {
                headers
                    .get(ACCEPT_ENCODING)
                    .and_then(|value| value.to_str().ok())
            })
            .map(parse_accept_encoding)
            .unwrap_or_default();

        // Yield to scheduler to allow other tasks to progress during upgrade
        task::yield_now().await;

        ws.on_upgrade(move |socket: WebSocket| async move {
            debug!(?capabilities, "WebSocket upgraded, delegating to manager");
            manager.handle_connection(socket, capabilities).await;
        })
    }
}
