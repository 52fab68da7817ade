// ABOUTME: WebSocket transport for bidirectional streaming sessions
// ABOUTME: Parses client control messages, starts sessions and relays frames per connection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

// NOTE: `.clone()` calls on senders and ids hand ownership to spawned tasks
// and session sinks.

//! # WebSocket Transport
//!
//! One connection can run several sessions. Clients send JSON messages tagged
//! by `type`; the server answers with [`ServerFrame`]s. Chunk frames travel as
//! `stream_chunk`, compressed with the codec negotiated at upgrade time.

/// Live connection tracking and heartbeat
pub mod registry;
/// Session sink for a connection
pub mod sink;

pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, HeartbeatReport};
pub use sink::WebSocketSink;

use crate::config::streaming::PreferencesUpdate;
use crate::errors::{ErrorCode, StreamError};
use crate::streaming::compression::{negotiate, Codec};
use crate::streaming::frames::{
    ConnectionPayload, ControlKind, PongPayload, PreferencesPayload, ServerFrame,
};
use crate::streaming::orchestrator::{SessionManager, StartRequest};
use crate::streaming::session::SessionId;
use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How long a terminated connection may take to flush its final frames
const TERMINATION_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Messages a client may send
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new session on this connection
    StartStream(StartRequest),
    /// Pause a session
    PauseStream {
        /// Target session
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    /// Resume a session
    ResumeStream {
        /// Target session
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    /// Stop a session
    StopStream {
        /// Target session
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    /// Change preferences of a running session
    UpdatePreferences {
        /// Target session
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        /// New options
        #[serde(flatten)]
        update: PreferencesUpdate,
    },
    /// Application-level liveness probe
    Ping,
}

/// Accepts WebSocket connections and dispatches their messages
#[derive(Clone)]
pub struct WebSocketManager {
    sessions: SessionManager,
    registry: ConnectionRegistry,
    compression_threshold: usize,
}

impl WebSocketManager {
    /// Manager sharing the session map and connection registry
    #[must_use]
    pub const fn new(
        sessions: SessionManager,
        registry: ConnectionRegistry,
        compression_threshold: usize,
    ) -> Self {
        Self {
            sessions,
            registry,
            compression_threshold,
        }
    }

    /// Connection registry
    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Serve one upgraded connection until it closes
    pub async fn handle_connection(&self, ws: WebSocket, capabilities: Vec<Codec>) {
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (handle, mut rx) = ConnectionHandle::new(negotiate(&capabilities));
        self.registry.register(&handle);

        // Forward queued messages to the socket
        let mut ws_send_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if ws_tx.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        Self::send_frame(
            &handle.tx,
            &ServerFrame::ConnectionEstablished(ConnectionPayload {
                connection_id: handle.id.clone(),
                compression: handle.codec,
                timestamp: Utc::now(),
            }),
        );

        let reason = loop {
            tokio::select! {
                () = handle.close.notified() => break "terminated",
                message = ws_rx.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_text(&handle, &text),
                    Some(Ok(Message::Pong(_) | Message::Ping(_))) => {
                        self.registry.mark_alive(&handle.id);
                    }
                    Some(Ok(Message::Binary(_))) => Self::send_error(
                        &handle.tx,
                        None,
                        &StreamError::invalid_control("binary messages are not supported"),
                    ),
                    Some(Ok(Message::Close(_))) | None => break "client_closed",
                    Some(Err(e)) => {
                        debug!(connection_id = %handle.id, error = %e, "WebSocket read failed");
                        break "read_error";
                    }
                },
            }
        };

        self.registry.unregister(&handle.id, reason);
        // a heartbeat termination queued an error frame and a close
        if reason != "terminated"
            || timeout(TERMINATION_FLUSH_TIMEOUT, &mut ws_send_task)
                .await
                .is_err()
        {
            ws_send_task.abort();
        }
    }

    /// Dispatch one client text message
    fn handle_text(&self, handle: &ConnectionHandle, text: &str) {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                let error = StreamError::invalid_control(format!("Invalid message format: {e}"));
                Self::send_error(&handle.tx, None, &error);
                return;
            }
        };

        match message {
            ClientMessage::StartStream(request) => self.start_stream(handle, request),
            ClientMessage::PauseStream { session_id } => {
                self.control(handle, session_id, ControlKind::Paused);
            }
            ClientMessage::ResumeStream { session_id } => {
                self.control(handle, session_id, ControlKind::Resumed);
            }
            ClientMessage::StopStream { session_id } => {
                self.control(handle, session_id, ControlKind::Stopped);
            }
            ClientMessage::UpdatePreferences { session_id, update } => {
                if !self.registry.owns_session(&handle.id, &session_id) {
                    let error = StreamError::session_not_found(session_id.clone());
                    Self::send_error(&handle.tx, Some(session_id), &error);
                    return;
                }
                match self.sessions.update_preferences(&session_id, &update) {
                    Ok(snapshot) => Self::send_frame(
                        &handle.tx,
                        &ServerFrame::PreferencesUpdated(PreferencesPayload {
                            session_id,
                            streaming_config: snapshot.streaming_config,
                            ux_config: snapshot.ux_config,
                        }),
                    ),
                    Err(e) => Self::send_error(&handle.tx, Some(session_id), &e),
                }
            }
            ClientMessage::Ping => {
                self.registry.mark_alive(&handle.id);
                Self::send_frame(
                    &handle.tx,
                    &ServerFrame::Pong(PongPayload {
                        timestamp: Utc::now(),
                    }),
                );
            }
        }
    }

    fn start_stream(&self, handle: &ConnectionHandle, mut request: StartRequest) {
        let codec = if request.streaming.compression.unwrap_or(true) {
            handle.codec
        } else {
            Codec::None
        };
        request.connection_id = Some(handle.id.clone());
        let sink = WebSocketSink::new(handle.tx.clone(), codec, self.compression_threshold);

        match self.sessions.start(request, Box::new(sink)) {
            Ok(session_id) => {
                self.registry.attach_session(&handle.id, &session_id);
            }
            Err(e) => {
                warn!(connection_id = %handle.id, error = %e, "Rejected start_stream");
                Self::send_frame(&handle.tx, &ServerFrame::error(None, e.code, e.message));
            }
        }
    }

    /// Apply a control action to a session this connection owns
    ///
    /// Sessions of other connections and SSE sessions are reported as not found.
    fn control(&self, handle: &ConnectionHandle, session_id: SessionId, kind: ControlKind) {
        if !self.registry.owns_session(&handle.id, &session_id) {
            let error = StreamError::session_not_found(session_id.clone());
            Self::send_error(&handle.tx, Some(session_id), &error);
            return;
        }
        let result = match kind {
            ControlKind::Paused => self.sessions.pause(&session_id),
            ControlKind::Resumed => self.sessions.resume(&session_id),
            ControlKind::Stopped => self.sessions.stop(&session_id),
        };
        match result {
            Ok(_) => Self::send_frame(&handle.tx, &ServerFrame::control(kind, session_id)),
            Err(e) => Self::send_error(&handle.tx, Some(session_id), &e),
        }
    }

    fn send_error(
        tx: &mpsc::UnboundedSender<Message>,
        session_id: Option<SessionId>,
        error: &StreamError,
    ) {
        let code: ErrorCode = error.code();
        Self::send_frame(tx, &ServerFrame::error(session_id, code, error.to_string()));
    }

    fn send_frame(tx: &mpsc::UnboundedSender<Message>, frame: &ServerFrame) {
        let Some(message) = sink::frame_message(frame) else {
            return;
        };
        if let Err(e) = tx.send(message) {
            debug!(frame = frame.kind(), error = %e, "Connection gone before frame was sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_client_messages() {
        let start: ClientMessage = serde_json::from_str(
            r#"{"type":"start_stream","prompt":"hi","streamingConfig":{"variableSpeed":false}}"#,
        )
        .unwrap();
        let ClientMessage::StartStream(request) = start else {
            panic!("expected start_stream");
        };
        assert_eq!(request.prompt, "hi");
        assert_eq!(request.streaming.variable_speed, Some(false));
        assert!(request.connection_id.is_none());

        let pause: ClientMessage =
            serde_json::from_str(r#"{"type":"pause_stream","sessionId":"s1"}"#).unwrap();
        assert!(matches!(pause, ClientMessage::PauseStream { session_id } if session_id == "s1"));

        let update: ClientMessage = serde_json::from_str(
            r#"{"type":"update_preferences","sessionId":"s1","uxConfig":{"showProgress":false}}"#,
        )
        .unwrap();
        let ClientMessage::UpdatePreferences { update, .. } = update else {
            panic!("expected update_preferences");
        };
        assert_eq!(update.ux_config.unwrap().show_progress, Some(false));

        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).unwrap(),
            ClientMessage::Ping
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }
}
