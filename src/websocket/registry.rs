// ABOUTME: Registry of live WebSocket connections with heartbeat supervision
// ABOUTME: Tracks liveness, negotiated codec and owned sessions; dead connections stop their sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Connection Registry
//!
//! Every heartbeat interval each connection is either pinged or, once the
//! heartbeat timeout has passed without a pong, terminated. Termination tells
//! the client why, signals the connection task to close and stops every
//! session the connection still owns.
//!
//! A connection owns a session from `attach_session` until the session ends;
//! finished sessions drop out of the owner's set on their own.

use super::sink::frame_message;
use crate::config::environment::StreamRuntimeConfig;
use crate::errors::StreamError;
use crate::logging::StreamLogger;
use crate::streaming::compression::Codec;
use crate::streaming::frames::ServerFrame;
use crate::streaming::orchestrator::SessionManager;
use crate::streaming::session::SessionId;
use axum::extract::ws::Message;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

/// Opaque connection identifier
pub type ConnectionId = String;

/// What a connection task hands to the registry
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection id
    pub id: ConnectionId,
    /// Outbound messages, drained by the connection's writer task
    pub tx: mpsc::UnboundedSender<Message>,
    /// Negotiated codec
    pub codec: Codec,
    /// Notified when the connection must close
    pub close: Arc<Notify>,
}

impl ConnectionHandle {
    /// New handle with a fresh id, plus the receiver for its outbound messages
    #[must_use]
    pub fn new(codec: Codec) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4().to_string(),
            tx,
            codec,
            close: Arc::new(Notify::new()),
        };
        (handle, rx)
    }
}

#[derive(Debug)]
struct ConnectionEntry {
    tx: mpsc::UnboundedSender<Message>,
    codec: Codec,
    close: Arc<Notify>,
    is_alive: bool,
    last_ping_at: Option<Instant>,
    last_pong_at: Instant,
    sessions: HashSet<SessionId>,
}

/// Outcome of one heartbeat pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Connections pinged
    pub pinged: usize,
    /// Connections terminated for silence
    pub terminated: Vec<ConnectionId>,
}

/// Live WebSocket connections
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, ConnectionEntry>>,
    sessions: SessionManager,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
}

impl ConnectionRegistry {
    /// Registry stopping sessions through `sessions`
    #[must_use]
    pub fn new(sessions: SessionManager, config: &StreamRuntimeConfig) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            sessions,
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }

    /// Track a connection; it counts as alive from now on
    pub fn register(&self, handle: &ConnectionHandle) {
        self.connections.insert(
            handle.id.clone(),
            ConnectionEntry {
                tx: handle.tx.clone(),
                codec: handle.codec,
                close: Arc::clone(&handle.close),
                is_alive: true,
                last_ping_at: None,
                last_pong_at: Instant::now(),
                sessions: HashSet::new(),
            },
        );
        StreamLogger::connection_opened(&handle.id, handle.codec);
    }

    /// Forget a connection and stop its sessions
    ///
    /// Returns how many sessions were stopped; unknown ids are a no-op.
    pub fn unregister(&self, connection_id: &str, reason: &str) -> usize {
        let Some((_, entry)) = self.connections.remove(connection_id) else {
            return 0;
        };
        let stopped = entry
            .sessions
            .iter()
            .filter(|session_id| self.sessions.stop(session_id).is_ok())
            .count();
        StreamLogger::connection_closed(connection_id, reason, stopped);
        stopped
    }

    /// Record that `session_id` belongs to the connection
    ///
    /// Returns false when either side is gone. The id is released again once
    /// the session reaches a terminal status or leaves the session map.
    pub fn attach_session(&self, connection_id: &str, session_id: &str) -> bool {
        let Ok(mut status) = self.sessions.subscribe_status(session_id) else {
            return false;
        };
        let attached = self
            .connections
            .get_mut(connection_id)
            .map(|mut entry| entry.sessions.insert(session_id.to_owned()))
            .is_some();
        if !attached {
            return false;
        }

        let registry = self.clone();
        let connection_id = connection_id.to_owned();
        let session_id = session_id.to_owned();
        tokio::spawn(async move {
            while !status.borrow_and_update().is_terminal() {
                if status.changed().await.is_err() {
                    break;
                }
            }
            registry.detach_session(&connection_id, &session_id);
        });
        true
    }

    /// Release a session from its connection
    pub fn detach_session(&self, connection_id: &str, session_id: &str) -> bool {
        self.connections
            .get_mut(connection_id)
            .is_some_and(|mut entry| entry.sessions.remove(session_id))
    }

    /// Whether the connection currently owns the session
    #[must_use]
    pub fn owns_session(&self, connection_id: &str, session_id: &str) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|entry| entry.sessions.contains(session_id))
    }

    /// Record a pong or client ping
    pub fn mark_alive(&self, connection_id: &str) {
        if let Some(mut entry) = self.connections.get_mut(connection_id) {
            entry.is_alive = true;
            entry.last_pong_at = Instant::now();
        }
    }

    /// Negotiated codec of a connection
    #[must_use]
    pub fn capabilities(&self, connection_id: &str) -> Option<Codec> {
        self.connections.get(connection_id).map(|entry| entry.codec)
    }

    /// Whether a pong arrived since the last ping
    #[must_use]
    pub fn is_alive(&self, connection_id: &str) -> Option<bool> {
        self.connections.get(connection_id).map(|entry| entry.is_alive)
    }

    /// Sessions owned by a connection
    #[must_use]
    pub fn sessions_of(&self, connection_id: &str) -> Vec<SessionId> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.sessions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the connection is registered
    #[must_use]
    pub fn contains(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Number of registered connections
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Visit every registered connection
    pub fn for_each_alive(&self, mut visit: impl FnMut(&str, &mpsc::UnboundedSender<Message>)) {
        for entry in self.connections.iter() {
            visit(entry.key(), &entry.value().tx);
        }
    }

    /// Start a close handshake on every connection
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        self.for_each_alive(|_, tx| {
            if tx.send(Message::Close(None)).is_ok() {
                closed += 1;
            }
        });
        closed
    }

    /// Ping live connections and terminate silent ones
    ///
    /// A connection whose last pong is a full heartbeat timeout old is
    /// terminated: it receives a `HEARTBEAT_TIMEOUT` error frame and a close.
    pub fn heartbeat_once(&self) -> HeartbeatReport {
        let now = Instant::now();
        let mut report = HeartbeatReport::default();
        let mut expired = Vec::new();

        for mut entry in self.connections.iter_mut() {
            let silent_for = now.saturating_duration_since(entry.last_pong_at);
            if silent_for >= self.heartbeat_timeout {
                let error = StreamError::HeartbeatTimeout {
                    connection_id: entry.key().clone(),
                    silent_for_secs: silent_for.as_secs(),
                };
                let frame = ServerFrame::error(None, error.code(), error.to_string());
                if let Some(message) = frame_message(&frame) {
                    entry.tx.send(message).ok();
                }
                entry.tx.send(Message::Close(None)).ok();
                entry.close.notify_one();
                expired.push((entry.key().clone(), error));
                continue;
            }
            if entry.tx.send(Message::Ping(Vec::new())).is_ok() {
                entry.is_alive = false;
                entry.last_ping_at = Some(now);
                report.pinged += 1;
            }
        }

        for (connection_id, error) in expired {
            StreamLogger::heartbeat_timeout(&connection_id, &error);
            self.unregister(&connection_id, "heartbeat_timeout");
            report.terminated.push(connection_id);
        }
        report
    }

    /// Run [`Self::heartbeat_once`] every heartbeat interval
    pub fn start_heartbeat(&self) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(registry.heartbeat_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let report = registry.heartbeat_once();
                debug!(
                    pinged = report.pinged,
                    terminated = report.terminated.len(),
                    "Heartbeat pass"
                );
            }
        })
    }
}
