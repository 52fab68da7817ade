// ABOUTME: Streaming session record and its lifecycle state machine
// ABOUTME: Validates transitions, tracks pause/resume targets and the emission cursor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Session state machine
//!
//! ```text
//! Created -> Thinking -> Processing -> Streaming -> Completed
//!    \_________\_____________\______________\_____> Paused <-> (previous phase)
//!    \_________\_____________\______________\_____> Stopped | Failed
//! ```
//!
//! While paused, forward progress of the runner (for instance the first
//! increment arriving) moves the phase the session resumes into, not the
//! visible status.

use super::indicators::TypingPhase;
use super::sink::Transport;
use crate::config::streaming::{StreamingConfig, UxConfig};
use cadence_core::errors::StreamError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session identifier
pub type SessionId = String;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepted, runner not yet started
    Created,
    /// Waiting for the first increment
    Thinking,
    /// Increments arriving, output not yet emitted
    Processing,
    /// Chunks being emitted
    Streaming,
    /// Emission blocked by a client
    Paused,
    /// Stopped by a client or a dropped connection
    Stopped,
    /// All output delivered
    Completed,
    /// Generation failed
    Failed,
}

impl SessionStatus {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Thinking => "thinking",
            Self::Processing => "processing",
            Self::Streaming => "streaming",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Completed | Self::Failed)
    }

    /// Typing indicator phase shown for this status
    #[must_use]
    pub const fn typing_phase(&self) -> Option<TypingPhase> {
        match self {
            Self::Created => None,
            Self::Thinking => Some(TypingPhase::Thinking),
            Self::Processing => Some(TypingPhase::Processing),
            Self::Streaming => Some(TypingPhase::Streaming),
            Self::Paused => Some(TypingPhase::Paused),
            Self::Stopped | Self::Completed | Self::Failed => Some(TypingPhase::Complete),
        }
    }

    const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Thinking)
                | (Self::Thinking, Self::Processing)
                | (Self::Processing, Self::Streaming)
                | (
                    Self::Thinking | Self::Processing | Self::Streaming,
                    Self::Completed
                )
                | (
                    Self::Created | Self::Thinking | Self::Processing | Self::Streaming,
                    Self::Failed
                )
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emission progress of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// Chunks fully emitted
    pub chunks_emitted: usize,
    /// Total chunks once the output is chunked
    pub total_chunks: Option<usize>,
    /// Characters emitted so far
    pub content_length: usize,
}

/// One streaming interaction
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    transport: Transport,
    status: SessionStatus,
    resume_to: Option<SessionStatus>,
    /// Streaming behavior, updatable while running
    pub config: StreamingConfig,
    /// UX toggles, updatable while running
    pub ux: UxConfig,
    /// Emission progress
    pub cursor: Cursor,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    connection_id: Option<String>,
}

impl Session {
    /// New session in the `Created` state
    #[must_use]
    pub fn new(
        id: SessionId,
        transport: Transport,
        config: StreamingConfig,
        ux: UxConfig,
        connection_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            transport,
            status: SessionStatus::Created,
            resume_to: None,
            config,
            ux,
            cursor: Cursor::default(),
            started_at: now,
            last_activity_at: now,
            connection_id,
        }
    }

    /// Session id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Phase a paused session returns to
    #[must_use]
    pub const fn resume_to(&self) -> Option<SessionStatus> {
        self.resume_to
    }

    /// Owning WebSocket connection
    #[must_use]
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Time of the last state change or emission
    #[must_use]
    pub const fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Record activity
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    fn invalid(&self, to: SessionStatus) -> StreamError {
        StreamError::InvalidTransition {
            from: self.status.as_str(),
            to: to.as_str(),
        }
    }

    /// Forward progress driven by the runner
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidTransition`] for a move the state machine forbids
    pub fn advance(&mut self, next: SessionStatus) -> Result<(), StreamError> {
        let effective = match (self.status, self.resume_to) {
            (SessionStatus::Paused, Some(phase)) => phase,
            (status, _) => status,
        };
        if !effective.can_advance_to(next) {
            return Err(self.invalid(next));
        }

        if next.is_terminal() {
            self.status = next;
            self.resume_to = None;
        } else if self.status == SessionStatus::Paused {
            self.resume_to = Some(next);
        } else {
            self.status = next;
        }
        self.touch();
        Ok(())
    }

    /// Pause emission; returns `false` when already paused
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidTransition`] for a finished session
    pub fn pause(&mut self) -> Result<bool, StreamError> {
        match self.status {
            SessionStatus::Paused => Ok(false),
            status if status.is_terminal() => Err(self.invalid(SessionStatus::Paused)),
            status => {
                self.resume_to = Some(status);
                self.status = SessionStatus::Paused;
                self.touch();
                Ok(true)
            }
        }
    }

    /// Resume emission; returns `false` when not paused
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidTransition`] for a finished session
    pub fn resume(&mut self) -> Result<bool, StreamError> {
        match self.status {
            SessionStatus::Paused => {
                self.status = self.resume_to.take().unwrap_or(SessionStatus::Streaming);
                self.touch();
                Ok(true)
            }
            status if status.is_terminal() => Err(self.invalid(SessionStatus::Streaming)),
            _ => Ok(false),
        }
    }

    /// Stop the session; returns `false` when already stopped
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidTransition`] for a completed or failed session
    pub fn stop(&mut self) -> Result<bool, StreamError> {
        match self.status {
            SessionStatus::Stopped => Ok(false),
            SessionStatus::Completed | SessionStatus::Failed => {
                Err(self.invalid(SessionStatus::Stopped))
            }
            _ => {
                self.status = SessionStatus::Stopped;
                self.resume_to = None;
                self.touch();
                Ok(true)
            }
        }
    }

    /// Serializable view of the session
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            transport: self.transport,
            status: self.status,
            streaming_config: self.config.clone(),
            ux_config: self.ux,
            cursor: self.cursor,
            started_at: self.started_at,
            last_activity_at: self.last_activity_at,
            connection_id: self.connection_id.clone(),
        }
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session id
    pub session_id: SessionId,
    /// Transport the session streams over
    pub transport: Transport,
    /// Status
    pub status: SessionStatus,
    /// Streaming configuration in effect
    pub streaming_config: StreamingConfig,
    /// UX configuration in effect
    pub ux_config: UxConfig,
    /// Emission progress
    pub cursor: Cursor,
    /// Creation time
    pub started_at: DateTime<Utc>,
    /// Last activity
    pub last_activity_at: DateTime<Utc>,
    /// Owning WebSocket connection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            "s-1".to_owned(),
            Transport::Sse,
            StreamingConfig::default(),
            UxConfig::default(),
            None,
        )
    }

    #[test]
    fn test_happy_path() {
        let mut session = session();
        for next in [
            SessionStatus::Thinking,
            SessionStatus::Processing,
            SessionStatus::Streaming,
            SessionStatus::Completed,
        ] {
            session.advance(next).unwrap();
        }
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn test_cannot_skip_phases() {
        let mut session = session();
        let error = session.advance(SessionStatus::Streaming).unwrap_err();
        assert!(matches!(
            error,
            StreamError::InvalidTransition {
                from: "created",
                to: "streaming"
            }
        ));
    }

    #[test]
    fn test_progress_while_paused_moves_resume_target() {
        let mut session = session();
        session.advance(SessionStatus::Thinking).unwrap();
        assert!(session.pause().unwrap());
        session.advance(SessionStatus::Processing).unwrap();
        assert_eq!(session.status(), SessionStatus::Paused);
        assert!(session.resume().unwrap());
        assert_eq!(session.status(), SessionStatus::Processing);
    }

    #[test]
    fn test_pause_and_resume_are_idempotent() {
        let mut session = session();
        assert!(!session.resume().unwrap());
        assert!(session.pause().unwrap());
        assert!(!session.pause().unwrap());
    }

    #[test]
    fn test_stop_is_final() {
        let mut session = session();
        assert!(session.stop().unwrap());
        assert!(!session.stop().unwrap());
        assert!(session.pause().is_err());
        assert!(session.resume().is_err());
        assert!(session.advance(SessionStatus::Thinking).is_err());
    }

    #[test]
    fn test_failure_while_paused() {
        let mut session = session();
        session.advance(SessionStatus::Thinking).unwrap();
        session.pause().unwrap();
        session.advance(SessionStatus::Failed).unwrap();
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.resume_to(), None);
    }
}
