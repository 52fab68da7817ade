// ABOUTME: Server-to-client frame types shared by the SSE and WebSocket transports
// ABOUTME: JSON frames tagged by "type" with camelCase payload fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use super::classifier::ContentType;
use super::compression::Codec;
use super::indicators::{ProgressSnapshot, TypingSnapshot};
use super::pacing::TimingProfile;
use super::session::SessionId;
use crate::config::streaming::{StreamingConfig, UxConfig};
use cadence_core::errors::ErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frame sent from the server to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// First frame on a WebSocket connection
    ConnectionEstablished(ConnectionPayload),
    /// Typing indicator phase or animation frame
    TypingIndicator(TypingPayload),
    /// Emission progress
    ProgressIndicator(ProgressPayload),
    /// Totals known before emission starts
    StreamMetadata(MetadataPayload),
    /// Chunk content on SSE
    ContentChunk(ChunkPayload),
    /// Chunk content on WebSocket, possibly compressed
    StreamChunk(ChunkPayload),
    /// Pause acknowledged
    StreamPaused(ControlPayload),
    /// Resume acknowledged
    StreamResumed(ControlPayload),
    /// Stop acknowledged
    StreamStopped(ControlPayload),
    /// All output delivered
    StreamComplete(CompletePayload),
    /// Preference change applied
    PreferencesUpdated(PreferencesPayload),
    /// Something went wrong
    Error(ErrorPayload),
    /// Answer to a client ping
    Pong(PongPayload),
}

impl ServerFrame {
    /// Wire name of the frame type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished(_) => "connection_established",
            Self::TypingIndicator(_) => "typing_indicator",
            Self::ProgressIndicator(_) => "progress_indicator",
            Self::StreamMetadata(_) => "stream_metadata",
            Self::ContentChunk(_) => "content_chunk",
            Self::StreamChunk(_) => "stream_chunk",
            Self::StreamPaused(_) => "stream_paused",
            Self::StreamResumed(_) => "stream_resumed",
            Self::StreamStopped(_) => "stream_stopped",
            Self::StreamComplete(_) => "stream_complete",
            Self::PreferencesUpdated(_) => "preferences_updated",
            Self::Error(_) => "error",
            Self::Pong(_) => "pong",
        }
    }

    /// Whether the frame is part of the SSE event vocabulary
    #[must_use]
    pub const fn is_sse_event(&self) -> bool {
        matches!(
            self,
            Self::TypingIndicator(_)
                | Self::ProgressIndicator(_)
                | Self::ContentChunk(_)
                | Self::StreamComplete(_)
                | Self::Error(_)
        )
    }

    /// Error frame for a session
    pub fn error(session_id: Option<SessionId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            session_id,
            code,
            message: message.into(),
            timestamp: Utc::now(),
        })
    }

    /// Acknowledgement frame for a control message
    #[must_use]
    pub fn control(kind: ControlKind, session_id: SessionId) -> Self {
        let payload = ControlPayload {
            session_id,
            timestamp: Utc::now(),
        };
        match kind {
            ControlKind::Paused => Self::StreamPaused(payload),
            ControlKind::Resumed => Self::StreamResumed(payload),
            ControlKind::Stopped => Self::StreamStopped(payload),
        }
    }
}

/// Which control acknowledgement to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// `stream_paused`
    Paused,
    /// `stream_resumed`
    Resumed,
    /// `stream_stopped`
    Stopped,
}

/// Payload of `connection_established`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    /// Connection id
    pub connection_id: String,
    /// Codec chosen for `stream_chunk` content
    pub compression: Codec,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Payload of `typing_indicator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Session id
    pub session_id: SessionId,
    /// Indicator state
    #[serde(flatten)]
    pub indicator: TypingSnapshot,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Payload of `progress_indicator`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    /// Session id
    pub session_id: SessionId,
    /// Progress state
    #[serde(flatten)]
    pub progress: ProgressSnapshot,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Payload of `stream_metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    /// Session id
    pub session_id: SessionId,
    /// Chunks that will be emitted
    pub total_chunks: usize,
    /// Characters that will be emitted
    pub content_length: usize,
    /// Expected emission time from the pacing profile
    pub estimated_duration_ms: u64,
    /// UX toggles in effect
    pub ux: UxConfig,
}

/// Payload of `content_chunk` / `stream_chunk`
///
/// In variable-speed mode every character is its own frame; `char_offset`
/// then locates it inside the chunk and `is_final_segment` marks the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    /// Session id
    pub session_id: SessionId,
    /// Index of the chunk this content belongs to
    pub sequence_index: usize,
    /// Text, or base64 of the compressed text when `compressed` is set
    pub content: String,
    /// Semantic type of the chunk
    pub content_type: ContentType,
    /// Whether `content` is compressed
    pub compressed: bool,
    /// Codec applied to `content`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub encoding: Option<Codec>,
    /// Character offset inside the chunk in character mode
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub char_offset: Option<usize>,
    /// Whether this frame completes its chunk
    pub is_final_segment: bool,
    /// Fence language of a code chunk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    /// Pacing of the chunk
    pub timing: TimingProfile,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Payload of pause/resume/stop acknowledgements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPayload {
    /// Session id
    pub session_id: SessionId,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Final metrics of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetrics {
    /// Chunks emitted
    pub total_chunks: usize,
    /// Characters emitted
    pub content_length: usize,
    /// Wall-clock time from start to completion
    pub duration_ms: u64,
    /// Average compressed/original size, when anything was compressed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compression_ratio: Option<f64>,
}

/// Payload of `stream_complete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    /// Session id
    pub session_id: SessionId,
    /// Metrics
    pub metrics: StreamMetrics,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Payload of `preferences_updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPayload {
    /// Session id
    pub session_id: SessionId,
    /// Streaming configuration now in effect
    pub streaming_config: StreamingConfig,
    /// UX configuration now in effect
    pub ux_config: UxConfig,
}

/// Payload of `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Session the error concerns, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<SessionId>,
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Payload of `pong`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongPayload {
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_tagged_by_type() {
        let frame = ServerFrame::control(ControlKind::Paused, "s-1".to_owned());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "stream_paused");
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(frame.kind(), "stream_paused");
    }

    #[test]
    fn test_error_frame_carries_code() {
        let frame = ServerFrame::error(None, ErrorCode::ResourceNotFound, "Session x not found");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "RESOURCE_NOT_FOUND");
        assert!(json.get("sessionId").is_none());
        assert!(frame.is_sse_event());
    }
}
