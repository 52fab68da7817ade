// ABOUTME: Transport abstraction the session runner writes frames through
// ABOUTME: Implemented by the SSE channel sink and the WebSocket connection sink
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use super::frames::ServerFrame;
use cadence_core::errors::StreamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client transport of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Server-Sent Events response body
    Sse,
    /// WebSocket connection
    WebSocket,
}

impl Transport {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of a session's frames
///
/// A failed send means the client is gone; the runner stops the session
/// without emitting anything further.
///
/// Delivery is split in two. `prepare` runs unlocked and may be slow.
/// `send` runs while the runner holds the session lock, so a concurrent
/// stop is ordered strictly before or after the frame; it must only queue.
pub trait TransportSink: Send + 'static {
    /// Transport kind
    fn transport(&self) -> Transport;

    /// Transport-specific encoding of a frame before delivery
    fn prepare(&mut self, frame: ServerFrame) -> ServerFrame {
        frame
    }

    /// Queue one prepared frame without blocking
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::TransportWrite`] when the client is gone
    fn send(&mut self, frame: ServerFrame) -> Result<(), StreamError>;

    /// Average compression ratio of frames sent so far
    fn compression_ratio(&self) -> Option<f64> {
        None
    }
}
