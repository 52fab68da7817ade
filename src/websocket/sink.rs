// ABOUTME: TransportSink writing session frames to a WebSocket connection
// ABOUTME: Sends chunks as stream_chunk with per-frame compression and base64 payloads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use crate::errors::StreamError;
use crate::streaming::compression::{Codec, Compressor};
use crate::streaming::frames::ServerFrame;
use crate::streaming::sink::{Transport, TransportSink};
use axum::extract::ws::Message;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::sync::mpsc;
use tracing::warn;

/// Serialize a frame into a text message
pub fn frame_message(frame: &ServerFrame) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!(error = %e, frame = frame.kind(), "Failed to serialize WebSocket frame");
            None
        }
    }
}

/// Session side of a WebSocket connection
pub struct WebSocketSink {
    tx: mpsc::UnboundedSender<Message>,
    compressor: Compressor,
}

impl WebSocketSink {
    /// Sink compressing chunk content with `codec` above `threshold` bytes
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<Message>, codec: Codec, threshold: usize) -> Self {
        Self {
            tx,
            compressor: Compressor::new(codec, threshold),
        }
    }
}

impl TransportSink for WebSocketSink {
    fn transport(&self) -> Transport {
        Transport::WebSocket
    }

    fn prepare(&mut self, frame: ServerFrame) -> ServerFrame {
        let ServerFrame::ContentChunk(mut payload) = frame else {
            return frame;
        };
        let encoded = self.compressor.encode(payload.content.as_bytes());
        if encoded.is_compressed() {
            payload.content = STANDARD.encode(&encoded.bytes);
            payload.compressed = true;
            payload.encoding = Some(encoded.codec);
        }
        ServerFrame::StreamChunk(payload)
    }

    fn send(&mut self, frame: ServerFrame) -> Result<(), StreamError> {
        let Some(message) = frame_message(&frame) else {
            return Ok(());
        };
        self.tx
            .send(message)
            .map_err(|_| StreamError::transport_write("WebSocket connection closed"))
    }

    fn compression_ratio(&self) -> Option<f64> {
        self.compressor.average_ratio()
    }
}
