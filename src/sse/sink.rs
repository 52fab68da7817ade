// ABOUTME: TransportSink for Server-Sent Events responses
// ABOUTME: Forwards SSE-vocabulary frames to the response body over an unbounded channel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use crate::errors::StreamError;
use crate::streaming::frames::ServerFrame;
use crate::streaming::sink::{Transport, TransportSink};
use tokio::sync::mpsc;

/// Session side of an SSE response
pub struct SseSink {
    tx: mpsc::UnboundedSender<ServerFrame>,
}

impl SseSink {
    /// Sink plus the receiver feeding the response body
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransportSink for SseSink {
    fn transport(&self) -> Transport {
        Transport::Sse
    }

    fn send(&mut self, frame: ServerFrame) -> Result<(), StreamError> {
        // metadata and control acknowledgements are WebSocket-only
        if !frame.is_sse_event() {
            return Ok(());
        }
        self.tx
            .send(frame)
            .map_err(|_| StreamError::transport_write("SSE response closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::frames::ControlKind;
    use cadence_core::errors::ErrorCode;

    #[tokio::test]
    async fn test_filters_websocket_only_frames() {
        let (mut sink, mut rx) = SseSink::channel();
        sink.send(ServerFrame::control(ControlKind::Paused, "s1".into()))
            .unwrap();
        sink.send(ServerFrame::error(None, ErrorCode::InternalError, "x"))
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().kind(), "error");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_response_is_transport_error() {
        let (mut sink, rx) = SseSink::channel();
        drop(rx);
        let result = sink.send(ServerFrame::error(None, ErrorCode::InternalError, "x"));
        assert!(matches!(result, Err(StreamError::TransportWrite { .. })));
    }
}
