// ABOUTME: Server-Sent Events response body built from session frames
// ABOUTME: Coalesces frames per bufferSize/flushInterval, sends keep-alives and optional Content-Encoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # SSE Body Writer
//!
//! Every frame becomes one `data: <json>\n\n` event. Frames already queued
//! are written together, up to `buffer_size` per write; with a non-zero
//! `flush_interval` the writer also waits that long for more frames before
//! writing. An idle response gets a keep-alive comment. The body ends with
//! `data: [DONE]` once the session drops its sink.

use crate::config::streaming::StreamingConfig;
use crate::streaming::compression::StreamEncoder;
use crate::streaming::frames::ServerFrame;
use bytes::Bytes;
use cadence_core::constants::wire::{SSE_DONE_SENTINEL, SSE_KEEP_ALIVE_COMMENT};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{timeout, timeout_at, Instant};
use tokio_stream::Stream;
use tracing::warn;

/// Write behavior of one SSE response
#[derive(Debug, Clone, Copy)]
pub struct BodyOptions {
    /// Most frames written together
    pub buffer_size: usize,
    /// Wait for more frames before writing
    pub flush_interval: Duration,
    /// Idle time before a keep-alive comment
    pub keep_alive: Duration,
}

impl BodyOptions {
    /// Options from a validated session config
    #[must_use]
    pub fn from_config(config: &StreamingConfig, keep_alive: Duration) -> Self {
        Self {
            buffer_size: config.buffer_size.max(1),
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            keep_alive,
        }
    }
}

/// Append one `data:` event for `frame`
fn push_event(batch: &mut String, frame: &ServerFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            batch.push_str("data: ");
            batch.push_str(&json);
            batch.push_str("\n\n");
        }
        Err(e) => warn!(error = %e, frame = frame.kind(), "Failed to serialize SSE frame"),
    }
}

/// Apply the negotiated encoding; `None` once the encoder failed
fn encode(encoder: &mut Option<StreamEncoder>, data: &[u8]) -> Option<Bytes> {
    match encoder {
        None => Some(Bytes::copy_from_slice(data)),
        Some(encoder) => match encoder.encode(data) {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) => {
                warn!(error = %e, "SSE body encoding failed, closing response");
                None
            }
        },
    }
}

/// Body stream for one session
pub fn event_body(
    mut rx: mpsc::UnboundedReceiver<ServerFrame>,
    options: BodyOptions,
    encoder: Option<StreamEncoder>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    async_stream::stream! {
        let mut encoder = encoder;
        loop {
            let first = match timeout(options.keep_alive, rx.recv()).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_) => {
                    match encode(&mut encoder, SSE_KEEP_ALIVE_COMMENT.as_bytes()) {
                        Some(bytes) => yield Ok(bytes),
                        None => return,
                    }
                    continue;
                }
            };

            let mut batch = String::new();
            push_event(&mut batch, &first);
            let mut count = 1;
            let mut closed = false;
            let deadline = Instant::now() + options.flush_interval;
            while count < options.buffer_size {
                match rx.try_recv() {
                    Ok(frame) => {
                        push_event(&mut batch, &frame);
                        count += 1;
                        continue;
                    }
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                    Err(TryRecvError::Empty) => {}
                }
                if options.flush_interval.is_zero() {
                    break;
                }
                match timeout_at(deadline, rx.recv()).await {
                    Ok(Some(frame)) => {
                        push_event(&mut batch, &frame);
                        count += 1;
                    }
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }

            if !batch.is_empty() {
                match encode(&mut encoder, batch.as_bytes()) {
                    Some(bytes) => yield Ok(bytes),
                    None => return,
                }
            }
            if closed {
                break;
            }
        }

        let done = format!("data: {SSE_DONE_SENTINEL}\n\n");
        match encode(&mut encoder, done.as_bytes()) {
            Some(bytes) => yield Ok(bytes),
            None => return,
        }
        if let Some(encoder) = encoder {
            match encoder.finish() {
                Ok(trailer) if !trailer.is_empty() => yield Ok(Bytes::from(trailer)),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to finish SSE body encoding"),
            }
        }
    }
}
