// ABOUTME: Line-buffering parser for upstream Server-Sent Events responses
// ABOUTME: Turns a chunked byte stream into a TextSource of generated increments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Upstream SSE Parser
//!
//! Streaming chat APIs answer with `data: {...}` lines. TCP chunks do not line
//! up with those lines: one chunk may carry several events, and one event may
//! straddle two chunks. [`SseLineBuffer`] buffers partial lines and emits only
//! complete events; [`text_source`] wraps a byte stream into a [`TextSource`]
//! that ends at `[DONE]` or when the body ends.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use cadence_core::constants::wire::SSE_DONE_SENTINEL;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};

use super::TextSource;
use crate::errors::{AppError, AppResult};

/// A parsed SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Buffers bytes until complete SSE lines are available
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    /// Create an empty buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        let data = line.trim().strip_prefix("data:")?.trim();
        if data.is_empty() {
            None
        } else if data == SSE_DONE_SENTINEL {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(data.to_owned()))
        }
    }

    /// Append bytes and return every event completed by them
    ///
    /// Non-data fields (`event:`, `id:`, `retry:`, comments) are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let rest = self.buffer.split_off(newline_pos + 1);
            let line = mem::replace(&mut self.buffer, rest);
            if let Some(event) = Self::parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the body ended without a final newline
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        Self::parse_line(&remaining).into_iter().collect()
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

struct SourceState<F> {
    bytes: ByteStream,
    parser: SseLineBuffer,
    pending: VecDeque<AppResult<String>>,
    parse_data: F,
    backend_name: &'static str,
    finished: bool,
}

impl<F> SourceState<F>
where
    F: Fn(&str) -> Option<AppResult<String>>,
{
    fn absorb(&mut self, events: Vec<SseEvent>) {
        for event in events {
            if self.finished {
                return;
            }
            match event {
                SseEvent::Data(json) => {
                    if let Some(result) = (self.parse_data)(&json) {
                        self.pending.push_back(result);
                    }
                }
                SseEvent::Done => self.finished = true,
            }
        }
    }
}

/// Wrap an upstream SSE body into a source of text increments
///
/// `parse_data` turns one JSON payload into an increment, or `None` to skip
/// it. Empty increments are dropped. The first read error is yielded once and
/// ends the source.
pub fn text_source<S, F>(byte_stream: S, parse_data: F, backend_name: &'static str) -> TextSource
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<AppResult<String>> + Send + 'static,
{
    let state = SourceState {
        bytes: Box::pin(byte_stream),
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        parse_data,
        backend_name,
        finished: false,
    };

    let stream = unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = state.parser.feed(&bytes);
                    state.absorb(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let error = AppError::external_service(
                        state.backend_name,
                        format!("Stream read error: {e}"),
                    );
                    return Some((Err(error), state));
                }
                None => {
                    let events = state.parser.flush();
                    state.absorb(events);
                    state.finished = true;
                }
            }
        }
    });

    Box::pin(stream.filter(|item| {
        let keep = item.as_ref().map_or(true, |text| !text.is_empty());
        futures_util::future::ready(keep)
    }))
}
