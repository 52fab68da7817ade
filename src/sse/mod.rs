// ABOUTME: Server-Sent Events transport for streaming sessions
// ABOUTME: Session sink plus the event body writer with buffering, keep-alive and encoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

/// Response body writer
pub mod body;
/// Session-side sink
pub mod sink;

pub use body::{event_body, BodyOptions};
pub use sink::SseSink;
