// ABOUTME: Route module organization for the streaming server HTTP endpoints
// ABOUTME: Health, SSE stream plus control, and WebSocket upgrade routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Route module for the streaming server
//!
//! Each module contains route definitions and thin handlers delegating to the
//! session manager or the WebSocket manager.

/// Health check and readiness routes
pub mod health;
/// SSE streaming and session control routes
#[cfg(feature = "transport-sse")]
pub mod stream;
/// WebSocket upgrade route
#[cfg(feature = "transport-websocket")]
pub mod websocket;

pub use health::HealthRoutes;
#[cfg(feature = "transport-sse")]
pub use stream::StreamRoutes;
#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketRoutes;
