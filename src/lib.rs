// ABOUTME: Main library entry point for the Cadence adaptive streaming server
// ABOUTME: Streams generated text with human-like pacing over SSE and WebSocket
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

#![deny(unsafe_code)]

//! # Cadence Streaming Server
//!
//! Delivers AI-generated text to clients the way a person would type it:
//! output is split into semantically typed chunks (prose, code, formulas,
//! lists, headers), each chunk gets a timing profile, and chunks are emitted
//! with contextual pauses over Server-Sent Events or WebSocket.
//!
//! ## Features
//!
//! - **Semantic chunking**: Sentence and code-fence aware splitting with content classification
//! - **Adaptive pacing**: Per-type character and boundary delays with contextual bonuses
//! - **Session control**: Pause, resume, stop and live preference updates
//! - **Indicators**: Typing phases and progress with ETA and throughput
//! - **Compression**: Brotli, gzip or deflate negotiated per connection
//!
//! ## Architecture
//!
//! - **streaming**: Transport-agnostic engine and session orchestrator
//! - **llm**: Generation backends producing text increments
//! - **sse** / **websocket**: The two transports
//! - **routes** / **server**: HTTP surface and lifecycle
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_server::config::environment::ServerConfig;
//! use cadence_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Cadence configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// Unified error handling
pub mod errors;

/// Generation backends
pub mod llm;

/// Logging configuration and structured events
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Shared server resources
pub mod resources;

/// HTTP routes
pub mod routes;

/// Server assembly and lifecycle
pub mod server;

/// Server-Sent Events transport
pub mod sse;

/// Adaptive streaming engine
pub mod streaming;

/// WebSocket transport
pub mod websocket;
