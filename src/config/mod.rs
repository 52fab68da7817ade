// ABOUTME: Configuration management module for server and per-session settings
// ABOUTME: Environment-driven server config plus validated streaming and UX options
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming
//! Configuration module for the Cadence server
//!
//! - **Environment**: listener, timers and backend from environment variables
//! - **Streaming**: per-session pacing, chunking, buffering and UX toggles

/// Environment and server configuration
pub mod environment;
/// Per-session streaming and UX configuration
pub mod streaming;

pub use environment::{BackendConfig, BackendKind, ServerConfig, StreamRuntimeConfig};
pub use streaming::{
    ChunkSize, PreferencesUpdate, StreamingConfig, StreamingOptions, UxConfig, UxOptions,
};
