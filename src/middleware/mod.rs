// ABOUTME: HTTP middleware for the streaming server
// ABOUTME: CORS configuration layered onto every route
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

/// CORS configuration
pub mod cors;

pub use cors::setup_cors;
