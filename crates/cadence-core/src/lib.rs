// ABOUTME: Core types and constants for the Cadence adaptive streaming server
// ABOUTME: Foundation crate with error handling and streaming tuning constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

#![deny(unsafe_code)]

//! # Cadence Core
//!
//! Foundation crate providing shared types and constants for the Cadence
//! adaptive streaming server. This crate is designed to change infrequently,
//! enabling incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and the streaming `StreamError` taxonomy
//! - **constants**: Pacing profiles, timeouts, limits and wire constants organized by domain

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;
