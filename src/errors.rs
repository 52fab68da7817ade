// ABOUTME: Re-exports the shared error types from cadence-core
// ABOUTME: Keeps crate::errors paths stable for server modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Error handling for the Cadence server
//!
//! All error types live in `cadence-core`; this module re-exports them.

pub use cadence_core::errors::{
    AppError, AppResult, ErrorCode, ErrorContext, ErrorResponse, ErrorResponseDetails,
    StreamError,
};
