// ABOUTME: Adaptive streaming engine turning generated text into paced, typed chunks
// ABOUTME: Classifier, chunker, pacing, indicators, compression, sessions and the orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Streaming Engine
//!
//! Transport-agnostic core of the server. A session pulls text from a
//! [`GenerationBackend`](crate::llm::GenerationBackend), splits it into typed
//! chunks, assigns timing to each chunk and emits [`ServerFrame`]s through a
//! [`TransportSink`] while honoring pause, resume and stop.

/// Content-type classification of text fragments
pub mod classifier;

/// Semantic and fixed-window chunking
pub mod chunker;

/// Timing profiles and pause computation
pub mod pacing;

/// Typing and progress indicators
pub mod indicators;

/// Codec negotiation and payload compression
pub mod compression;

/// Session record and lifecycle
pub mod session;

/// Server-to-client frames
pub mod frames;

/// Transport abstraction
pub mod sink;

/// Session manager and runner
pub mod orchestrator;

pub use chunker::{Chunk, SemanticChunker};
pub use classifier::ContentType;
pub use compression::{negotiate, parse_accept_encoding, Codec, Compressor, StreamEncoder};
pub use frames::ServerFrame;
pub use indicators::{ProgressTracker, TypingIndicator, TypingPhase};
pub use orchestrator::{SessionManager, SessionSettings, StartRequest};
pub use pacing::{PacingEngine, TimingProfile};
pub use session::{SessionId, SessionSnapshot, SessionStatus};
pub use sink::{Transport, TransportSink};
