// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Pacing profiles, timeouts, limits and wire constants for the streaming engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single flat list.
//! Values that operators may want to tune are also exposed through environment
//! configuration; the constants here are the defaults.

/// Per-content-type pacing profiles and contextual pause bonuses (milliseconds)
pub mod pacing {
    /// Simple prose: per-character delay
    pub const SIMPLE_CHAR_MS: u64 = 15;
    /// Simple prose: boundary delay
    pub const SIMPLE_BOUNDARY_MS: u64 = 50;
    /// Complex concepts: per-character delay
    pub const COMPLEX_CHAR_MS: u64 = 25;
    /// Complex concepts: boundary delay
    pub const COMPLEX_BOUNDARY_MS: u64 = 150;
    /// Code: per-character delay
    pub const CODE_CHAR_MS: u64 = 30;
    /// Code: boundary delay
    pub const CODE_BOUNDARY_MS: u64 = 100;
    /// Formulas: per-character delay
    pub const FORMULA_CHAR_MS: u64 = 40;
    /// Formulas: boundary delay
    pub const FORMULA_BOUNDARY_MS: u64 = 200;
    /// Lists: per-character delay
    pub const LIST_CHAR_MS: u64 = 20;
    /// Lists: boundary delay
    pub const LIST_BOUNDARY_MS: u64 = 80;
    /// Headers: per-character delay
    pub const HEADER_CHAR_MS: u64 = 10;
    /// Headers: boundary delay
    pub const HEADER_BOUNDARY_MS: u64 = 120;

    /// Extra pause when leaving a complex chunk for a different type
    pub const COMPLEX_EXIT_BONUS_MS: u64 = 100;
    /// Extra pause when leaving a code chunk for a different type
    pub const CODE_EXIT_BONUS_MS: u64 = 80;
    /// Extra pause after any formula chunk
    pub const FORMULA_BONUS_MS: u64 = 150;
    /// Extra pause after a chunk containing a paragraph break
    pub const PARAGRAPH_BONUS_MS: u64 = 200;
    /// Upper bound for a boundary pause before the pause multiplier applies
    pub const MAX_BOUNDARY_PAUSE_MS: u64 = 500;

    /// Share of the boundary delay spent on sentence-terminal punctuation
    pub const SENTENCE_PUNCTUATION_FACTOR: f64 = 0.3;
    /// Share of the char delay added for clause punctuation
    pub const CLAUSE_PUNCTUATION_FACTOR: f64 = 0.5;
}

/// Chunking limits
pub mod chunking {
    /// Soft cap on chunk length when `chunkSize` is `auto`
    pub const DEFAULT_CHUNK_CAP: usize = 200;
    /// Smallest accepted explicit chunk size
    pub const MIN_CHUNK_SIZE: usize = 20;
    /// Largest accepted explicit chunk size
    pub const MAX_CHUNK_SIZE: usize = 5000;
}

/// Timeouts and periodic task intervals
pub mod timeouts {
    /// WebSocket heartbeat interval
    pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;
    /// A connection without a pong for this long is terminated
    pub const HEARTBEAT_TIMEOUT_SECS: u64 = 30;
    /// Sessions without activity for this long are evicted
    pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 60;
    /// How often the idle session sweeper runs
    pub const IDLE_SWEEP_INTERVAL_SECS: u64 = 60;
    /// Fallback poll while a session is paused
    pub const PAUSE_POLL_INTERVAL_MS: u64 = 100;
    /// Keep-alive comment interval on idle SSE responses
    pub const SSE_KEEP_ALIVE_SECS: u64 = 15;
}

/// Compression thresholds and encoder tuning
pub mod compression {
    /// Payloads at or below this size are sent uncompressed
    pub const MIN_COMPRESSION_BYTES: usize = 100;
    /// Brotli quality (0-11)
    pub const BROTLI_QUALITY: u32 = 5;
    /// Brotli window size (log2)
    pub const BROTLI_LG_WINDOW: u32 = 22;
    /// Brotli internal buffer size
    pub const BROTLI_BUFFER_SIZE: usize = 4096;
}

/// Indicator subsystem sizing
pub mod indicators {
    /// Progress history ring capacity
    pub const PROGRESS_HISTORY_CAPACITY: usize = 10;
    /// Number of recent history entries used for throughput
    pub const THROUGHPUT_WINDOW: usize = 5;
}

/// Per-session option bounds and defaults
pub mod limits {
    /// Smallest accepted pause/speed multiplier (exclusive)
    pub const MIN_MULTIPLIER: f64 = 0.0;
    /// Largest accepted pause/speed multiplier
    pub const MAX_MULTIPLIER: f64 = 10.0;
    /// Default SSE coalescing buffer (frames)
    pub const DEFAULT_BUFFER_SIZE: usize = 16;
    /// Largest accepted SSE coalescing buffer
    pub const MAX_BUFFER_SIZE: usize = 1024;
    /// Largest accepted SSE flush interval
    pub const MAX_FLUSH_INTERVAL_MS: u64 = 1000;
    /// Longest accepted prompt, in bytes
    pub const MAX_PROMPT_BYTES: usize = 64 * 1024;
}

/// Wire-level constants shared by both transports
pub mod wire {
    /// Terminal SSE line payload
    pub const SSE_DONE_SENTINEL: &str = "[DONE]";
    /// SSE keep-alive comment
    pub const SSE_KEEP_ALIVE_COMMENT: &str = ": keep-alive\n\n";
    /// Header carrying the session id on SSE responses
    pub const SESSION_ID_HEADER: &str = "x-session-id";
}

/// API endpoints
pub mod endpoints {
    /// Health check endpoint
    pub const HEALTH_CHECK: &str = "/health";
    /// Readiness endpoint
    pub const READY: &str = "/ready";
    /// SSE streaming endpoint
    pub const STREAM: &str = "/api/stream";
    /// WebSocket endpoint
    pub const WEBSOCKET: &str = "/ws";
}

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}

/// Service names for structured logging
pub mod service_names {
    /// Main server service name
    pub const CADENCE_SERVER: &str = "cadence-server";
}
