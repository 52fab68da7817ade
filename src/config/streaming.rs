// ABOUTME: Per-session streaming and UX configuration with documented defaults
// ABOUTME: Client option payloads are validated into StreamingConfig and UxConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use cadence_core::constants::{chunking, limits};
use cadence_core::errors::StreamError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Soft cap on chunk length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkSize {
    /// Default cap
    #[default]
    Auto,
    /// Explicit cap in characters
    Chars(usize),
}

impl ChunkSize {
    /// Effective cap in characters
    #[must_use]
    pub const fn cap(&self) -> usize {
        match self {
            Self::Auto => chunking::DEFAULT_CHUNK_CAP,
            Self::Chars(chars) => *chars,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChunkSizeRepr {
    Number(usize),
    Text(String),
}

impl Serialize for ChunkSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => ChunkSizeRepr::Text("auto".to_owned()).serialize(serializer),
            Self::Chars(chars) => ChunkSizeRepr::Number(*chars).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ChunkSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ChunkSizeRepr::deserialize(deserializer)? {
            ChunkSizeRepr::Number(chars) => Ok(Self::Chars(chars)),
            ChunkSizeRepr::Text(text) if text.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            ChunkSizeRepr::Text(text) => Err(de::Error::custom(format!(
                "chunkSize must be \"auto\" or an integer, got \"{text}\""
            ))),
        }
    }
}

/// Validated streaming behavior of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingConfig {
    /// Group text into typed chunks instead of fixed windows
    pub semantic_chunking: bool,
    /// Add contextual bonuses to boundary pauses
    pub contextual_pauses: bool,
    /// Emit character by character with per-character delays
    pub variable_speed: bool,
    /// Soft chunk cap
    pub chunk_size: ChunkSize,
    /// Scales boundary pauses
    pub pause_multiplier: f64,
    /// Divides character delays
    pub speed_multiplier: f64,
    /// Allow payload compression
    #[serde(rename = "compression")]
    pub compression_enabled: bool,
    /// SSE frames coalesced into one body write
    pub buffer_size: usize,
    /// SSE wait for more frames before writing, in milliseconds
    #[serde(rename = "flushInterval")]
    pub flush_interval_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            semantic_chunking: true,
            contextual_pauses: true,
            variable_speed: true,
            chunk_size: ChunkSize::Auto,
            pause_multiplier: 1.0,
            speed_multiplier: 1.0,
            compression_enabled: true,
            buffer_size: limits::DEFAULT_BUFFER_SIZE,
            flush_interval_ms: 0,
        }
    }
}

/// Streaming options as sent by clients; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingOptions {
    /// See [`StreamingConfig::semantic_chunking`]
    pub semantic_chunking: Option<bool>,
    /// See [`StreamingConfig::contextual_pauses`]
    pub contextual_pauses: Option<bool>,
    /// See [`StreamingConfig::variable_speed`]
    pub variable_speed: Option<bool>,
    /// See [`StreamingConfig::chunk_size`]
    pub chunk_size: Option<ChunkSize>,
    /// See [`StreamingConfig::pause_multiplier`]
    pub pause_multiplier: Option<f64>,
    /// See [`StreamingConfig::speed_multiplier`]
    pub speed_multiplier: Option<f64>,
    /// See [`StreamingConfig::compression_enabled`]
    pub compression: Option<bool>,
    /// See [`StreamingConfig::buffer_size`]
    pub buffer_size: Option<usize>,
    /// See [`StreamingConfig::flush_interval_ms`]
    pub flush_interval: Option<u64>,
}

fn validate_multiplier(field: &'static str, value: f64) -> Result<f64, StreamError> {
    if value.is_finite() && value > limits::MIN_MULTIPLIER && value <= limits::MAX_MULTIPLIER {
        Ok(value)
    } else {
        Err(StreamError::invalid_config(
            field,
            format!(
                "must be greater than {} and at most {}, got {value}",
                limits::MIN_MULTIPLIER,
                limits::MAX_MULTIPLIER
            ),
        ))
    }
}

impl StreamingConfig {
    /// Overlay client options on this configuration
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] naming the first rejected option
    pub fn apply(&self, options: &StreamingOptions) -> Result<Self, StreamError> {
        let mut next = self.clone();

        if let Some(value) = options.semantic_chunking {
            next.semantic_chunking = value;
        }
        if let Some(value) = options.contextual_pauses {
            next.contextual_pauses = value;
        }
        if let Some(value) = options.variable_speed {
            next.variable_speed = value;
        }
        if let Some(value) = options.compression {
            next.compression_enabled = value;
        }
        if let Some(chunk_size) = options.chunk_size {
            if let ChunkSize::Chars(chars) = chunk_size {
                if !(chunking::MIN_CHUNK_SIZE..=chunking::MAX_CHUNK_SIZE).contains(&chars) {
                    return Err(StreamError::invalid_config(
                        "chunkSize",
                        format!(
                            "must be \"auto\" or between {} and {}, got {chars}",
                            chunking::MIN_CHUNK_SIZE,
                            chunking::MAX_CHUNK_SIZE
                        ),
                    ));
                }
            }
            next.chunk_size = chunk_size;
        }
        if let Some(value) = options.pause_multiplier {
            next.pause_multiplier = validate_multiplier("pauseMultiplier", value)?;
        }
        if let Some(value) = options.speed_multiplier {
            next.speed_multiplier = validate_multiplier("speedMultiplier", value)?;
        }
        if let Some(value) = options.buffer_size {
            if !(1..=limits::MAX_BUFFER_SIZE).contains(&value) {
                return Err(StreamError::invalid_config(
                    "bufferSize",
                    format!("must be between 1 and {}, got {value}", limits::MAX_BUFFER_SIZE),
                ));
            }
            next.buffer_size = value;
        }
        if let Some(value) = options.flush_interval {
            if value > limits::MAX_FLUSH_INTERVAL_MS {
                return Err(StreamError::invalid_config(
                    "flushInterval",
                    format!("must be at most {}ms, got {value}", limits::MAX_FLUSH_INTERVAL_MS),
                ));
            }
            next.flush_interval_ms = value;
        }

        Ok(next)
    }
}

/// Client-facing presentation toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UxConfig {
    /// Emit typing indicator frames
    pub show_typing_indicator: bool,
    /// Emit progress frames
    pub show_progress: bool,
    /// Passed through to clients rendering code chunks
    pub syntax_highlighting: bool,
    /// Passed through to clients
    pub smooth_scrolling: bool,
}

impl Default for UxConfig {
    fn default() -> Self {
        Self {
            show_typing_indicator: true,
            show_progress: true,
            syntax_highlighting: true,
            smooth_scrolling: true,
        }
    }
}

/// UX options as sent by clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UxOptions {
    /// See [`UxConfig::show_typing_indicator`]
    pub show_typing_indicator: Option<bool>,
    /// See [`UxConfig::show_progress`]
    pub show_progress: Option<bool>,
    /// See [`UxConfig::syntax_highlighting`]
    pub syntax_highlighting: Option<bool>,
    /// See [`UxConfig::smooth_scrolling`]
    pub smooth_scrolling: Option<bool>,
}

impl UxConfig {
    /// Overlay client options on this configuration
    #[must_use]
    pub fn apply(&self, options: &UxOptions) -> Self {
        Self {
            show_typing_indicator: options
                .show_typing_indicator
                .unwrap_or(self.show_typing_indicator),
            show_progress: options.show_progress.unwrap_or(self.show_progress),
            syntax_highlighting: options.syntax_highlighting.unwrap_or(self.syntax_highlighting),
            smooth_scrolling: options.smooth_scrolling.unwrap_or(self.smooth_scrolling),
        }
    }
}

/// Live preference change for a running session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    /// Streaming options to overlay
    #[serde(default)]
    pub streaming_config: Option<StreamingOptions>,
    /// UX options to overlay
    #[serde(default)]
    pub ux_config: Option<UxOptions>,
}

impl PreferencesUpdate {
    /// Apply to a configuration pair, validating streaming options
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] when a streaming option is rejected
    pub fn apply(
        &self,
        streaming: &StreamingConfig,
        ux: &UxConfig,
    ) -> Result<(StreamingConfig, UxConfig), StreamError> {
        let streaming = match &self.streaming_config {
            Some(options) => streaming.apply(options)?,
            None => streaming.clone(),
        };
        let ux = self.ux_config.map_or(*ux, |options| ux.apply(&options));
        Ok((streaming, ux))
    }
}
