// ABOUTME: Environment configuration for the HTTP listener, stream runtime and generation backend
// ABOUTME: Parses environment variables into a typed ServerConfig with logged summary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Environment-based configuration management

use crate::errors::{AppError, AppResult};
use cadence_core::constants::{compression, ports, timeouts};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default base URL of the OpenAI-compatible backend (Ollama)
pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434/v1";

/// Default model requested from the OpenAI-compatible backend
pub const DEFAULT_LLM_MODEL: &str = "qwen2.5:14b-instruct";

/// Which generation backend feeds sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Any endpoint speaking the OpenAI chat completions API
    OpenAiCompatible,
    /// Echo the prompt back word by word
    #[default]
    Echo,
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai_compatible" | "openai-compatible" | "openai" => Ok(Self::OpenAiCompatible),
            "echo" => Ok(Self::Echo),
            other => Err(AppError::invalid_input(format!(
                "Invalid GENERATION_BACKEND '{other}': expected openai_compatible or echo"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAiCompatible => f.write_str("openai_compatible"),
            Self::Echo => f.write_str("echo"),
        }
    }
}

/// Generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend implementation
    pub kind: BackendKind,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Bearer token, absent for local servers
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Echo,
            base_url: DEFAULT_LLM_BASE_URL.to_owned(),
            model: DEFAULT_LLM_MODEL.to_owned(),
            api_key: None,
        }
    }
}

/// Timers and thresholds of the streaming runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRuntimeConfig {
    /// WebSocket ping interval
    pub heartbeat_interval_secs: u64,
    /// WebSocket connections silent for this long are terminated
    pub heartbeat_timeout_secs: u64,
    /// Sessions idle for longer are evicted
    pub session_idle_timeout_secs: u64,
    /// How often idle sessions are swept
    pub idle_sweep_interval_secs: u64,
    /// Fallback poll while paused
    pub pause_poll_interval_ms: u64,
    /// Payloads at or below this size are never compressed
    pub compression_threshold_bytes: usize,
    /// Keep-alive comment interval for idle SSE responses
    pub sse_keep_alive_secs: u64,
}

impl Default for StreamRuntimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: timeouts::HEARTBEAT_INTERVAL_SECS,
            heartbeat_timeout_secs: timeouts::HEARTBEAT_TIMEOUT_SECS,
            session_idle_timeout_secs: timeouts::SESSION_IDLE_TIMEOUT_SECS,
            idle_sweep_interval_secs: timeouts::IDLE_SWEEP_INTERVAL_SECS,
            pause_poll_interval_ms: timeouts::PAUSE_POLL_INTERVAL_MS,
            compression_threshold_bytes: compression::MIN_COMPRESSION_BYTES,
            sse_keep_alive_secs: timeouts::SSE_KEEP_ALIVE_SECS,
        }
    }
}

impl StreamRuntimeConfig {
    /// Heartbeat interval as a [`Duration`]
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat timeout as a [`Duration`]
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Pause poll fallback as a [`Duration`]
    #[must_use]
    pub const fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_interval_ms)
    }

    /// SSE keep-alive interval as a [`Duration`]
    #[must_use]
    pub const fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub http_host: String,
    /// Port to bind
    pub http_port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_allowed_origins: Vec<String>,
    /// Streaming runtime timers
    pub stream: StreamRuntimeConfig,
    /// Generation backend
    pub backend: BackendConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_owned(),
            http_port: ports::DEFAULT_HTTP_PORT,
            cors_allowed_origins: vec!["*".to_owned()],
            stream: StreamRuntimeConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();
        let stream_defaults = defaults.stream;

        let backend_kind = match lookup("GENERATION_BACKEND") {
            Some(value) => value.parse()?,
            None => BackendKind::default(),
        };

        Ok(Self {
            http_host: lookup("HTTP_HOST").unwrap_or(defaults.http_host),
            http_port: parse_var(&lookup, "HTTP_PORT", defaults.http_port)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map_or(defaults.cors_allowed_origins, |origins| {
                    parse_origins(&origins)
                }),
            stream: StreamRuntimeConfig {
                heartbeat_interval_secs: parse_var(
                    &lookup,
                    "STREAM_HEARTBEAT_INTERVAL_SECS",
                    stream_defaults.heartbeat_interval_secs,
                )?,
                heartbeat_timeout_secs: parse_var(
                    &lookup,
                    "STREAM_HEARTBEAT_TIMEOUT_SECS",
                    stream_defaults.heartbeat_timeout_secs,
                )?,
                session_idle_timeout_secs: parse_var(
                    &lookup,
                    "STREAM_SESSION_IDLE_TIMEOUT_SECS",
                    stream_defaults.session_idle_timeout_secs,
                )?,
                idle_sweep_interval_secs: parse_var(
                    &lookup,
                    "STREAM_IDLE_SWEEP_INTERVAL_SECS",
                    stream_defaults.idle_sweep_interval_secs,
                )?,
                pause_poll_interval_ms: parse_var(
                    &lookup,
                    "STREAM_PAUSE_POLL_INTERVAL_MS",
                    stream_defaults.pause_poll_interval_ms,
                )?,
                compression_threshold_bytes: parse_var(
                    &lookup,
                    "STREAM_COMPRESSION_THRESHOLD_BYTES",
                    stream_defaults.compression_threshold_bytes,
                )?,
                sse_keep_alive_secs: parse_var(
                    &lookup,
                    "SSE_KEEP_ALIVE_SECS",
                    stream_defaults.sse_keep_alive_secs,
                )?,
            },
            backend: BackendConfig {
                kind: backend_kind,
                base_url: lookup("LLM_BASE_URL").unwrap_or(defaults.backend.base_url),
                model: lookup("LLM_MODEL").unwrap_or(defaults.backend.model),
                api_key: lookup("LLM_API_KEY").filter(|key| !key.is_empty()),
            },
        })
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Cadence Server Configuration:\n\
             - HTTP: {}:{}\n\
             - CORS Origins: {}\n\
             - Heartbeat: every {}s, timeout {}s\n\
             - Session Idle Timeout: {}s\n\
             - Compression Threshold: {} bytes\n\
             - Backend: {} ({})",
            self.http_host,
            self.http_port,
            self.cors_allowed_origins.join(", "),
            self.stream.heartbeat_interval_secs,
            self.stream.heartbeat_timeout_secs,
            self.stream.session_idle_timeout_secs,
            self.stream.compression_threshold_bytes,
            self.backend.kind,
            match self.backend.kind {
                BackendKind::OpenAiCompatible => self.backend.model.as_str(),
                BackendKind::Echo => "demo",
            },
        )
    }
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::invalid_input(format!("Invalid {key} value '{raw}': {e}"))),
        None => Ok(default),
    }
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.http_port, 8081);
        assert_eq!(config.stream.heartbeat_interval_secs, 15);
        assert_eq!(config.stream.session_idle_timeout_secs, 1800);
        assert_eq!(config.backend.kind, BackendKind::Echo);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_PORT", "9000"),
            ("GENERATION_BACKEND", "openai_compatible"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test"),
            ("LLM_API_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.backend.kind, BackendKind::OpenAiCompatible);
        assert_eq!(config.cors_allowed_origins.len(), 2);
        assert!(config.backend.api_key.is_none());
    }

    #[test]
    fn test_invalid_number_is_invalid_input() {
        let error = ServerConfig::from_lookup(lookup_from(&[("HTTP_PORT", "eighty")])).unwrap_err();
        assert_eq!(error.code, cadence_core::errors::ErrorCode::InvalidInput);
        assert!(error.message.contains("HTTP_PORT"));
    }

    #[test]
    fn test_summary_hides_api_key() {
        let mut config = ServerConfig::default();
        config.backend.api_key = Some("sk-secret".to_owned());
        assert!(!config.summary().contains("sk-secret"));
    }
}
