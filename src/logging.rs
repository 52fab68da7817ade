// ABOUTME: Logging configuration and structured logging setup for the streaming server
// ABOUTME: Configures filters and formatters, plus structured helpers for session and connection events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Production-ready logging configuration with structured output

use crate::errors::StreamError;
use crate::streaming::compression::Codec;
use crate::streaming::session::SessionStatus;
use crate::streaming::sink::Transport;
use anyhow::Result;
use cadence_core::constants::service_names;
use serde_json::json;
use std::env;
use std::io;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread information
    pub include_thread: bool,
    /// Include span open/close events
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            include_spans: false,
            service_name: service_names::CADENCE_SERVER.into(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".into(),
        }
    }
}

/// Noise reduction applied on top of any `RUST_LOG` directive
const NOISE_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "hyper::proto=warn",
    "reqwest=warn",
    "tungstenite=info",
    "tower_http=info",
];

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        // In production, use more detailed logging
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: is_production || env::var("LOG_INCLUDE_THREAD").is_ok(),
            include_spans: is_production || env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| service_names::CADENCE_SERVER.into()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_owned()),
            environment,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(&self.level);
        for directive in NOISE_DIRECTIVES {
            filter = filter.add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| tracing::Level::WARN.into()),
            );
        }
        // Keep our application logs at the desired level
        filter.add_directive(
            format!("cadence_server={}", self.level)
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        )
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_ids(self.include_thread)
                    .with_thread_names(self.include_thread)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(span_events)
                    .json();

                registry.with(json_layer).try_init()?;
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_ids(self.include_thread)
                    .with_thread_names(self.include_thread)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(span_events);

                registry.with(pretty_layer).try_init()?;
            }
            LogFormat::Compact => {
                let compact_layer = fmt::layer()
                    .compact()
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(false)
                    .with_writer(io::stdout)
                    .with_span_events(FmtSpan::NONE);

                registry.with(compact_layer).try_init()?;
            }
        }

        self.log_startup_info();
        Ok(())
    }

    /// Log structured startup information
    fn log_startup_info(&self) {
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Cadence server starting up"
        );

        let config_summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "features": {
                    "location": self.include_location,
                    "thread": self.include_thread,
                    "spans": self.include_spans
                }
            }
        });

        info!("Configuration loaded: {}", config_summary);
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Structured events for streaming sessions and connections
pub struct StreamLogger;

impl StreamLogger {
    /// A session was accepted
    pub fn session_started(session_id: &str, transport: Transport, prompt_bytes: usize) {
        info!(
            session.id = %session_id,
            session.transport = %transport,
            session.prompt_bytes = prompt_bytes,
            "Stream session started"
        );
    }

    /// A session runner finished
    pub fn session_finished(
        session_id: &str,
        status: SessionStatus,
        chunks_emitted: usize,
        duration_ms: u64,
    ) {
        info!(
            session.id = %session_id,
            session.status = %status,
            session.chunks = chunks_emitted,
            session.duration_ms = duration_ms,
            "Stream session finished"
        );
    }

    /// A control message changed a session
    pub fn control_applied(session_id: &str, action: &str, status: SessionStatus) {
        debug!(
            session.id = %session_id,
            control.action = %action,
            session.status = %status,
            "Stream control applied"
        );
    }

    /// Sessions evicted for inactivity
    pub fn sessions_evicted(count: usize, idle_secs: i64) {
        info!(
            sessions.evicted = count,
            sessions.idle_secs = idle_secs,
            "Evicted idle stream sessions"
        );
    }

    /// A WebSocket connection was registered
    pub fn connection_opened(connection_id: &str, codec: Codec) {
        info!(
            connection.id = %connection_id,
            connection.compression = %codec,
            "WebSocket connection opened"
        );
    }

    /// A WebSocket connection was unregistered
    pub fn connection_closed(connection_id: &str, reason: &str, sessions_stopped: usize) {
        info!(
            connection.id = %connection_id,
            connection.reason = %reason,
            connection.sessions_stopped = sessions_stopped,
            "WebSocket connection closed"
        );
    }

    /// A WebSocket connection missed its heartbeat window
    pub fn heartbeat_timeout(connection_id: &str, error: &StreamError) {
        warn!(
            connection.id = %connection_id,
            error.code = ?error.code(),
            error = %error,
            "WebSocket connection missed heartbeat"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.service_name, "cadence-server");
    }

    #[test]
    fn test_env_filter_accepts_level() {
        let config = LoggingConfig {
            level: "debug".into(),
            ..LoggingConfig::default()
        };
        assert!(config.env_filter().to_string().contains("cadence_server=debug"));
    }
}
