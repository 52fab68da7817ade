// ABOUTME: Streaming error taxonomy for sessions, transports and control messages
// ABOUTME: Defines StreamError and its mapping onto AppError codes

use super::{AppError, ErrorCode};

/// Errors raised by the streaming engine and its transports
///
/// Exhaustion of the text source is not an error: a finished source simply
/// yields `None`.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The generation backend failed; surfaced to the client as-is
    #[error("Generation source failed: {message}")]
    SourceFailure {
        /// Backend error message
        message: String,
    },

    /// The client went away while a frame was being written
    #[error("Transport write failed: {reason}")]
    TransportWrite {
        /// Why the write failed
        reason: String,
    },

    /// A payload could not be compressed with the negotiated codec
    #[error("Compression with {codec} failed")]
    Compression {
        /// Codec that failed
        codec: &'static str,
        /// Underlying encoder error
        #[source]
        source: std::io::Error,
    },

    /// A client frame was malformed or of an unknown type
    #[error("Invalid control message: {reason}")]
    InvalidControlMessage {
        /// Parse or validation failure
        reason: String,
    },

    /// A WebSocket connection missed its heartbeat window
    #[error("Connection {connection_id} missed heartbeat for {silent_for_secs}s")]
    HeartbeatTimeout {
        /// Connection that timed out
        connection_id: String,
        /// Seconds since the last observed pong
        silent_for_secs: u64,
    },

    /// A control message referenced an unknown or expired session
    #[error("Session {session_id} not found")]
    SessionNotFound {
        /// The session id from the control message
        session_id: String,
    },

    /// The session state machine does not allow the requested transition
    #[error("Cannot move session from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: &'static str,
        /// Requested status
        to: &'static str,
    },

    /// A streaming option failed validation
    #[error("Invalid streaming option '{field}': {reason}")]
    InvalidConfig {
        /// Option name as sent by the client
        field: &'static str,
        /// Validation failure
        reason: String,
    },
}

impl StreamError {
    /// Whether this error ends the session in the `Failed` state
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::SourceFailure { .. })
    }

    /// Error code used when the error is reported to a client
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SourceFailure { .. } => ErrorCode::ExternalServiceError,
            Self::TransportWrite { .. } => ErrorCode::TransportError,
            Self::Compression { .. } => ErrorCode::CompressionError,
            Self::InvalidControlMessage { .. } => ErrorCode::InvalidFormat,
            Self::HeartbeatTimeout { .. } => ErrorCode::HeartbeatTimeout,
            Self::SessionNotFound { .. } => ErrorCode::ResourceNotFound,
            Self::InvalidTransition { .. } => ErrorCode::InvalidState,
            Self::InvalidConfig { .. } => ErrorCode::InvalidInput,
        }
    }

    /// Shorthand for a session lookup miss
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Shorthand for a write to a departed client
    pub fn transport_write(reason: impl Into<String>) -> Self {
        Self::TransportWrite {
            reason: reason.into(),
        }
    }

    /// Shorthand for a malformed client frame
    pub fn invalid_control(reason: impl Into<String>) -> Self {
        Self::InvalidControlMessage {
            reason: reason.into(),
        }
    }

    /// Shorthand for an option validation failure
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

impl From<StreamError> for AppError {
    fn from(error: StreamError) -> Self {
        let code = error.code();
        let message = error.to_string();
        let app_error = Self::new(code, message);
        match error {
            StreamError::SessionNotFound { session_id } => app_error.with_session_id(session_id),
            StreamError::HeartbeatTimeout { connection_id, .. } => {
                app_error.with_connection_id(connection_id)
            }
            StreamError::InvalidConfig { field, .. } => {
                app_error.with_details(serde_json::json!({ "field": field }))
            }
            other @ StreamError::Compression { .. } => app_error.with_source(other),
            _ => app_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_source_failure_is_terminal() {
        assert!(StreamError::SourceFailure {
            message: "boom".into()
        }
        .is_terminal());
        assert!(!StreamError::TransportWrite {
            reason: "closed".into()
        }
        .is_terminal());
        assert!(!StreamError::session_not_found("s1").is_terminal());
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        let app_error = AppError::from(StreamError::session_not_found("s-42"));
        assert_eq!(app_error.http_status(), 404);
        assert_eq!(app_error.context.session_id.as_deref(), Some("s-42"));
    }

    #[test]
    fn test_invalid_config_keeps_field_in_details() {
        let app_error = AppError::from(StreamError::invalid_config(
            "speedMultiplier",
            "must be positive",
        ));
        assert_eq!(app_error.code, ErrorCode::InvalidInput);
        assert_eq!(app_error.context.details["field"], "speedMultiplier");
    }
}
