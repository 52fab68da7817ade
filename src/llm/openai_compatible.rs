// ABOUTME: Generation backend for OpenAI-compatible chat completion endpoints
// ABOUTME: Streams /chat/completions deltas from Ollama, vLLM, LocalAI or cloud APIs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # `OpenAI`-Compatible Backend
//!
//! Streams completions from any endpoint implementing the `OpenAI` chat
//! completions API. Only the streaming form is used: every `delta.content`
//! becomes one text increment.
//!
//! ## Configuration
//!
//! - `LLM_BASE_URL`: Base URL (default: <http://localhost:11434/v1> for Ollama)
//! - `LLM_MODEL`: Model to use
//! - `LLM_API_KEY`: API key (optional, empty for local servers)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::sse_parser::text_source;
use super::{GenerationBackend, GenerationRequest, TextSource};
use crate::errors::{AppError, AppResult, ErrorCode};

/// Connection timeout for local servers (more lenient than cloud)
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request timeout (local inference can be slower)
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Name used in logs and error messages
const BACKEND_NAME: &str = "openai_compatible";

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// Configuration for the `OpenAI`-compatible backend
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL for the API (e.g., <http://localhost:11434/v1>)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Model used when the request does not name one
    pub default_model: String,
}

/// Streaming backend for `OpenAI`-compatible endpoints
pub struct OpenAiCompatibleBackend {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleBackend {
    /// Create a backend with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        let detail = serde_json::from_str::<OpenAiErrorResponse>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |response| response.error.message,
        );
        match status.as_u16() {
            502..=504 => AppError::new(
                ErrorCode::ExternalServiceUnavailable,
                format!("{BACKEND_NAME}: server is not responding ({status}): {detail}"),
            ),
            _ => AppError::external_service(BACKEND_NAME, format!("API error ({status}): {detail}")),
        }
    }

    fn parse_delta(data: &str) -> Option<AppResult<String>> {
        match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .map(Ok),
            Err(e) => {
                warn!(error = %e, "Failed to parse stream chunk");
                None
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    #[instrument(skip(self, request), fields(model = %request.options.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn generate(&self, request: &GenerationRequest) -> AppResult<TextSource> {
        let model = request
            .options
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = request.options.system_prompt.as_deref() {
            messages.push(OpenAiMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(OpenAiMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = OpenAiRequest {
            model,
            messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream: true,
        };

        debug!(base_url = %self.config.base_url, "Sending streaming chat completion request");

        let http_request = self.client.post(self.api_url("chat/completions")).json(&body);
        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send streaming request");
                if e.is_connect() {
                    AppError::new(
                        ErrorCode::ExternalServiceUnavailable,
                        format!(
                            "Cannot connect to {BACKEND_NAME}. Is the server running at {}?",
                            self.config.base_url
                        ),
                    )
                } else {
                    AppError::external_service(BACKEND_NAME, format!("Failed to connect: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error_response(status, &body));
        }

        Ok(text_source(
            response.bytes_stream(),
            Self::parse_delta,
            BACKEND_NAME,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> AppResult<bool> {
        let http_request = self.client.get(self.api_url("models"));
        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(|e| AppError::external_service(BACKEND_NAME, format!("Health check failed: {e}")))?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!(status = %response.status(), "Backend health check failed");
        }
        Ok(healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta_extracts_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        assert_eq!(
            OpenAiCompatibleBackend::parse_delta(data).map(Result::unwrap),
            Some("Hi".to_owned())
        );
        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(OpenAiCompatibleBackend::parse_delta(role_only).is_none());
    }

    #[test]
    fn test_gateway_errors_are_unavailable() {
        let error = OpenAiCompatibleBackend::parse_error_response(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream down",
        );
        assert_eq!(error.code, ErrorCode::ExternalServiceUnavailable);
        let error = OpenAiCompatibleBackend::parse_error_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"bad model"}}"#,
        );
        assert!(error.message.contains("bad model"));
    }
}
