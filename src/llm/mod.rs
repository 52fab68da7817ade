// ABOUTME: Generation backend abstraction producing ordered text increments for sessions
// ABOUTME: Defines the backend contract plus OpenAI-compatible and scripted implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Generation Backends
//!
//! A session pulls its raw output from a [`GenerationBackend`]. The backend
//! turns a prompt into a [`TextSource`]: a lazy, finite, non-restartable
//! stream of text increments. Exhaustion is the end of the stream; an `Err`
//! item is a source failure that ends the session.
//!
//! ## Example: Draining a Source
//!
//! ```rust,no_run
//! use cadence_server::llm::{GenerationBackend, GenerationRequest, ScriptedBackend};
//! use futures_util::StreamExt;
//!
//! # async fn example() -> cadence_server::errors::AppResult<()> {
//! let backend = ScriptedBackend::echo();
//! let mut source = backend.generate(&GenerationRequest::new("Hello there")).await?;
//! while let Some(increment) = source.next().await {
//!     print!("{}", increment?);
//! }
//! # Ok(())
//! # }
//! ```

mod openai_compatible;
mod scripted;
pub mod sse_parser;

pub use openai_compatible::{OpenAiCompatibleBackend, OpenAiCompatibleConfig};
pub use scripted::ScriptedBackend;

use crate::config::environment::{BackendConfig, BackendKind};
use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

/// Ordered text increments of one generation
pub type TextSource = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Optional generation parameters forwarded to the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    /// Model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// System prompt prepended to the conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Input of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,
    /// Generation parameters
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Request with default options
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: GenerationOptions::default(),
        }
    }

    /// Set generation options
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Source of generated text
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier for logging
    fn name(&self) -> &'static str;

    /// Start a generation
    ///
    /// # Errors
    ///
    /// Returns an error if the generation cannot be started
    async fn generate(&self, request: &GenerationRequest) -> AppResult<TextSource>;

    /// Whether the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the health probe itself fails
    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Build the backend selected by configuration
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created
pub fn backend_from_config(config: &BackendConfig) -> AppResult<Arc<dyn GenerationBackend>> {
    match config.kind {
        BackendKind::Echo => Ok(Arc::new(ScriptedBackend::echo())),
        BackendKind::OpenAiCompatible => {
            let backend = OpenAiCompatibleBackend::new(OpenAiCompatibleConfig {
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                default_model: config.model.clone(),
            })?;
            Ok(Arc::new(backend))
        }
    }
}
