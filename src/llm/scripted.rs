// ABOUTME: Scripted generation backend replaying fixed increments or echoing the prompt
// ABOUTME: Supports per-increment delays and failure injection for demos and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use async_trait::async_trait;
use std::time::Duration;

use super::{GenerationBackend, GenerationRequest, TextSource};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
enum Script {
    Fixed(Vec<String>),
    Echo,
}

/// Backend producing a predetermined sequence of increments
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Script,
    delay: Option<Duration>,
    fail_after: Option<usize>,
}

impl ScriptedBackend {
    /// Replay `increments` in order for every request
    #[must_use]
    pub fn fixed<I, S>(increments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script::Fixed(increments.into_iter().map(Into::into).collect()),
            delay: None,
            fail_after: None,
        }
    }

    /// Echo the prompt back word by word
    #[must_use]
    pub const fn echo() -> Self {
        Self {
            script: Script::Echo,
            delay: None,
            fail_after: None,
        }
    }

    /// Wait before every increment
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail after yielding `count` increments
    #[must_use]
    pub const fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    fn increments(&self, prompt: &str) -> Vec<String> {
        match &self.script {
            Script::Fixed(increments) => increments.clone(),
            Script::Echo => prompt.split_inclusive(' ').map(str::to_owned).collect(),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        match self.script {
            Script::Fixed(_) => "scripted",
            Script::Echo => "echo",
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<TextSource> {
        let increments = self.increments(&request.prompt);
        let delay = self.delay;
        let fail_after = self.fail_after;
        let total = increments.len();

        Ok(Box::pin(async_stream::stream! {
            for (index, increment) in increments.into_iter().enumerate() {
                if fail_after == Some(index) {
                    yield Err(AppError::external_service("scripted", "injected failure"));
                    return;
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(increment);
            }
            if fail_after.is_some_and(|count| count >= total) {
                yield Err(AppError::external_service("scripted", "injected failure"));
            }
        }))
    }
}
