// ABOUTME: Session manager and per-session runner driving generation, chunking, pacing and emission
// ABOUTME: Applies pause/resume/stop and live preference changes through a shared session map
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Session Orchestrator
//!
//! [`SessionManager`] owns the map of live sessions and accepts control
//! operations. Every started session gets its own runner task which:
//!
//! 1. moves to `thinking` and starts the generation backend,
//! 2. drains the text source (`processing` after the first increment),
//! 3. chunks and paces the complete output, then announces totals,
//! 4. emits chunks in order, pausing between them,
//! 5. reports completion metrics and removes the session.
//!
//! The runner observes control changes through a `watch` channel. Before every
//! chunk, and before every character in variable-speed mode, it passes a
//! control point that blocks while the session is paused and exits once it is
//! stopped. Pacing sleeps and source awaits race the same channel, so a stop
//! takes effect without waiting for them.

use super::chunker::{Chunk, SemanticChunker};
use super::frames::{
    ChunkPayload, CompletePayload, MetadataPayload, ProgressPayload, ServerFrame, StreamMetrics,
    TypingPayload,
};
use super::indicators::{ProgressTracker, TypingIndicator, TypingPhase};
use super::pacing::PacingEngine;
use super::session::{Session, SessionId, SessionSnapshot, SessionStatus};
use super::sink::TransportSink;
use crate::config::environment::StreamRuntimeConfig;
use crate::config::streaming::{
    PreferencesUpdate, StreamingConfig, StreamingOptions, UxConfig, UxOptions,
};
use crate::errors::{AppError, AppResult, StreamError};
use crate::llm::{GenerationBackend, GenerationOptions, GenerationRequest};
use crate::logging::StreamLogger;
use cadence_core::constants::limits::MAX_PROMPT_BYTES;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::StreamExt;
use serde::Deserialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything needed to start a session
///
/// Deserializes from the `start_stream` message and the `POST /api/stream` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// User prompt
    pub prompt: String,
    /// Generation parameters
    #[serde(default, rename = "options")]
    pub generation: GenerationOptions,
    /// Streaming options
    #[serde(default, rename = "streamingConfig")]
    pub streaming: StreamingOptions,
    /// UX options
    #[serde(default, rename = "uxConfig")]
    pub ux: UxOptions,
    /// Owning WebSocket connection
    #[serde(skip)]
    pub connection_id: Option<String>,
}

impl StartRequest {
    /// Request with default options
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Runtime settings shared by all sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Fallback poll while paused
    pub pause_poll_interval: Duration,
}

impl From<&StreamRuntimeConfig> for SessionSettings {
    fn from(config: &StreamRuntimeConfig) -> Self {
        Self {
            pause_poll_interval: config.pause_poll_interval(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&StreamRuntimeConfig::default())
    }
}

struct SessionHandle {
    session: Mutex<Session>,
    status: watch::Sender<SessionStatus>,
}

impl SessionHandle {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, status: SessionStatus) {
        self.status.send_replace(status);
    }
}

type SessionMap = DashMap<SessionId, Arc<SessionHandle>>;

/// Owns live sessions and routes control operations to them
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<SessionMap>,
    backend: Arc<dyn GenerationBackend>,
    settings: SessionSettings,
}

impl SessionManager {
    /// Manager pulling text from `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            backend,
            settings,
        }
    }

    fn handle(&self, session_id: &str) -> Result<Arc<SessionHandle>, StreamError> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StreamError::session_not_found(session_id))
    }

    /// Validate a request and spawn its runner
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt is empty or too long, or an option is invalid
    pub fn start(&self, request: StartRequest, sink: Box<dyn TransportSink>) -> AppResult<SessionId> {
        if request.prompt.trim().is_empty() {
            return Err(AppError::invalid_input("prompt must not be empty"));
        }
        if request.prompt.len() > MAX_PROMPT_BYTES {
            return Err(AppError::invalid_input(format!(
                "prompt exceeds {MAX_PROMPT_BYTES} bytes"
            )));
        }
        let config = StreamingConfig::default().apply(&request.streaming)?;
        let ux = UxConfig::default().apply(&request.ux);

        let session_id = Uuid::new_v4().to_string();
        let transport = sink.transport();
        let session = Session::new(
            session_id.clone(),
            transport,
            config,
            ux,
            request.connection_id,
        );
        let (status_tx, status_rx) = watch::channel(SessionStatus::Created);
        let handle = Arc::new(SessionHandle {
            session: Mutex::new(session),
            status: status_tx,
        });
        self.sessions.insert(session_id.clone(), Arc::clone(&handle));
        StreamLogger::session_started(&session_id, transport, request.prompt.len());

        let runner = SessionRunner {
            sessions: Arc::clone(&self.sessions),
            backend: Arc::clone(&self.backend),
            handle,
            status_rx,
            sink,
            request: GenerationRequest::new(request.prompt).with_options(request.generation),
            session_id: session_id.clone(),
            poll: self.settings.pause_poll_interval,
            typing: TypingIndicator::new(),
            active_phase: TypingPhase::Thinking,
            pause_announced: false,
            started: Instant::now(),
        };
        let span = info_span!("stream_session", session_id = %session_id, transport = %transport);
        tokio::spawn(runner.run().instrument(span));

        Ok(session_id)
    }

    fn control(
        &self,
        session_id: &str,
        action: &str,
        apply: impl FnOnce(&mut Session) -> Result<bool, StreamError>,
    ) -> Result<SessionSnapshot, StreamError> {
        let handle = self.handle(session_id)?;
        let (changed, snapshot) = {
            let mut session = handle.lock();
            let changed = apply(&mut session)?;
            (changed, session.snapshot())
        };
        if changed {
            handle.publish(snapshot.status);
            StreamLogger::control_applied(session_id, action, snapshot.status);
        }
        Ok(snapshot)
    }

    /// Block emission until resumed
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or finished session
    pub fn pause(&self, session_id: &str) -> Result<SessionSnapshot, StreamError> {
        self.control(session_id, "pause", Session::pause)
    }

    /// Continue a paused session
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or finished session
    pub fn resume(&self, session_id: &str) -> Result<SessionSnapshot, StreamError> {
        self.control(session_id, "resume", Session::resume)
    }

    /// Stop a session; nothing further is emitted for it
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown session
    pub fn stop(&self, session_id: &str) -> Result<SessionSnapshot, StreamError> {
        self.control(session_id, "stop", Session::stop)
    }

    /// Apply new preferences to a running session
    ///
    /// Pacing, emission mode and UX toggles take effect from the next chunk.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or finished session or an invalid option
    pub fn update_preferences(
        &self,
        session_id: &str,
        update: &PreferencesUpdate,
    ) -> Result<SessionSnapshot, StreamError> {
        self.control(session_id, "update_preferences", |session| {
            if session.status().is_terminal() {
                return Err(StreamError::InvalidTransition {
                    from: session.status().as_str(),
                    to: session.status().as_str(),
                });
            }
            let (config, ux) = update.apply(&session.config, &session.ux)?;
            session.config = config;
            session.ux = ux;
            session.touch();
            Ok(false)
        })
    }

    /// Current view of a session
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown session
    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, StreamError> {
        Ok(self.handle(session_id)?.lock().snapshot())
    }

    /// Watch a session's status
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown session
    pub fn subscribe_status(
        &self,
        session_id: &str,
    ) -> Result<watch::Receiver<SessionStatus>, StreamError> {
        Ok(self.handle(session_id)?.status.subscribe())
    }

    /// Whether the session is still live
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of live sessions
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Stop and drop sessions without activity for longer than `max_idle`
    pub fn evict_idle(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let idle: Vec<(SessionId, Arc<SessionHandle>)> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().lock().last_activity_at() < cutoff)
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        for (session_id, handle) in &idle {
            let stopped = handle.lock().stop().unwrap_or(false);
            if stopped {
                handle.publish(SessionStatus::Stopped);
            }
            self.sessions.remove(session_id);
        }
        if !idle.is_empty() {
            StreamLogger::sessions_evicted(idle.len(), max_idle.num_seconds());
        }
        idle.len()
    }

    /// Stop every live session
    pub fn stop_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter(|id| self.stop(id).is_ok()).count()
    }
}

/// Why a runner left its main loop early
enum Interrupt {
    /// The session was stopped
    Stopped,
    /// The client is gone
    Disconnected,
    /// The source failed
    Failed(AppError),
}

/// Await `future` unless the session is stopped first
async fn until_stopped<F: Future>(
    status: &mut watch::Receiver<SessionStatus>,
    future: F,
) -> Result<F::Output, Interrupt> {
    tokio::pin!(future);
    loop {
        if *status.borrow_and_update() == SessionStatus::Stopped {
            return Err(Interrupt::Stopped);
        }
        tokio::select! {
            output = &mut future => return Ok(output),
            changed = status.changed() => {
                if changed.is_err() {
                    return Err(Interrupt::Stopped);
                }
            }
        }
    }
}

struct SessionRunner {
    sessions: Arc<SessionMap>,
    backend: Arc<dyn GenerationBackend>,
    handle: Arc<SessionHandle>,
    status_rx: watch::Receiver<SessionStatus>,
    sink: Box<dyn TransportSink>,
    request: GenerationRequest,
    session_id: SessionId,
    poll: Duration,
    typing: TypingIndicator,
    active_phase: TypingPhase,
    pause_announced: bool,
    started: Instant,
}

impl SessionRunner {
    async fn run(mut self) {
        match self.drive().await {
            Ok(()) => {}
            Err(Interrupt::Stopped) => debug!("Session stopped"),
            Err(Interrupt::Disconnected) => {
                debug!("Client disconnected, stopping session");
                if self.handle.lock().stop().unwrap_or(false) {
                    self.handle.publish(SessionStatus::Stopped);
                }
            }
            Err(Interrupt::Failed(error)) => self.fail(error),
        }

        let (status, chunks) = {
            let session = self.handle.lock();
            (session.status(), session.cursor.chunks_emitted)
        };
        self.sessions.remove(&self.session_id);
        StreamLogger::session_finished(&self.session_id, status, chunks, self.elapsed_ms());
    }

    async fn drive(&mut self) -> Result<(), Interrupt> {
        self.transition(SessionStatus::Thinking)?;
        let text = self.collect_output().await?;

        let (config, _) = self.settings();
        let mut chunks = SemanticChunker::from_config(&config).chunk(&text);
        if chunks.is_empty() {
            return self.complete(&mut ProgressTracker::new(0)).await;
        }
        let pacing = PacingEngine::from_config(&config);
        pacing.annotate(&mut chunks);

        self.transition(SessionStatus::Streaming)?;
        let total = chunks.len();
        let ux = {
            let mut session = self.handle.lock();
            session.cursor.total_chunks = Some(total);
            session.ux
        };
        self.send(ServerFrame::StreamMetadata(MetadataPayload {
            session_id: self.session_id.clone(),
            total_chunks: total,
            content_length: text.chars().count(),
            estimated_duration_ms: pacing.estimate_duration(&chunks, config.variable_speed),
            ux,
        }))?;

        let mut progress = ProgressTracker::new(total as u64);
        for index in 0..total {
            self.checkpoint().await?;
            let (config, ux) = self.settings();
            let chunk = &chunks[index];
            self.emit_chunk(chunk, &config).await?;

            {
                let mut session = self.handle.lock();
                session.cursor.chunks_emitted = index + 1;
                session.cursor.content_length += chunk.char_count();
                session.touch();
            }
            progress.update(index as u64 + 1);
            if ux.show_progress {
                self.send_progress(&progress)?;
            }

            if let Some(next) = chunks.get(index + 1) {
                let pause = PacingEngine::from_config(&config).boundary_pause(chunk, Some(next));
                self.sleep(pause).await?;
            }
        }

        self.complete(&mut progress).await
    }

    async fn collect_output(&mut self) -> Result<String, Interrupt> {
        let mut source = until_stopped(&mut self.status_rx, self.backend.generate(&self.request))
            .await?
            .map_err(Interrupt::Failed)?;

        let mut text = String::new();
        let mut received_any = false;
        while let Some(increment) = until_stopped(&mut self.status_rx, source.next()).await? {
            let increment = increment.map_err(Interrupt::Failed)?;
            if !received_any {
                received_any = true;
                self.transition(SessionStatus::Processing)?;
            }
            text.push_str(&increment);
            self.handle.lock().touch();
        }
        Ok(text)
    }

    async fn emit_chunk(&mut self, chunk: &Chunk, config: &StreamingConfig) -> Result<(), Interrupt> {
        if !config.variable_speed {
            self.announce_active(TypingPhase::Streaming)?;
            let frame = self.chunk_frame(chunk, chunk.content.clone(), None, true);
            return self.send(frame);
        }

        self.announce_active(TypingPhase::Typing)?;
        let pacing = PacingEngine::from_config(config);
        let char_count = chunk.char_count();
        for (offset, ch) in chunk.content.chars().enumerate() {
            if offset > 0 {
                self.checkpoint().await?;
            }
            let is_last = offset + 1 == char_count;
            let frame = self.chunk_frame(chunk, ch.to_string(), Some(offset), is_last);
            self.send(frame)?;
            if !is_last {
                self.sleep(pacing.char_delay(chunk, ch)).await?;
            }
        }
        Ok(())
    }

    fn chunk_frame(
        &self,
        chunk: &Chunk,
        content: String,
        char_offset: Option<usize>,
        is_final_segment: bool,
    ) -> ServerFrame {
        ServerFrame::ContentChunk(ChunkPayload {
            session_id: self.session_id.clone(),
            sequence_index: chunk.sequence_index,
            content,
            content_type: chunk.content_type,
            compressed: false,
            encoding: None,
            char_offset,
            is_final_segment,
            language: chunk.language.clone(),
            timing: chunk.timing_profile,
            timestamp: Utc::now(),
        })
    }

    async fn complete(&mut self, progress: &mut ProgressTracker) -> Result<(), Interrupt> {
        self.checkpoint().await?;
        let (_, ux) = self.settings();
        progress.complete();
        if ux.show_progress && progress.snapshot().total_steps > 0 {
            self.send_progress(progress)?;
        }

        let cursor = {
            let mut session = self.handle.lock();
            session.cursor.total_chunks.get_or_insert(0);
            session.cursor
        };
        self.transition(SessionStatus::Completed)?;
        self.send(ServerFrame::StreamComplete(CompletePayload {
            session_id: self.session_id.clone(),
            metrics: StreamMetrics {
                total_chunks: cursor.chunks_emitted,
                content_length: cursor.content_length,
                duration_ms: self.elapsed_ms(),
                compression_ratio: self.sink.compression_ratio(),
            },
            timestamp: Utc::now(),
        }))
    }

    fn fail(&mut self, error: AppError) {
        warn!(error = %error, "Generation source failed");
        let frame = ServerFrame::error(Some(self.session_id.clone()), error.code, error.message);
        let frame = self.sink.prepare(frame);
        let mut session = self.handle.lock();
        if session.advance(SessionStatus::Failed).is_err() {
            return;
        }
        self.handle.publish(SessionStatus::Failed);
        if let Err(e) = self.sink.send(frame) {
            debug!(error = %e, "Could not deliver error frame");
        }
    }

    /// Block while paused; exit once stopped
    async fn checkpoint(&mut self) -> Result<(), Interrupt> {
        loop {
            let status = *self.status_rx.borrow_and_update();
            match status {
                SessionStatus::Paused => {
                    if !self.pause_announced {
                        self.pause_announced = true;
                        self.announce(TypingPhase::Paused)?;
                    }
                    if let Ok(Err(_)) = timeout(self.poll, self.status_rx.changed()).await {
                        return Err(Interrupt::Stopped);
                    }
                }
                SessionStatus::Stopped => return Err(Interrupt::Stopped),
                _ => {
                    if self.pause_announced {
                        self.pause_announced = false;
                        self.announce(self.active_phase)?;
                    }
                    return Ok(());
                }
            }
        }
    }

    async fn sleep(&mut self, millis: u64) -> Result<(), Interrupt> {
        if millis == 0 {
            return Ok(());
        }
        until_stopped(
            &mut self.status_rx,
            tokio::time::sleep(Duration::from_millis(millis)),
        )
        .await
    }

    fn transition(&mut self, next: SessionStatus) -> Result<(), Interrupt> {
        let status = {
            let mut session = self.handle.lock();
            match session.advance(next) {
                Ok(()) => session.status(),
                Err(_) if session.status() == SessionStatus::Stopped => {
                    return Err(Interrupt::Stopped)
                }
                Err(e) => return Err(Interrupt::Failed(AppError::from(e))),
            }
        };
        self.handle.publish(status);

        if let Some(phase) = next.typing_phase() {
            self.active_phase = phase;
            if status != SessionStatus::Paused {
                self.announce(phase)?;
            }
        }
        Ok(())
    }

    fn announce_active(&mut self, phase: TypingPhase) -> Result<(), Interrupt> {
        self.active_phase = phase;
        self.announce(phase)
    }

    fn announce(&mut self, phase: TypingPhase) -> Result<(), Interrupt> {
        if !self.typing.set_phase(phase) && phase != TypingPhase::Thinking {
            return Ok(());
        }
        let (_, ux) = self.settings();
        if !ux.show_typing_indicator {
            return Ok(());
        }
        let indicator = self.typing.snapshot();
        self.send(ServerFrame::TypingIndicator(TypingPayload {
            session_id: self.session_id.clone(),
            indicator,
            timestamp: Utc::now(),
        }))
    }

    fn send_progress(&mut self, progress: &ProgressTracker) -> Result<(), Interrupt> {
        self.send(ServerFrame::ProgressIndicator(ProgressPayload {
            session_id: self.session_id.clone(),
            progress: progress.snapshot(),
            timestamp: Utc::now(),
        }))
    }

    /// Deliver a frame unless the session has been stopped
    ///
    /// The status check and the enqueue happen under the session lock, the
    /// same lock `stop` takes, so no frame follows a stop acknowledgement.
    fn send(&mut self, frame: ServerFrame) -> Result<(), Interrupt> {
        let frame = self.sink.prepare(frame);
        let session = self.handle.lock();
        if session.status() == SessionStatus::Stopped {
            return Err(Interrupt::Stopped);
        }
        self.sink.send(frame).map_err(|e| {
            debug!(error = %e, "Transport write failed");
            Interrupt::Disconnected
        })
    }

    fn settings(&self) -> (StreamingConfig, UxConfig) {
        let session = self.handle.lock();
        (session.config.clone(), session.ux)
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
