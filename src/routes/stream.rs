// ABOUTME: SSE streaming endpoint and HTTP session control routes
// ABOUTME: Starts sessions over Server-Sent Events and exposes pause/resume/stop/preferences by id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Stream Routes
//!
//! - `POST /api/stream` with a JSON body, or `GET /api/stream?prompt=...`,
//!   answers with a `text/event-stream` body. The session id is returned in
//!   the `x-session-id` header.
//! - `GET /api/stream/:session_id` returns a snapshot.
//! - `POST /api/stream/:session_id/{pause,resume,stop}` and
//!   `PATCH /api/stream/:session_id/preferences` control a running session.

use crate::config::streaming::{PreferencesUpdate, StreamingConfig};
use crate::errors::{AppError, AppResult};
use crate::llm::GenerationOptions;
use crate::resources::ServerResources;
use crate::sse::{event_body, BodyOptions, SseSink};
use crate::streaming::compression::{negotiate, parse_accept_encoding, Codec, StreamEncoder};
use crate::streaming::orchestrator::StartRequest;
use crate::streaming::session::SessionSnapshot;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        header::{
            ACCEPT_ENCODING, CACHE_CONTROL, CONNECTION, CONTENT_ENCODING, CONTENT_TYPE, VARY,
        },
        HeaderMap,
    },
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use cadence_core::constants::{endpoints, wire::SESSION_ID_HEADER};
use serde::Deserialize;
use std::sync::Arc;

/// Query string of `GET /api/stream`
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// User prompt
    pub prompt: String,
    /// Model override
    pub model: Option<String>,
}

/// Stream routes implementation
pub struct StreamRoutes;

impl StreamRoutes {
    /// Create the SSE and control routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                endpoints::STREAM,
                post(Self::start_from_body).get(Self::start_from_query),
            )
            .route("/api/stream/:session_id", get(Self::snapshot))
            .route("/api/stream/:session_id/pause", post(Self::pause))
            .route("/api/stream/:session_id/resume", post(Self::resume))
            .route("/api/stream/:session_id/stop", post(Self::stop))
            .route(
                "/api/stream/:session_id/preferences",
                patch(Self::update_preferences),
            )
            .with_state(resources)
    }

    async fn start_from_body(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<StartRequest>,
    ) -> AppResult<Response> {
        Self::open_stream(&resources, &headers, request)
    }

    async fn start_from_query(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<StreamQuery>,
    ) -> AppResult<Response> {
        let request = StartRequest {
            prompt: query.prompt,
            generation: GenerationOptions {
                model: query.model,
                ..GenerationOptions::default()
            },
            ..StartRequest::default()
        };
        Self::open_stream(&resources, &headers, request)
    }

    fn open_stream(
        resources: &ServerResources,
        headers: &HeaderMap,
        request: StartRequest,
    ) -> AppResult<Response> {
        let config = StreamingConfig::default().apply(&request.streaming)?;
        let codec = if config.compression_enabled {
            headers
                .get(ACCEPT_ENCODING)
                .and_then(|value| value.to_str().ok())
                .map_or(Codec::None, |header| {
                    negotiate(&parse_accept_encoding(header))
                })
        } else {
            Codec::None
        };

        let (sink, rx) = SseSink::channel();
        let session_id = resources.sessions.start(request, Box::new(sink))?;
        let options = BodyOptions::from_config(&config, resources.config.stream.sse_keep_alive());
        let body = event_body(rx, options, StreamEncoder::new(codec));

        let mut builder = Response::builder()
            .header(CONTENT_TYPE, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive")
            .header(VARY, "accept-encoding")
            .header(SESSION_ID_HEADER, session_id.as_str());
        if let Some(encoding) = codec.content_encoding() {
            builder = builder.header(CONTENT_ENCODING, encoding);
        }
        builder
            .body(Body::from_stream(body))
            .map_err(|e| AppError::internal(format!("Failed to build SSE response: {e}")))
    }

    async fn snapshot(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
    ) -> AppResult<Json<SessionSnapshot>> {
        Ok(Json(resources.sessions.snapshot(&session_id)?))
    }

    async fn pause(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
    ) -> AppResult<Json<SessionSnapshot>> {
        Ok(Json(resources.sessions.pause(&session_id)?))
    }

    async fn resume(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
    ) -> AppResult<Json<SessionSnapshot>> {
        Ok(Json(resources.sessions.resume(&session_id)?))
    }

    async fn stop(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
    ) -> AppResult<Json<SessionSnapshot>> {
        Ok(Json(resources.sessions.stop(&session_id)?))
    }

    async fn update_preferences(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
        Json(update): Json<PreferencesUpdate>,
    ) -> AppResult<Json<SessionSnapshot>> {
        Ok(Json(
            resources.sessions.update_preferences(&session_id, &update)?,
        ))
    }
}
