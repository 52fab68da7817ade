// ABOUTME: Health check route handlers for service monitoring
// ABOUTME: Liveness with session/connection counts and readiness backed by the generation backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Health check routes for load balancers and monitoring

use crate::resources::ServerResources;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use cadence_core::constants::endpoints;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(endpoints::HEALTH_CHECK, get(Self::health))
            .route(endpoints::READY, get(Self::ready))
            .with_state(resources)
    }

    async fn health(State(resources): State<Arc<ServerResources>>) -> Json<Value> {
        let uptime_secs = (Utc::now() - resources.started_at).num_seconds();
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "uptimeSecs": uptime_secs,
            "activeSessions": resources.sessions.active_count(),
            "activeConnections": resources.connections.len(),
        }))
    }

    async fn ready(State(resources): State<Arc<ServerResources>>) -> (StatusCode, Json<Value>) {
        let backend_ready = match resources.backend.health_check().await {
            Ok(ready) => ready,
            Err(e) => {
                warn!(backend = resources.backend.name(), error = %e, "Readiness check failed");
                false
            }
        };
        let status = if backend_ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (
            status,
            Json(json!({
                "status": if backend_ready { "ready" } else { "degraded" },
                "timestamp": Utc::now().to_rfc3339(),
                "backend": resources.backend.name(),
                "activeSessions": resources.sessions.active_count(),
                "activeConnections": resources.connections.len(),
            })),
        )
    }
}
