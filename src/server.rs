// ABOUTME: HTTP server assembly and lifecycle for the streaming service
// ABOUTME: Builds the router, spawns heartbeat and idle sweeper tasks, and shuts down gracefully
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Server Lifecycle
//!
//! [`run`] binds the listener, serves the router built by [`router`] and,
//! on Ctrl-C, closes WebSocket connections and stops live sessions before
//! draining in-flight requests.

use crate::config::environment::StreamRuntimeConfig;
use crate::middleware::setup_cors;
use crate::resources::ServerResources;
use crate::routes::HealthRoutes;
use crate::streaming::orchestrator::SessionManager;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Router with every route, CORS and request tracing
pub fn router(resources: &Arc<ServerResources>) -> Router {
    let router = Router::new().merge(HealthRoutes::routes(Arc::clone(resources)));

    #[cfg(feature = "transport-sse")]
    let router = router.merge(crate::routes::StreamRoutes::routes(Arc::clone(resources)));

    #[cfg(feature = "transport-websocket")]
    let router = router.merge(crate::routes::WebSocketRoutes::routes(Arc::clone(
        &resources.websocket_manager,
    )));

    router
        .layer(setup_cors(&resources.config))
        .layer(TraceLayer::new_for_http())
}

/// Evict idle sessions every sweep interval
pub fn start_idle_sweeper(sessions: SessionManager, config: &StreamRuntimeConfig) -> JoinHandle<()> {
    let sweep_every = Duration::from_secs(config.idle_sweep_interval_secs.max(1));
    let max_idle = chrono::Duration::seconds(
        i64::try_from(config.session_idle_timeout_secs).unwrap_or(i64::MAX),
    );
    tokio::spawn(async move {
        let mut ticker = interval(sweep_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = sessions.evict_idle(max_idle);
            debug!(evicted, active = sessions.active_count(), "Idle session sweep");
        }
    })
}

/// Serve until Ctrl-C
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails
pub async fn run(resources: Arc<ServerResources>, port: u16) -> Result<()> {
    let app = router(&resources);
    let heartbeat = resources.connections.start_heartbeat();
    let sweeper = start_idle_sweeper(resources.sessions.clone(), &resources.config.stream);

    let listener = TcpListener::bind((resources.config.http_host.as_str(), port)).await?;
    info!(
        "HTTP server listening on http://{}:{}",
        resources.config.http_host, port
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&resources)))
        .await;

    heartbeat.abort();
    sweeper.abort();
    if let Err(ref e) = result {
        error!("Server error: {}", e);
    }
    result?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(resources: Arc<ServerResources>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    let closed = resources.connections.close_all();
    let stopped = resources.sessions.stop_all();
    info!(
        connections_closed = closed,
        sessions_stopped = stopped,
        "Shutdown signal received"
    );
}
