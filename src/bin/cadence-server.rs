// ABOUTME: Server binary for the adaptive streaming service
// ABOUTME: Loads environment configuration, applies CLI overrides and runs the HTTP server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! # Cadence Server Binary
//!
//! Starts the SSE and WebSocket streaming server.

use anyhow::Result;
use cadence_server::{
    config::environment::{BackendKind, ServerConfig},
    logging,
    resources::ServerResources,
    server,
};
use cadence_core::constants::endpoints;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cadence-server")]
#[command(about = "Cadence - adaptive streaming of AI output over SSE and WebSocket")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the generation backend (`openai_compatible` or `echo`)
    #[arg(long)]
    backend: Option<BackendKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(backend) = args.backend {
        config.backend.kind = backend;
    }

    logging::init_from_env()?;

    info!("Starting Cadence streaming server");
    info!("{}", config.summary());

    let port = config.http_port;
    let host = config.http_host.clone();
    let resources = Arc::new(ServerResources::new(config)?);
    info!(backend = resources.backend.name(), "Generation backend ready");

    display_available_endpoints(&host, port);

    if let Err(e) = server::run(resources, port).await {
        error!("Server error: {}", e);
        return Err(e);
    }
    Ok(())
}

/// Display the available endpoints
fn display_available_endpoints(host: &str, port: u16) {
    info!("Available endpoints:");
    info!("  GET   http://{host}:{port}{}", endpoints::HEALTH_CHECK);
    info!("  GET   http://{host}:{port}{}", endpoints::READY);
    info!("  POST  http://{host}:{port}{} (SSE)", endpoints::STREAM);
    info!("  GET   http://{host}:{port}{}?prompt=... (SSE)", endpoints::STREAM);
    info!("  POST  http://{host}:{port}/api/stream/:id/{{pause,resume,stop}}");
    info!("  PATCH http://{host}:{port}/api/stream/:id/preferences");
    info!("  GET   ws://{host}:{port}{}", endpoints::WEBSOCKET);
}
