//! Shared fixtures: a controller wired to an in-process stub engine

#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use thor_bridge::PipeTransport;
use thor_client::{Controller, ControllerConfig};
use thor_core::Params;
use thor_stub_engine::{Engine, serve_pipe};
use tokio::sync::Mutex;

pub fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

/// Pipe transport connected to a fresh engine over an in-memory duplex
pub fn duplex_transport() -> PipeTransport {
    let engine = Arc::new(Mutex::new(Engine::new("FloorPlan28")));
    let (client, server) = tokio::io::duplex(1 << 22);
    let (server_read, server_write) = tokio::io::split(server);
    tokio::spawn(serve_pipe(engine, server_read, server_write));
    let (client_read, client_write) = tokio::io::split(client);
    PipeTransport::new(client_read, client_write)
}

/// Started controller over an in-process engine
pub async fn controller(config: ControllerConfig) -> Controller {
    let mut controller = Controller::new(config, duplex_transport());
    controller.start().await.unwrap();
    controller
}

pub async fn default_controller() -> Controller {
    controller(ControllerConfig::default()).await
}
