//! Stub engine binary
//!
//! Serves on stdin/stdout by default. Environment:
//! - `THOR_STUB_SCENE`: scene loaded at startup (default `FloorPlan28`)
//! - `THOR_STUB_LISTEN`: serve HTTP on this address instead of the pipe
//! - `THOR_STUB_SOCKET`: serve on this Unix socket instead of the pipe

use anyhow::Result;
use std::sync::Arc;
use thor_stub_engine::{Engine, serve_http, serve_pipe};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCENE: &str = "FloorPlan28";

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let scene = std::env::var("THOR_STUB_SCENE").unwrap_or_else(|_| DEFAULT_SCENE.to_string());
    let engine = Arc::new(Mutex::new(Engine::new(&scene)));

    if let Ok(listen) = std::env::var("THOR_STUB_LISTEN") {
        let addr = serve_http(engine, listen.parse()?).await?;
        info!("Serving HTTP on {}", addr);
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    #[cfg(unix)]
    if let Ok(path) = std::env::var("THOR_STUB_SOCKET") {
        thor_stub_engine::serve_unix(engine, std::path::Path::new(&path)).await?;
        return Ok(());
    }

    info!("Serving on stdio");
    serve_pipe(engine, tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(())
}
