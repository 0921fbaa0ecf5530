//! HTTP endpoint for the stub engine using Axum.

use crate::engine::Engine;
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use thor_bridge::{Envelope, MAX_FIELD_LEN};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Shared engine behind the HTTP handlers
pub type SharedEngine = Arc<Mutex<Engine>>;

const ENVELOPE_CONTENT_TYPE: &str = "application/octet-stream";

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_step(State(engine): State<SharedEngine>, body: Bytes) -> Response {
    let request = match Envelope::decode(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Undecodable request body: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let response = engine.lock().await.answer(&request);
    match response {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to answer step: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Routes served by the stub engine
pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/step", post(handle_step))
        .layer(DefaultBodyLimit::max(MAX_FIELD_LEN))
        .with_state(engine)
}

/// Start the HTTP endpoint.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn serve_http(engine: SharedEngine, addr: SocketAddr) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;
    info!("Stub engine listening on http://{}", actual_addr);

    let app = router(engine);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
