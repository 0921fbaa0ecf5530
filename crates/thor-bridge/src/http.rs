//! HTTP transport: one POST per step

use crate::protocol::Envelope;
use crate::transport::{Transport, TransportKind};
use async_trait::async_trait;
use thor_core::{Result, ThorError};
use tracing::{debug, error, info};

/// Path the engine serves steps on
pub const STEP_PATH: &str = "/step";

/// Content type of encoded envelopes
pub const ENVELOPE_CONTENT_TYPE: &str = "application/octet-stream";

/// Posts encoded envelopes to `{base_url}/step`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    step_url: String,
    closed: bool,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ThorError::Transport(format!("http client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing connection pool
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let step_url = format!("{}{STEP_PATH}", base_url.trim_end_matches('/'));
        info!("HTTP transport targeting {}", step_url);
        Self {
            client,
            step_url,
            closed: false,
        }
    }

    pub fn step_url(&self) -> &str {
        &self.step_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&mut self, request: Envelope) -> Result<Envelope> {
        if self.closed {
            return Err(ThorError::Transport("http transport is closed".into()));
        }
        let body = request.encode()?;
        debug!("[Rust→Engine] POST {} len={}", self.step_url, body.len());

        let response = self
            .client
            .post(&self.step_url)
            .header(reqwest::header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("POST {} failed: {}", self.step_url, e);
                ThorError::Transport(format!("POST {} failed: {e}", self.step_url))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Engine returned {}: {}", status, text);
            return Err(ThorError::Transport(format!(
                "engine returned {status}: {text}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ThorError::Transport(format!("read response body: {e}")))?;
        debug!("[Engine→Rust] len={}", bytes.len());
        Envelope::decode(&bytes)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }
}
