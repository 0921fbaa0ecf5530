//! Transport abstraction for the controller
//!
//! A transport carries one request envelope to the engine and returns the
//! matching response envelope. Implementations never reorder: the n-th
//! response belongs to the n-th request.

use crate::protocol::{END_OF_MESSAGE, Envelope, Field, FieldType, HEADER_LEN, parse_header};
use async_trait::async_trait;
use std::fmt;
use thor_core::{Result, ThorError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Pipe,
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Pipe => f.write_str("pipe"),
            TransportKind::Http => f.write_str("http"),
        }
    }
}

/// Request/response channel to the engine
#[async_trait]
pub trait Transport: Send {
    /// Send a request envelope and wait for its response
    async fn send(&mut self, request: Envelope) -> Result<Envelope>;

    /// Release the channel and any engine process it owns; idempotent
    async fn close(&mut self) -> Result<()>;

    fn kind(&self) -> TransportKind;
}

fn io_error(context: &str, err: std::io::Error) -> ThorError {
    ThorError::Transport(format!("{context}: {err}"))
}

/// Read one complete envelope from a stream
///
/// Fields may arrive split across any number of reads; each is reassembled
/// with `read_exact` before decoding.
pub async fn read_envelope<R: AsyncRead + Unpin + ?Sized>(reader: &mut R) -> Result<Envelope> {
    let mut envelope = Envelope::new();
    loop {
        let mut header = [0u8; HEADER_LEN];
        reader
            .read_exact(&mut header)
            .await
            .map_err(|e| io_error("read field header failed", e))?;
        let (tag, len) = parse_header(&header)?;
        if tag == END_OF_MESSAGE {
            debug!("[Engine→Rust] fields={}", envelope.fields.len());
            return Ok(envelope);
        }
        let kind = FieldType::try_from(tag)?;

        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| io_error("read field payload failed", e))?;
        envelope.push(Field::new(kind, payload));
    }
}

/// Write one envelope and flush
pub async fn write_envelope<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    envelope: &Envelope,
) -> Result<()> {
    let bytes = envelope.encode()?;
    if let Some(field) = envelope.fields.first() {
        let preview: String = String::from_utf8_lossy(&field.payload)
            .chars()
            .take(200)
            .collect();
        debug!("[Rust→Engine] len={} {:?}={}", bytes.len(), field.kind, preview);
    }
    writer
        .write_all(&bytes)
        .await
        .map_err(|e| io_error("write envelope failed", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_error("flush failed", e))?;
    Ok(())
}
