//! Pipe serving: one envelope in, one envelope out, until the peer hangs up

use crate::engine::Engine;
use std::sync::Arc;
use thor_bridge::read_envelope;
use thor_core::{Result, ThorError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

fn transport_error(err: std::io::Error) -> ThorError {
    ThorError::Transport(err.to_string())
}

/// Serve requests from `reader`, answering on `writer`
///
/// Returns when the reader reaches end of stream between messages. A stream
/// that ends inside a message is an error. Requests the engine cannot answer
/// get a failed event back and the loop carries on.
pub async fn serve_pipe<R, W>(engine: Arc<Mutex<Engine>>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut served = 0u64;
    loop {
        let pending = reader.fill_buf().await.map_err(transport_error)?;
        if pending.is_empty() {
            info!("Peer closed the pipe after {} requests", served);
            return Ok(());
        }
        let request = read_envelope(&mut reader).await?;
        let response = engine.lock().await.answer(&request)?;
        writer.write_all(&response).await.map_err(transport_error)?;
        writer.flush().await.map_err(transport_error)?;
        served += 1;
        debug!("Served request {}", served);
    }
}

/// Accept controllers on a Unix socket, one task per connection
#[cfg(unix)]
pub async fn serve_unix(engine: Arc<Mutex<Engine>>, path: &std::path::Path) -> Result<()> {
    let listener = tokio::net::UnixListener::bind(path).map_err(transport_error)?;
    info!("Stub engine listening on {}", path.display());
    loop {
        let (stream, _) = listener.accept().await.map_err(transport_error)?;
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            if let Err(e) = serve_pipe(engine, reader, writer).await {
                error!("Connection failed: {}", e);
            }
        });
    }
}
