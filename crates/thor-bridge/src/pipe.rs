//! Framed pipe transport
//!
//! One request envelope is written, then one response envelope is read, on a
//! persistent duplex stream. There is no background reader: responses are
//! consumed in the same call that wrote the request, which keeps the FIFO
//! pairing trivially correct.

use crate::process::{EngineCommand, EngineProcess};
use crate::protocol::Envelope;
use crate::transport::{Transport, TransportKind, read_envelope, write_envelope};
use async_trait::async_trait;
use std::path::Path;
use thor_core::{Result, ThorError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct PipeTransport {
    reader: BoxReader,
    writer: BoxWriter,
    process: Option<EngineProcess>,
    poisoned: bool,
    closed: bool,
}

impl PipeTransport {
    /// Wrap an existing stream pair
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            process: None,
            poisoned: false,
            closed: false,
        }
    }

    /// Connect to an engine listening on a Unix domain socket
    #[cfg(unix)]
    pub async fn connect_unix(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = tokio::net::UnixStream::connect(path).await.map_err(|e| {
            ThorError::Transport(format!("connect {} failed: {e}", path.display()))
        })?;
        info!("Connected to engine socket {}", path.display());
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer))
    }

    /// Spawn an engine and talk to it over its stdio
    pub fn spawn(command: &EngineCommand) -> Result<Self> {
        let mut process = command.spawn()?;
        let (stdout, stdin) = process.take_stdio()?;
        let mut transport = Self::new(stdout, stdin);
        transport.process = Some(process);
        Ok(transport)
    }

    /// Engine process owned by this transport, if any
    pub fn process(&self) -> Option<&EngineProcess> {
        self.process.as_ref()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    async fn exchange(&mut self, request: &Envelope) -> Result<Envelope> {
        write_envelope(&mut self.writer, request).await?;
        read_envelope(&mut self.reader).await
    }
}

#[async_trait]
impl Transport for PipeTransport {
    async fn send(&mut self, request: Envelope) -> Result<Envelope> {
        if self.closed {
            return Err(ThorError::Transport("pipe is closed".into()));
        }
        if self.poisoned {
            return Err(ThorError::Transport(
                "pipe is unusable after an earlier failure".into(),
            ));
        }

        match self.exchange(&request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // A half-read response would desynchronise every later exchange
                self.poisoned = true;
                error!("Pipe exchange failed: {}", e);
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.writer.shutdown().await {
            debug!("Pipe shutdown: {}", e);
        }
        if let Some(mut process) = self.process.take() {
            process.kill().await?;
        }
        info!("Pipe transport closed");
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Pipe
    }
}

impl std::fmt::Debug for PipeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeTransport")
            .field("process", &self.process)
            .field("poisoned", &self.poisoned)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FieldType;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_exchange_over_duplex() {
        let (client, server) = duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (mut server_read, mut server_write) = tokio::io::split(server);

        let echo = tokio::spawn(async move {
            let request = read_envelope(&mut server_read).await.unwrap();
            let payload = request.first(FieldType::Action).unwrap().payload.clone();
            let response = Envelope::new().with(FieldType::Metadata, payload);
            write_envelope(&mut server_write, &response).await.unwrap();
        });

        let mut transport = PipeTransport::new(client_read, client_write);
        let response = transport
            .send(Envelope::new().with(FieldType::Action, b"{\"action\":\"Pass\"}".to_vec()))
            .await
            .unwrap();
        echo.await.unwrap();

        assert_eq!(
            response.first(FieldType::Metadata).unwrap().payload,
            b"{\"action\":\"Pass\"}"
        );
    }

    #[tokio::test]
    async fn test_broken_pipe_poisons_transport() {
        let (client, server) = duplex(64);
        drop(server);
        let (client_read, client_write) = tokio::io::split(client);
        let mut transport = PipeTransport::new(client_read, client_write);

        let err = transport.send(Envelope::new()).await.unwrap_err();
        assert!(matches!(err, ThorError::Transport(_)));
        assert!(transport.is_poisoned());

        let again = transport.send(Envelope::new()).await.unwrap_err();
        assert!(again.to_string().contains("earlier failure"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, _server) = duplex(64);
        let (client_read, client_write) = tokio::io::split(client);
        let mut transport = PipeTransport::new(client_read, client_write);

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        let err = transport.send(Envelope::new()).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
