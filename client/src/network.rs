//! Client network layer: async framing and the reader/writer task pair

use crate::peers::{PeerEvent, PeerMap};
use log::{debug, info, warn};
use shared::{payload_size, FrameError, Message, KEY_ESCAPE, MAX_FRAME_SIZE};
use std::io::{self, ErrorKind};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("client task failed: {0}")]
    Task(#[from] JoinError),
}

/// Writes one message in full.
pub async fn send_message<W>(writer: &mut W, message: &Message) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&message.encode()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one message. `Ok(None)` means the peer closed cleanly between
/// messages.
pub async fn recv_message<R>(reader: &mut R) -> Result<Option<Message>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut tag = [0u8; 1];
    match reader.read(&mut tag).await {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::Interrupted => return Err(FrameError::Interrupted),
        Err(e) => return Err(e.into()),
    }

    let size = payload_size(tag[0])?;
    let mut payload = [0u8; MAX_FRAME_SIZE - 1];
    reader.read_exact(&mut payload[..size]).await?;
    Ok(Some(Message::decode(tag[0], &payload[..size])?))
}

/// One connection to the game server.
pub struct Client {
    stream: TcpStream,
    server_addr: String,
}

impl Client {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let server_addr = if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };

        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ClientError::Connect {
                addr: server_addr.clone(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        info!("Connected to {}", server_addr);

        Ok(Self {
            stream,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Runs the session until the server closes the connection or `cancel`
    /// fires.
    ///
    /// Key codes from `keys` are sent to the server; every change to the
    /// peer map is reported on `events`. Returns the final peer map.
    pub async fn run(
        self,
        keys: mpsc::Receiver<u32>,
        events: mpsc::UnboundedSender<PeerEvent>,
        cancel: CancellationToken,
    ) -> Result<PeerMap, ClientError> {
        let (reader, writer) = self.stream.into_split();

        let reader_task = tokio::spawn(read_loop(reader, events, cancel.clone()));
        let writer_task = tokio::spawn(write_loop(writer, keys, cancel.clone()));

        // The reader decides when the session is over; the writer follows.
        let peers = reader_task.await?;
        cancel.cancel();
        let written = writer_task.await?;

        let peers = peers?;
        if let Err(e) = written {
            debug!("Writer stopped with error after session end: {}", e);
        }
        info!("Disconnected from {}", self.server_addr);
        Ok(peers)
    }
}

async fn read_loop<R>(
    mut reader: R,
    events: mpsc::UnboundedSender<PeerEvent>,
    cancel: CancellationToken,
) -> Result<PeerMap, ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut peers = PeerMap::new();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = recv_message(&mut reader) => received,
        };

        match received {
            Ok(Some(message)) => {
                if let Some(event) = peers.apply(message) {
                    if events.send(event).is_err() {
                        debug!("Event receiver dropped");
                    }
                }
            }
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(FrameError::Interrupted) => continue,
            Err(e) => {
                cancel.cancel();
                return Err(e.into());
            }
        }
    }

    cancel.cancel();
    Ok(peers)
}

async fn write_loop<W>(
    mut writer: W,
    mut keys: mpsc::Receiver<u32>,
    cancel: CancellationToken,
) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let key_code = tokio::select! {
            _ = cancel.cancelled() => break,
            key_code = keys.recv() => key_code,
        };

        match key_code {
            Some(key_code) => {
                send_message(&mut writer, &Message::KeyPress { key_code }).await?;
                if key_code == KEY_ESCAPE {
                    debug!("Sent quit, waiting for the server to close");
                    break;
                }
            }
            None => {
                debug!("Input closed");
                break;
            }
        }
    }

    // Half-close: the server sees end of stream and disconnects us, while
    // the reader keeps draining whatever is still in flight.
    if let Err(e) = writer.shutdown().await {
        if e.kind() != ErrorKind::NotConnected {
            warn!("Failed to close write side: {}", e);
        }
    }
    Ok(())
}
