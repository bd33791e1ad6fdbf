//! TCP transport implementation
//!
//! Raw TCP transport for LWRP. Bytes are passed through untouched in both
//! directions; line and block framing happen above this layer.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{TransportEvent, TransportReceiver, TransportSender};

/// Default channel buffer size for TCP connections
const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 1000;

/// TCP configuration
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Read buffer size
    pub read_buffer_size: usize,
    /// Keep-alive interval in seconds (0 = disabled)
    pub keepalive_secs: u64,
    /// Connect timeout in seconds (0 = wait for the OS)
    pub connect_timeout_secs: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8192,
            keepalive_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// TCP transport
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            config: TcpConfig::default(),
        }
    }

    pub fn with_config(config: TcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    /// Connect to a device at `host:port`
    ///
    /// The receiver yields [`TransportEvent::Connected`] before any data.
    pub async fn connect(&self, addr: &str) -> Result<(TcpSender, TcpReceiver)> {
        info!("Connecting to TCP: {}", addr);

        let stream = self.open(addr).await?;

        // Enable TCP keepalive if configured
        if self.config.keepalive_secs > 0 {
            let socket = socket2::SockRef::from(&stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(self.config.keepalive_secs));
            if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
                warn!("Failed to enable TCP keepalive: {}", e);
            }
        }
        let _ = stream.set_nodelay(true);

        let connected = Arc::new(Mutex::new(true));
        let shutdown = Arc::new(Notify::new());
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Bytes>(DEFAULT_CHANNEL_BUFFER_SIZE);
        let (incoming_tx, incoming_rx) = mpsc::channel::<TransportEvent>(DEFAULT_CHANNEL_BUFFER_SIZE);

        // Queued before the IO task starts, so it is always the first event
        let _ = incoming_tx.try_send(TransportEvent::Connected);

        let sender = TcpSender {
            tx: outgoing_tx,
            connected: connected.clone(),
            shutdown: shutdown.clone(),
        };
        let receiver = TcpReceiver { rx: incoming_rx };

        let io = IoLoop {
            outgoing_rx,
            incoming_tx,
            connected,
            shutdown,
            read_buffer_size: self.config.read_buffer_size,
        };

        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            io.run(reader, writer).await;
        });

        info!("TCP connected to {}", addr);
        Ok((sender, receiver))
    }

    async fn open(&self, addr: &str) -> Result<TcpStream> {
        let connect = TcpStream::connect(addr);

        let result = if self.config.connect_timeout_secs > 0 {
            let timeout = Duration::from_secs(self.config.connect_timeout_secs);
            tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| TransportError::Timeout)?
        } else {
            connect.await
        };

        result.map_err(|e| TransportError::ConnectionFailed(e.to_string()))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// State owned by the per-connection IO task
struct IoLoop {
    outgoing_rx: mpsc::Receiver<Bytes>,
    incoming_tx: mpsc::Sender<TransportEvent>,
    connected: Arc<Mutex<bool>>,
    shutdown: Arc<Notify>,
    read_buffer_size: usize,
}

impl IoLoop {
    async fn run(mut self, mut reader: OwnedReadHalf, mut writer: OwnedWriteHalf) {
        let mut read_buf = BytesMut::with_capacity(self.read_buffer_size);

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!("TCP connection closed locally");
                    break;
                }

                outgoing = self.outgoing_rx.recv() => {
                    let Some(data) = outgoing else {
                        debug!("TCP sender dropped");
                        break;
                    };

                    if let Err(e) = writer.write_all(&data).await {
                        error!("TCP write error: {}", e);
                        let _ = self.incoming_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                }

                result = reader.read_buf(&mut read_buf) => {
                    match result {
                        Ok(0) => {
                            debug!("TCP connection closed");
                            let _ = self
                                .incoming_tx
                                .send(TransportEvent::Disconnected { reason: None })
                                .await;
                            break;
                        }
                        Ok(_) => {
                            let data = read_buf.split().freeze();
                            if self.incoming_tx.send(TransportEvent::Data(data)).await.is_err() {
                                break;
                            }
                            read_buf.reserve(self.read_buffer_size);
                        }
                        Err(e) => {
                            error!("TCP read error: {}", e);
                            let _ = self.incoming_tx.send(TransportEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                }
            }
        }

        *self.connected.lock() = false;
        let _ = writer.shutdown().await;
    }
}

/// TCP sender for writing bytes
pub struct TcpSender {
    tx: mpsc::Sender<Bytes>,
    connected: Arc<Mutex<bool>>,
    shutdown: Arc<Notify>,
}

#[async_trait]
impl TransportSender for TcpSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !*self.connected.lock() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .send(data)
            .await
            .map_err(|_| TransportError::SendFailed("Channel closed".into()))
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn close(&self) -> Result<()> {
        *self.connected.lock() = false;
        self.shutdown.notify_one();
        Ok(())
    }
}

/// TCP receiver for reading events
pub struct TcpReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for TcpReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_config_default() {
        let config = TcpConfig::default();
        assert_eq!(config.read_buffer_size, 8192);
        assert_eq!(config.keepalive_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_tcp_transport_creation() {
        let transport = TcpTransport::with_config(TcpConfig {
            keepalive_secs: 0,
            ..Default::default()
        });
        assert_eq!(transport.config().keepalive_secs, 0);
    }
}
