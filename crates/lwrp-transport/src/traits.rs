//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Events that can occur on a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// Connection closed by the peer, or locally with a reason
    Disconnected { reason: Option<String> },
    /// Bytes received, exactly as read from the socket
    Data(Bytes),
    /// Socket error; the connection is unusable afterwards
    Error(String),
}

/// Trait for sending data
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Queue bytes for a single write
    async fn send(&self, data: Bytes) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn close(&self) -> Result<()>;
}

/// Trait for receiving data
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event, `None` once the connection task has ended
    async fn recv(&mut self) -> Option<TransportEvent>;
}
