//! Connection state and client events

use lwrp_core::ResponseRecord;
use serde::Serialize;
use std::fmt;

/// Lifecycle state of a client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Socket open, login and subscription commands being sent
    AuthenticatingAndSubscribing,
    Ready,
    Error,
    BadConfig,
}

impl ConnectionState {
    /// Whether the socket is open for commands
    pub fn is_open(self) -> bool {
        matches!(
            self,
            ConnectionState::AuthenticatingAndSubscribing | ConnectionState::Ready
        )
    }
}

/// Status reported to the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Ok,
    BadConfig,
    ConnectionFailure,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Ok => "ok",
            ConnectionStatus::BadConfig => "bad_config",
            ConnectionStatus::ConnectionFailure => "connection_failure",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event broadcast to client subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection status changed
    Status {
        status: ConnectionStatus,
        message: Option<String>,
    },
    /// Records parsed from one response unit, in wire order
    Records(Vec<ResponseRecord>),
    /// The output cache was updated; routing feedback should be re-evaluated
    OutputsChanged,
}

impl ClientEvent {
    pub fn status(status: ConnectionStatus, message: Option<String>) -> Self {
        ClientEvent::Status { status, message }
    }
}
