//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("bad config: {0}")]
    BadConfig(String),

    #[error("not connected")]
    NotConnected,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] lwrp_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] lwrp_transport::TransportError),
}
