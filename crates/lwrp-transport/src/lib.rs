//! LWRP Transport Layer
//!
//! A device connection is a plain TCP stream of newline terminated text.
//! The transport does no framing of its own: received bytes are surfaced
//! as they arrive and outbound buffers are written unchanged, in order.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{TcpConfig, TcpReceiver, TcpSender, TcpTransport};
pub use traits::{TransportEvent, TransportReceiver, TransportSender};
