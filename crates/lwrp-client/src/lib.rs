//! LWRP Client Library
//!
//! Async client for devices speaking the Livewire Routing Protocol.
//!
//! # Example
//!
//! ```ignore
//! use lwrp_client::{ClientEvent, LwrpClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LwrpClient::builder("192.168.2.10")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     let mut events = client.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         if let ClientEvent::OutputsChanged = event {
//!             println!("Output 1 carries {:?}", client.output_source(1));
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
mod session;
pub mod status;

pub use builder::LwrpClientBuilder;
pub use client::LwrpClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use status::{ClientEvent, ConnectionState, ConnectionStatus};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::LwrpClientBuilder;
    pub use crate::client::LwrpClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{ClientError, Result};
    pub use crate::status::{ClientEvent, ConnectionState, ConnectionStatus};
    pub use lwrp_core::{Destination, ParseMode, ResponseRecord};
}
