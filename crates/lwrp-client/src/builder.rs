//! Client builder pattern

use lwrp_core::ParseMode;

use crate::{ClientConfig, LwrpClient, Result};

/// Builder for LwrpClient
pub struct LwrpClientBuilder {
    config: ClientConfig,
}

impl LwrpClientBuilder {
    /// Create a new builder
    pub fn new(host: &str) -> Self {
        Self {
            config: ClientConfig::new(host),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set device port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port.into();
        self
    }

    /// Set login password
    pub fn password(mut self, password: &str) -> Self {
        self.config.password = Some(password.to_string());
        self
    }

    /// Set malformed line handling
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.config.parse_mode = mode;
        self
    }

    /// Set TCP keepalive interval in seconds (0 disables it)
    pub fn keepalive(mut self, secs: u64) -> Self {
        self.config.keepalive_secs = secs;
        self
    }

    /// Cap bytes buffered for an unfinished line or response block
    pub fn max_pending(mut self, bytes: usize) -> Self {
        self.config.max_pending_bytes = bytes;
        self
    }

    /// Build without connecting
    pub fn build(self) -> LwrpClient {
        LwrpClient::new(self.config)
    }

    /// Build and connect
    pub async fn connect(self) -> Result<LwrpClient> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}
