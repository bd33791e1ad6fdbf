//! Client configuration

use lwrp_core::{ParseMode, DEFAULT_MAX_PENDING, DEFAULT_PORT};
use lwrp_transport::TcpConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Connection settings for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Device host name or IP address
    pub host: String,
    /// Device TCP port, range checked by [`validate`](ClientConfig::validate)
    pub port: u32,
    /// Login password; empty or absent logs in without one
    pub password: Option<String>,
    /// Handling of malformed response lines
    pub parse_mode: ParseMode,
    /// TCP keepalive interval in seconds (0 = disabled)
    pub keepalive_secs: u64,
    /// Cap on bytes buffered for an unfinished line or response block
    pub max_pending_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT.into(),
            password: None,
            parse_mode: ParseMode::default(),
            keepalive_secs: 30,
            max_pending_bytes: DEFAULT_MAX_PENDING,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Check the settings needed to open a connection
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::BadConfig("host is not set".to_string()));
        }
        if self.port == 0 || self.port > u32::from(u16::MAX) {
            return Err(ClientError::BadConfig(format!(
                "port {} must be between 1 and 65535",
                self.port
            )));
        }
        if self.max_pending_bytes == 0 {
            return Err(ClientError::BadConfig(
                "max_pending_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` for the socket
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub(crate) fn tcp_config(&self) -> TcpConfig {
        TcpConfig {
            keepalive_secs: self.keepalive_secs,
            ..Default::default()
        }
    }
}
