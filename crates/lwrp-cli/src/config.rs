//! Connection settings: TOML file, then environment, then flags

use anyhow::{Context, Result};
use clap::Args;
use lwrp_client::ClientConfig;
use lwrp_core::ParseMode;
use std::path::Path;

/// Device connection flags shared by all device commands
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Device host name or IP address
    #[arg(short = 'H', long, env = "LWRP_HOST", global = true)]
    pub host: Option<String>,

    /// Device TCP port
    #[arg(short, long, env = "LWRP_PORT", global = true)]
    pub port: Option<u16>,

    /// Login password
    #[arg(long, env = "LWRP_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Fail whole response blocks on malformed lines
    #[arg(long, global = true)]
    pub strict: bool,
}

/// Load the optional config file
pub fn load_file(path: &Path) -> Result<ClientConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Apply flag and environment overrides on top of a base configuration
pub fn merge(mut config: ClientConfig, args: &ConnectionArgs) -> ClientConfig {
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port.into();
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }
    if args.strict {
        config.parse_mode = ParseMode::Strict;
    }
    config
}

/// Resolve the effective client configuration
pub fn resolve(path: Option<&Path>, args: &ConnectionArgs) -> Result<ClientConfig> {
    let base = match path {
        Some(path) => load_file(path)?,
        None => ClientConfig::default(),
    };
    Ok(merge(base, args))
}
