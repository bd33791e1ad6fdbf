//! LWRP CLI - monitor and route LWRP audio-over-IP devices
//!
//! Connects to a device, follows its routing state and sends routing
//! commands. The `addr` and `stream` commands convert stream numbers and
//! multicast addresses offline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lwrp_core::address::{
    address_to_stream_num, format_from_address, stream_num_to_address, StreamFormat,
};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod device;
mod output;

use config::ConnectionArgs;

/// LWRP - Livewire Routing Protocol client
#[derive(Parser)]
#[command(name = "lwrp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Seconds to wait for the device to become ready
    #[arg(long, global = true, default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print status changes and device records until interrupted
    Monitor {
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Route a source to an output and wait for the device to confirm
    Route {
        /// Output number (1-32767)
        #[arg(short, long)]
        output: u32,

        /// Stream number or sip: descriptor
        #[arg(short, long)]
        source: String,

        /// Seconds to wait for confirmation
        #[arg(short, long, default_value = "5")]
        wait: u64,
    },

    /// Send a raw command and print the responses
    Send {
        /// Command words, joined with spaces
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,

        /// Milliseconds to collect responses
        #[arg(short, long, default_value = "1000")]
        window: u64,
    },

    /// List outputs and the source each one carries
    Outputs,

    /// Convert a stream number to its multicast address
    Addr {
        /// Stream number (0-65535)
        stream_num: u32,

        /// Address block (standard, livestream, backfeed_standard, backfeed_livestream, surround)
        #[arg(short, long, default_value = "standard")]
        format: StreamFormat,
    },

    /// Convert a multicast address to its stream number
    Stream {
        /// Dotted-quad address
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.log_level, cli.json_logs)?;

    // Handle Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(()).await;
        }
    });

    let ready_timeout = Duration::from_secs(cli.timeout);
    let device_config = || config::resolve(cli.config.as_deref(), &cli.connection);

    match cli.command {
        Commands::Monitor { json } => {
            device::monitor(device_config()?, ready_timeout, json, &mut shutdown_rx).await?;
        }

        Commands::Route {
            output,
            ref source,
            wait,
        } => {
            device::route(
                device_config()?,
                ready_timeout,
                output,
                source,
                Duration::from_secs(wait),
            )
            .await?;
        }

        Commands::Send {
            ref command,
            window,
        } => {
            device::send(
                device_config()?,
                ready_timeout,
                &command.join(" "),
                Duration::from_millis(window),
            )
            .await?;
        }

        Commands::Outputs => {
            device::outputs(device_config()?, ready_timeout).await?;
        }

        Commands::Addr { stream_num, format } => {
            let address = stream_num_to_address(stream_num, format)
                .with_context(|| format!("Cannot convert stream number {}", stream_num))?;
            println!("{}", address);
        }

        Commands::Stream { ref address } => {
            let stream_num = address_to_stream_num(address)
                .with_context(|| format!("Cannot convert address {}", address))?;
            let ip: Ipv4Addr = address.trim().parse().context("Invalid address")?;
            let format = format_from_address(ip)?;
            println!("{} {}", stream_num, format!("({})", format).dimmed());
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_route() {
        let cli = Cli::try_parse_from([
            "lwrp", "--host", "10.0.0.5", "route", "--output", "3", "--source", "25",
        ])
        .unwrap();

        assert_eq!(cli.connection.host.as_deref(), Some("10.0.0.5"));
        match cli.command {
            Commands::Route { output, source, wait } => {
                assert_eq!(output, 3);
                assert_eq!(source, "25");
                assert_eq!(wait, 5);
            }
            _ => panic!("Expected Route"),
        }
    }

    #[test]
    fn test_parse_addr_format() {
        let cli = Cli::try_parse_from(["lwrp", "addr", "10", "--format", "surround"]).unwrap();
        match cli.command {
            Commands::Addr { stream_num, format } => {
                assert_eq!(stream_num, 10);
                assert_eq!(format, StreamFormat::Surround);
            }
            _ => panic!("Expected Addr"),
        }
    }
}
