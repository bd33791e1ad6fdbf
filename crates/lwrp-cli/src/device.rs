//! Commands that talk to a device

use anyhow::{bail, Context, Result};
use colored::Colorize;
use lwrp_client::{ClientConfig, ClientEvent, ConnectionStatus, LwrpClient};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::output;

type Events = broadcast::Receiver<ClientEvent>;

/// Connect and wait until login and subscription have been sent
async fn connect(config: ClientConfig, ready_timeout: Duration) -> Result<(LwrpClient, Events)> {
    let address = config.address();
    let client = LwrpClient::new(config);
    let mut events = client.subscribe();

    client
        .connect()
        .await
        .context("Invalid connection settings")?;

    let deadline = Instant::now() + ready_timeout;
    loop {
        let event = match timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(RecvError::Lagged(_))) => continue,
            Ok(Err(RecvError::Closed)) => bail!("Client closed"),
            Err(_) => bail!("Timed out connecting to {}", address),
        };

        if let ClientEvent::Status { status, message } = event {
            match status {
                ConnectionStatus::Ok => break,
                ConnectionStatus::Connecting => {}
                _ => bail!(
                    "Connecting to {} failed: {}",
                    address,
                    message.unwrap_or_else(|| status.to_string())
                ),
            }
        }
    }

    eprintln!("{} Connected to {}", "LWRP".cyan().bold(), address);
    Ok((client, events))
}

/// Wait for an event matching `check` until the deadline
async fn wait_event<F>(events: &mut Events, deadline: Instant, mut check: F) -> Result<bool>
where
    F: FnMut(&ClientEvent) -> bool,
{
    loop {
        match timeout_at(deadline, events.recv()).await {
            Ok(Ok(ClientEvent::Status {
                status: status @ (ConnectionStatus::ConnectionFailure | ConnectionStatus::Disconnected),
                message,
            })) => bail!(
                "Connection lost: {}",
                message.unwrap_or_else(|| status.to_string())
            ),
            Ok(Ok(event)) => {
                if check(&event) {
                    return Ok(true);
                }
            }
            Ok(Err(RecvError::Lagged(n))) => debug!("Skipped {} events", n),
            Ok(Err(RecvError::Closed)) => bail!("Client closed"),
            Err(_) => return Ok(false),
        }
    }
}

pub async fn monitor(
    config: ClientConfig,
    ready_timeout: Duration,
    json: bool,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let (client, mut events) = connect(config, ready_timeout).await?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,

            event = events.recv() => match event {
                Ok(ClientEvent::Records(records)) => {
                    for record in &records {
                        if json {
                            println!("{}", serde_json::to_string(record)?);
                        } else {
                            println!("{}", output::record_line(record));
                        }
                    }
                }
                Ok(ClientEvent::Status { status, message }) => {
                    eprintln!("{}", output::status_line(status, message.as_deref()));
                    if matches!(
                        status,
                        ConnectionStatus::ConnectionFailure | ConnectionStatus::Disconnected
                    ) {
                        break;
                    }
                }
                Ok(ClientEvent::OutputsChanged) => {}
                Err(RecvError::Lagged(n)) => warn!("Output fell behind, skipped {} events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.destroy().await;
    Ok(())
}

pub async fn route(
    config: ClientConfig,
    ready_timeout: Duration,
    output: u32,
    source: &str,
    wait: Duration,
) -> Result<()> {
    let (client, mut events) = connect(config, ready_timeout).await?;

    client
        .route_output(output, source)
        .await
        .with_context(|| format!("Failed to route {} to output {}", source, output))?;

    let deadline = Instant::now() + wait;
    let confirmed = client.output_carries(output, source)
        || wait_event(&mut events, deadline, |event| {
            matches!(event, ClientEvent::OutputsChanged) && client.output_carries(output, source)
        })
        .await?;

    client.destroy().await;

    if !confirmed {
        bail!("Device did not confirm routing within {:?}", wait);
    }

    println!(
        "{} Output {} now carries {}",
        "LWRP".cyan().bold(),
        output,
        source.green()
    );
    Ok(())
}

pub async fn send(
    config: ClientConfig,
    ready_timeout: Duration,
    command: &str,
    window: Duration,
) -> Result<()> {
    let (client, mut events) = connect(config, ready_timeout).await?;

    // Drop the initial routing dump so only responses to the command show
    while events.try_recv().is_ok() {}

    client
        .send_command(command)
        .await
        .with_context(|| format!("Failed to send {:?}", command))?;

    let deadline = Instant::now() + window;
    wait_event(&mut events, deadline, |event| {
        if let ClientEvent::Records(records) = event {
            for record in records {
                println!("{}", output::record_line(record));
            }
        }
        false
    })
    .await?;

    client.destroy().await;
    Ok(())
}

pub async fn outputs(config: ClientConfig, ready_timeout: Duration) -> Result<()> {
    let (client, mut events) = connect(config, ready_timeout).await?;

    let deadline = Instant::now() + ready_timeout;
    let received = !client.outputs().is_empty()
        || wait_event(&mut events, deadline, |event| {
            matches!(event, ClientEvent::OutputsChanged)
        })
        .await?;

    if !received {
        client.destroy().await;
        bail!("Device reported no outputs");
    }

    println!("{}", format!("{:>5}  {:<24}  {}", "OUT", "SOURCE", "NAME").bold());
    for dst in client.outputs() {
        let source = client.output_source(dst.num);
        println!("{}", output::output_line(&dst, source.as_deref()));
    }

    client.destroy().await;
    Ok(())
}
