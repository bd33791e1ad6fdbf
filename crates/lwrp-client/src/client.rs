//! Main LWRP client implementation

use lwrp_core::address::resolve_source;
use lwrp_core::{Command, Destination, MAX_OUTPUT_NUM};
use lwrp_transport::TransportSender;
use parking_lot::RwLock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::builder::LwrpClientBuilder;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::{Session, Shared};
use crate::status::{ClientEvent, ConnectionState, ConnectionStatus};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A connection to one LWRP device
///
/// The client does not reconnect on its own. After a failure call
/// [`connect`](LwrpClient::connect) again, or [`reconfigure`](LwrpClient::reconfigure)
/// with new settings.
pub struct LwrpClient {
    config: RwLock<ClientConfig>,
    shared: Arc<Shared>,
    /// Held across teardown and spawn so only one session is ever live
    session: Mutex<Option<JoinHandle<()>>>,
}

impl LwrpClient {
    /// Create a client without connecting
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: RwLock::new(config),
            shared: Arc::new(Shared::new(EVENT_CHANNEL_CAPACITY)),
            session: Mutex::new(None),
        }
    }

    /// Create a builder
    pub fn builder(host: &str) -> LwrpClientBuilder {
        LwrpClientBuilder::new(host)
    }

    /// Connect to a device on the default port (convenience method)
    pub async fn connect_to(host: &str) -> Result<Self> {
        LwrpClientBuilder::new(host).connect().await
    }

    /// Open the connection
    ///
    /// Returns once the session task is started; login and subscription
    /// happen in the background and are reported as status events. A live
    /// session is torn down first.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let config = self.config.read().clone();
        self.teardown(&mut session).await;

        if let Err(e) = config.validate() {
            error!("Cannot connect: {}", e);
            self.shared.set_state(ConnectionState::BadConfig);
            self.shared
                .publish_status(ConnectionStatus::BadConfig, Some(e.to_string()));
            return Err(e);
        }

        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        let address = config.address();
        info!("Connecting to {}", address);

        self.shared.set_state(ConnectionState::Connecting);
        self.shared.publish_status(ConnectionStatus::Connecting, None);

        let task = Session::new(
            self.shared.clone(),
            epoch,
            address,
            config.tcp_config(),
            config.password.as_deref(),
            config.parse_mode,
            config.max_pending_bytes,
        );
        *session = Some(tokio::spawn(task.run()));

        Ok(())
    }

    /// Close the connection and drop all cached state
    ///
    /// Safe to call any number of times.
    pub async fn destroy(&self) {
        let mut session = self.session.lock().await;
        if !self.teardown(&mut session).await {
            info!("Connection already destroyed");
        }

        if self.shared.set_state(ConnectionState::Disconnected) != ConnectionState::Disconnected {
            self.shared
                .publish_status(ConnectionStatus::Disconnected, None);
            info!("Connection destroyed");
        }
    }

    /// Replace the configuration and reconnect
    pub async fn reconfigure(&self, config: ClientConfig) -> Result<()> {
        self.destroy().await;
        *self.config.write() = config;
        self.connect().await
    }

    /// Stop the session task and close its socket, returning whether one existed
    async fn teardown(&self, session: &mut Option<JoinHandle<()>>) -> bool {
        // Invalidate the running session before anything else
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);

        let handle = session.take();
        if let Some(handle) = &handle {
            handle.abort();
        }

        let sender = self.shared.sender.write().take();
        if let Some(sender) = sender {
            if let Err(e) = sender.close().await {
                debug!("Error closing transport: {}", e);
            }
        }

        self.shared.cache.write().clear();
        handle.is_some()
    }

    /// Send a raw command line
    pub async fn send_command(&self, command: &str) -> Result<()> {
        self.send(&Command::Raw(command.to_string())).await
    }

    /// Send a command over the open socket
    pub async fn send(&self, command: &Command) -> Result<()> {
        let sender = if self.state().is_open() {
            self.shared.sender.read().clone()
        } else {
            None
        };
        let Some(sender) = sender else {
            error!("Cannot send {:?}: not connected", command.text());
            return Err(ClientError::NotConnected);
        };

        let bytes = command.encode().map_err(|e| {
            error!("Cannot send {:?}: {}", command.text(), e);
            ClientError::from(e)
        })?;

        debug!("Sending: {}", command);
        sender.send(bytes).await.map_err(|e| {
            error!("Send failed: {}", e);
            ClientError::SendFailed(e.to_string())
        })
    }

    /// Route an address to an output: `DST <output> ADDR:<address>`
    pub async fn set_output(&self, output: u32, address: &str) -> Result<()> {
        self.send(&Command::set_route(output, address)).await
    }

    /// Route a source to an output
    ///
    /// `source` is a stream number or a `sip:` descriptor. Invalid input is
    /// rejected before anything is sent.
    pub async fn route_output(&self, output: u32, source: &str) -> Result<()> {
        let address = validate_route(output, source).map_err(|e| {
            error!("Set output rejected: {}", e);
            e
        })?;
        self.set_output(output, &address).await
    }

    /// Source currently routed to an output, as last reported by the device
    pub fn output_source(&self, output: u32) -> Option<String> {
        self.shared.cache.read().lookup(output)
    }

    /// Whether an output currently carries the given source
    pub fn output_carries(&self, output: u32, source: &str) -> bool {
        if !self.is_connected() {
            error!("Output state check: not connected");
            return false;
        }
        if !self.shared.cache.read().is_populated() {
            error!("Output state check: no output data received yet");
            return false;
        }

        match validate_route(output, source) {
            Ok(address) => self.output_source(output).as_deref() == Some(address.as_str()),
            Err(e) => {
                error!("Output state check: {}", e);
                false
            }
        }
    }

    /// Snapshot of all known outputs, by output number
    pub fn outputs(&self) -> Vec<Destination> {
        self.shared.cache.read().iter().cloned().collect()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Last reported status, if any
    pub fn status(&self) -> Option<ConnectionStatus> {
        *self.shared.status.read()
    }

    /// Check if the socket is open for commands
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Receive status, record and output change events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> ClientConfig {
        self.config.read().clone()
    }
}

impl Drop for LwrpClient {
    fn drop(&mut self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.session.get_mut().take() {
            handle.abort();
        }
        // Dropping the last sender ends the socket task
        self.shared.sender.write().take();
    }
}

/// Check routing parameters and resolve the source to an address
fn validate_route(output: u32, source: &str) -> Result<String> {
    if output == 0 || output > MAX_OUTPUT_NUM {
        return Err(ClientError::InvalidParams(format!(
            "output {} out of range 1-{}",
            output, MAX_OUTPUT_NUM
        )));
    }
    if source.trim().is_empty() {
        return Err(ClientError::InvalidParams("source is empty".to_string()));
    }

    resolve_source(source).map_err(|e| ClientError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_route() {
        assert_eq!(validate_route(1, "10").unwrap(), "239.192.0.10");
        assert_eq!(
            validate_route(MAX_OUTPUT_NUM, "sip:studio@10.0.0.1").unwrap(),
            "sip:studio@10.0.0.1"
        );
        assert!(matches!(validate_route(0, "10"), Err(ClientError::InvalidParams(_))));
        assert!(matches!(
            validate_route(MAX_OUTPUT_NUM + 1, "10"),
            Err(ClientError::InvalidParams(_))
        ));
        assert!(matches!(validate_route(1, ""), Err(ClientError::InvalidParams(_))));
        assert!(matches!(validate_route(1, "70000"), Err(ClientError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_new_client_is_disconnected() {
        let client = LwrpClient::new(ClientConfig::new("127.0.0.1"));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.status(), None);
        assert!(!client.is_connected());
        assert!(client.outputs().is_empty());
        assert_eq!(client.output_source(1), None);
    }

    #[tokio::test]
    async fn test_bad_config() {
        let client = LwrpClient::new(ClientConfig::new(""));
        let mut events = client.subscribe();

        let result = client.connect().await;
        assert!(matches!(result, Err(ClientError::BadConfig(_))));
        assert_eq!(client.state(), ConnectionState::BadConfig);

        match events.try_recv().unwrap() {
            ClientEvent::Status { status, message } => {
                assert_eq!(status, ConnectionStatus::BadConfig);
                assert!(message.is_some());
            }
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_when_disconnected() {
        let client = LwrpClient::new(ClientConfig::new("127.0.0.1"));
        assert!(matches!(
            client.send_command("VER").await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.set_output(7, "239.192.0.7").await,
            Err(ClientError::NotConnected)
        ));
        assert!(!client.output_carries(1, "1"));
    }

    #[tokio::test]
    async fn test_destroy_after_bad_config() {
        let client = LwrpClient::builder("").build();
        let mut events = client.subscribe();

        assert!(client.connect().await.is_err());
        assert_eq!(client.state(), ConnectionState::BadConfig);

        client.destroy().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.status(), Some(ConnectionStatus::Disconnected));

        let statuses: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|e| match e {
                ClientEvent::Status { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![ConnectionStatus::BadConfig, ConnectionStatus::Disconnected]
        );
    }

    #[tokio::test]
    async fn test_destroy_twice() {
        let client = LwrpClient::new(ClientConfig::new("127.0.0.1"));
        let mut events = client.subscribe();
        client.destroy().await;
        client.destroy().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        // Already disconnected, so nothing to report
        assert!(events.try_recv().is_err());
    }
}
