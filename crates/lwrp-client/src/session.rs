//! Session task
//!
//! One task per connection attempt owns the transport receiver and the
//! framer. It is the only writer of the output cache. Every mutation of
//! shared state is tagged with the epoch the session was started under, so
//! once the client tears a session down nothing it still has in flight can
//! leak into the next one.

use bytes::Bytes;
use lwrp_core::{parse_unit_with, BlockFramer, Command, Destination, OutputStateCache, ParseMode};
use lwrp_transport::{
    TcpConfig, TcpSender, TcpTransport, TransportEvent, TransportReceiver, TransportSender,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::status::{ClientEvent, ConnectionState, ConnectionStatus};

/// State shared between a client handle and its session task
pub(crate) struct Shared {
    pub(crate) state: RwLock<ConnectionState>,
    pub(crate) status: RwLock<Option<ConnectionStatus>>,
    pub(crate) cache: RwLock<OutputStateCache>,
    pub(crate) sender: RwLock<Option<Arc<TcpSender>>>,
    pub(crate) events: broadcast::Sender<ClientEvent>,
    pub(crate) epoch: AtomicU64,
}

impl Shared {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            status: RwLock::new(None),
            cache: RwLock::new(OutputStateCache::new()),
            sender: RwLock::new(None),
            events,
            epoch: AtomicU64::new(0),
        }
    }

    /// Move to `state`, returning the state it replaced
    pub(crate) fn set_state(&self, state: ConnectionState) -> ConnectionState {
        let mut current = self.state.write();
        let previous = *current;
        if previous != state {
            debug!("Connection state {:?} -> {:?}", previous, state);
            *current = state;
        }
        previous
    }

    /// Record and broadcast a status change
    pub(crate) fn publish_status(&self, status: ConnectionStatus, message: Option<String>) {
        match &message {
            Some(message) => info!("Status: {} ({})", status, message),
            None => info!("Status: {}", status),
        }
        *self.status.write() = Some(status);
        self.emit(ClientEvent::status(status, message));
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

/// Everything a session needs to run one connection
pub(crate) struct Session {
    shared: Arc<Shared>,
    epoch: u64,
    address: String,
    tcp: TcpConfig,
    login: Command,
    parse_mode: ParseMode,
    framer: BlockFramer,
}

impl Session {
    pub(crate) fn new(
        shared: Arc<Shared>,
        epoch: u64,
        address: String,
        tcp: TcpConfig,
        password: Option<&str>,
        parse_mode: ParseMode,
        max_pending: usize,
    ) -> Self {
        Self {
            shared,
            epoch,
            address,
            tcp,
            login: Command::login(password),
            parse_mode,
            framer: BlockFramer::with_limit(max_pending),
        }
    }

    fn is_current(&self) -> bool {
        self.shared.epoch.load(Ordering::SeqCst) == self.epoch
    }

    fn transition(&self, state: ConnectionState, status: Option<(ConnectionStatus, Option<String>)>) {
        if !self.is_current() {
            return;
        }
        self.shared.set_state(state);
        if let Some((status, message)) = status {
            self.shared.publish_status(status, message);
        }
    }

    fn fail(&self, reason: String) {
        error!("Connection to {} failed: {}", self.address, reason);
        self.clear_outputs();
        self.transition(
            ConnectionState::Error,
            Some((ConnectionStatus::ConnectionFailure, Some(reason))),
        );
    }

    pub(crate) async fn run(mut self) {
        let transport = TcpTransport::with_config(self.tcp.clone());
        let (sender, mut receiver) = match transport.connect(&self.address).await {
            Ok(pair) => pair,
            Err(e) => {
                self.fail(e.to_string());
                return;
            }
        };
        let sender = Arc::new(sender);

        let attached = {
            let mut slot = self.shared.sender.write();
            if self.is_current() {
                *slot = Some(sender.clone());
                true
            } else {
                false
            }
        };
        if !attached {
            let _ = sender.close().await;
            return;
        }

        while let Some(event) = receiver.recv().await {
            if !self.is_current() {
                break;
            }

            match event {
                TransportEvent::Connected => {
                    if !self.on_connected(&sender).await {
                        break;
                    }
                }
                TransportEvent::Data(data) => self.on_data(&data),
                TransportEvent::Error(e) => {
                    self.fail(e);
                    break;
                }
                TransportEvent::Disconnected { reason: Some(reason) } => {
                    self.fail(reason);
                    break;
                }
                TransportEvent::Disconnected { reason: None } => {
                    info!("Connection to {} closed by device", self.address);
                    self.clear_outputs();
                    self.transition(
                        ConnectionState::Disconnected,
                        Some((ConnectionStatus::Disconnected, None)),
                    );
                    break;
                }
            }
        }

        self.detach(&sender);
    }

    /// Log in and subscribe to destination changes
    async fn on_connected(&self, sender: &TcpSender) -> bool {
        info!("Connected to {}", self.address);
        self.transition(ConnectionState::AuthenticatingAndSubscribing, None);

        for command in [&self.login, &Command::Destinations] {
            if let Err(e) = send(sender, command).await {
                self.fail(e);
                return false;
            }
        }

        self.transition(ConnectionState::Ready, Some((ConnectionStatus::Ok, None)));
        true
    }

    fn on_data(&mut self, data: &Bytes) {
        for unit in self.framer.push(data) {
            let records = match parse_unit_with(&unit, self.parse_mode) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Dropping response unit of {} lines: {}", unit.len(), e);
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }

            let destinations: Vec<Destination> = records
                .iter()
                .filter_map(|r| r.as_destination())
                .cloned()
                .collect();

            if !self.is_current() {
                return;
            }
            self.shared.emit(ClientEvent::Records(records));

            if destinations.is_empty() {
                continue;
            }

            {
                let mut cache = self.shared.cache.write();
                if !self.is_current() {
                    return;
                }
                cache.apply(destinations);
            }
            self.shared.emit(ClientEvent::OutputsChanged);
        }
    }

    /// Forget routing learned over this connection
    fn clear_outputs(&self) {
        let had_outputs = {
            let mut cache = self.shared.cache.write();
            if !self.is_current() {
                return;
            }
            let had_outputs = cache.is_populated();
            cache.clear();
            had_outputs
        };
        if had_outputs {
            self.shared.emit(ClientEvent::OutputsChanged);
        }
    }

    /// Drop this session's sender from the shared slot
    fn detach(&self, sender: &Arc<TcpSender>) {
        let mut slot = self.shared.sender.write();
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, sender)) {
            *slot = None;
        }
    }
}

/// Encode and write one command
pub(crate) async fn send(sender: &TcpSender, command: &Command) -> std::result::Result<(), String> {
    let bytes = command.encode().map_err(|e| e.to_string())?;
    match command {
        Command::Login { password: Some(_) } => debug!("Sending: LOGIN ****"),
        _ => debug!("Sending: {}", command),
    }
    sender.send(bytes).await.map_err(|e| e.to_string())
}
