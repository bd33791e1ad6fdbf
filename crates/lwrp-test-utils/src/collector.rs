//! Client event collection

use lwrp_client::{ClientEvent, ConnectionStatus, LwrpClient};
use lwrp_core::ResponseRecord;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use crate::wait_until;

/// Collector for client events with thread-safe access
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<ClientEvent>>>,
    count: Arc<AtomicU32>,
}

impl EventCollector {
    /// Subscribe to a client and collect its events in the background
    ///
    /// Attach before connecting to see the full status sequence.
    pub fn attach(client: &LwrpClient) -> Self {
        let collector = Self {
            events: Arc::new(Mutex::new(Vec::new())),
            count: Arc::new(AtomicU32::new(0)),
        };

        let mut rx = client.subscribe();
        let events = collector.events.clone();
        let count = collector.count.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        events.lock().push(event);
                        count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("Event collector lagged by {} events", n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        collector
    }

    /// Get the count of received events
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    /// Status changes in arrival order
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Status { status, .. } => Some(*status),
                _ => None,
            })
            .collect()
    }

    /// All forwarded records, flattened in arrival order
    pub fn records(&self) -> Vec<ResponseRecord> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Records(records) => Some(records.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Number of output change notifications
    pub fn outputs_changed(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ClientEvent::OutputsChanged))
            .count()
    }

    pub fn has_status(&self, status: ConnectionStatus) -> bool {
        self.statuses().contains(&status)
    }

    /// Wait for an event matching the predicate
    pub async fn wait_for<F>(&self, predicate: F, max_wait: Duration) -> bool
    where
        F: Fn(&ClientEvent) -> bool,
    {
        wait_until(|| self.events.lock().iter().any(&predicate), max_wait).await
    }

    /// Wait for a status to be reported
    pub async fn wait_for_status(&self, status: ConnectionStatus, max_wait: Duration) -> bool {
        wait_until(|| self.has_status(status), max_wait).await
    }

    /// Wait for at least n events to be received
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        crate::wait_for_count(&self.count, n, max_wait).await
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}
