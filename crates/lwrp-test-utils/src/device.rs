//! Scripted mock LWRP device
//!
//! [`MockDevice`] listens on an ephemeral localhost port and serves one
//! client connection at a time. Every line the client sends is recorded.
//! Replies come from a script of exact-line responses and, optionally, a
//! live routing table that answers `DST` with a `BEGIN`/`END` block and
//! confirms `DST <n> ADDR:<address>` changes the way a real device does.
//!
//! ```ignore
//! let device = MockDevice::start().await;
//! device.set_outputs(&[(1, "239.192.0.1"), (2, "239.192.0.2")]);
//! device.respond("VER", b"VER LWRP:1.4 DEVN:Mock\r\n");
//!
//! let client = LwrpClient::new(device.client_config());
//! client.connect().await?;
//! ```

use bytes::Bytes;
use lwrp_client::ClientConfig;
use lwrp_core::framer::decode_latin1;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::wait_until;

enum Control {
    Send(Bytes),
    Disconnect,
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, Vec<u8>>,
    routes: Option<BTreeMap<u32, String>>,
}

impl Script {
    /// Replies to one received line, in the order they are written
    fn replies_for(&mut self, line: &str) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(reply) = self.replies.get(line) {
            out.push(reply.clone());
        }

        let Some(routes) = self.routes.as_mut() else {
            return out;
        };

        if line == "DST" {
            let mut block = String::from("BEGIN\r\n");
            for (num, address) in routes.iter() {
                block.push_str(&format!("DST {} ADDR:{}\r\n", num, address));
            }
            block.push_str("END\r\n");
            out.push(block.into_bytes());
        } else if let Some((num, address)) = parse_route(line) {
            routes.insert(num, address.to_string());
            out.push(format!("DST {} ADDR:{}\r\n", num, address).into_bytes());
        }

        out
    }
}

/// `DST <n> ADDR:<address>`
fn parse_route(line: &str) -> Option<(u32, &str)> {
    let rest = line.strip_prefix("DST ")?;
    let (num, address) = rest.split_once(" ADDR:")?;
    Some((num.parse().ok()?, address))
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    lines: Mutex<Vec<String>>,
    raw: Mutex<Vec<u8>>,
    line_count: AtomicU32,
    connections: AtomicU32,
    connected: AtomicBool,
}

/// A mock LWRP device that cleans up on drop
pub struct MockDevice {
    addr: SocketAddr,
    shared: Arc<Shared>,
    control: mpsc::UnboundedSender<Control>,
    handle: Option<JoinHandle<()>>,
}

impl MockDevice {
    /// Bind an ephemeral port and start accepting connections
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared::default());
        let (control, control_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(serve(listener, shared.clone(), control_rx));
        debug!("Mock device listening on {}", addr);

        Self {
            addr,
            shared,
            control,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Client configuration pointing at this device
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            port: self.port().into(),
            ..ClientConfig::new(self.host())
        }
    }

    /// Reply with `reply` whenever the client sends exactly `line`
    pub fn respond(&self, line: &str, reply: &[u8]) {
        self.shared
            .script
            .lock()
            .replies
            .insert(line.to_string(), reply.to_vec());
    }

    /// Serve a routing table: `DST` lists it, route commands update it
    pub fn set_outputs(&self, outputs: &[(u32, &str)]) {
        let routes = outputs
            .iter()
            .map(|(num, address)| (*num, address.to_string()))
            .collect();
        self.shared.script.lock().routes = Some(routes);
    }

    /// Current routing table, if one is served
    pub fn routes(&self) -> Option<BTreeMap<u32, String>> {
        self.shared.script.lock().routes.clone()
    }

    /// Write raw bytes to the connected client
    ///
    /// Bytes pushed while no client is connected go to the next one.
    pub fn push(&self, data: &[u8]) {
        let _ = self.control.send(Control::Send(Bytes::copy_from_slice(data)));
    }

    /// Close the current client connection
    pub fn disconnect(&self) {
        if self.is_client_connected() {
            let _ = self.control.send(Control::Disconnect);
        }
    }

    /// Lines received so far, terminators removed
    pub fn received(&self) -> Vec<String> {
        self.shared.lines.lock().clone()
    }

    /// Every byte received so far
    pub fn received_bytes(&self) -> Vec<u8> {
        self.shared.raw.lock().clone()
    }

    pub fn line_count(&self) -> u32 {
        self.shared.line_count.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> u32 {
        self.shared.connections.load(Ordering::SeqCst)
    }

    pub fn is_client_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn clear_received(&self) {
        self.shared.lines.lock().clear();
        self.shared.raw.lock().clear();
        self.shared.line_count.store(0, Ordering::SeqCst);
    }

    /// Wait until at least `n` lines have been received
    pub async fn wait_for_lines(&self, n: u32, max_wait: Duration) -> bool {
        wait_until(|| self.line_count() >= n, max_wait).await
    }

    /// Wait until a given line has been received
    pub async fn wait_for_line(&self, line: &str, max_wait: Duration) -> bool {
        wait_until(|| self.shared.lines.lock().iter().any(|l| l == line), max_wait).await
    }

    /// Wait until `n` connections have been accepted in total
    pub async fn wait_for_connections(&self, n: u32, max_wait: Duration) -> bool {
        wait_until(|| self.connection_count() >= n, max_wait).await
    }

    /// Wait until the client has closed its connection
    pub async fn wait_for_disconnect(&self, max_wait: Duration) -> bool {
        wait_until(|| !self.is_client_connected(), max_wait).await
    }

    /// Stop the device explicitly (also happens on drop)
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Mock device accept failed: {}", e);
                continue;
            }
        };

        debug!("Mock device accepted {}", peer);
        shared.connected.store(true, Ordering::SeqCst);
        shared.connections.fetch_add(1, Ordering::SeqCst);

        handle_connection(stream, &shared, &mut control_rx).await;

        shared.connected.store(false, Ordering::SeqCst);
        debug!("Mock device connection from {} closed", peer);
    }
}

async fn handle_connection(
    stream: TcpStream,
    shared: &Shared,
    control_rx: &mut mpsc::UnboundedReceiver<Control>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        tokio::select! {
            control = control_rx.recv() => match control {
                Some(Control::Send(data)) => {
                    if writer.write_all(&data).await.is_err() {
                        break;
                    }
                }
                Some(Control::Disconnect) | None => break,
            },

            read = reader.read(&mut chunk) => {
                let n = match read {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                shared.raw.lock().extend_from_slice(&chunk[..n]);
                pending.extend_from_slice(&chunk[..n]);

                let mut replies = Vec::new();
                while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = pending.drain(..=pos).collect();
                    let line = decode_latin1(&raw[..pos]);
                    let line = line.trim_end_matches('\r').to_string();

                    replies.extend(shared.script.lock().replies_for(&line));
                    shared.lines.lock().push(line);
                    shared.line_count.fetch_add(1, Ordering::SeqCst);
                }

                for reply in replies {
                    if writer.write_all(&reply).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        assert_eq!(parse_route("DST 7 ADDR:239.192.0.7"), Some((7, "239.192.0.7")));
        assert_eq!(parse_route("DST"), None);
        assert_eq!(parse_route("DST x ADDR:1"), None);
    }

    #[test]
    fn test_script_routing_table() {
        let mut script = Script {
            routes: Some(BTreeMap::from([(2, "239.192.0.2".to_string())])),
            ..Default::default()
        };

        let replies = script.replies_for("DST 1 ADDR:239.192.0.9");
        assert_eq!(replies, vec![b"DST 1 ADDR:239.192.0.9\r\n".to_vec()]);

        let replies = script.replies_for("DST");
        assert_eq!(
            replies,
            vec![b"BEGIN\r\nDST 1 ADDR:239.192.0.9\r\nDST 2 ADDR:239.192.0.2\r\nEND\r\n".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_records_lines_and_replies() {
        let device = MockDevice::start().await;
        device.respond("VER", b"VER LWRP:1.0\r\n");

        let mut stream = TcpStream::connect(device.addr()).await.unwrap();
        stream.write_all(b"LOGIN\nVER\r\n").await.unwrap();

        let mut buf = vec![0u8; 14];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..], b"VER LWRP:1.0\r\n");

        assert!(device.wait_for_lines(2, Duration::from_secs(5)).await);
        assert_eq!(device.received(), vec!["LOGIN", "VER"]);
        assert_eq!(device.received_bytes(), b"LOGIN\nVER\r\n".to_vec());
        assert_eq!(device.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_push_and_disconnect() {
        let device = MockDevice::start().await;
        let mut stream = TcpStream::connect(device.addr()).await.unwrap();
        assert!(device.wait_for_connections(1, Duration::from_secs(5)).await);
        assert!(wait_until(|| device.is_client_connected(), Duration::from_secs(5)).await);

        device.push(b"DST 1 ADDR:1\r\n");
        device.disconnect();

        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..], b"DST 1 ADDR:1\r\n");
    }
}
