//! TCP transport tests against a plain listener

use bytes::Bytes;
use lwrp_transport::{TcpTransport, TransportError, TransportEvent, TransportReceiver, TransportSender};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

async fn next_event<R: TransportReceiver>(receiver: &mut R) -> TransportEvent {
    timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport closed")
}

#[tokio::test]
async fn test_connected_is_first_event() {
    let (listener, addr) = listener().await;
    let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

    let (_sender, mut receiver) = TcpTransport::new().connect(&addr).await.unwrap();
    let _peer = accept.await.unwrap();

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
}

#[tokio::test]
async fn test_bytes_pass_through_unframed() {
    let (listener, addr) = listener().await;
    let accept = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"BEGIN\r\nDST 1 AD").await.unwrap();
        stream
    });

    let (_sender, mut receiver) = TcpTransport::new().connect(&addr).await.unwrap();
    let _stream = accept.await.unwrap();
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);

    let mut received = Vec::new();
    while received.len() < 15 {
        match next_event(&mut receiver).await {
            TransportEvent::Data(data) => received.extend_from_slice(&data),
            other => panic!("Expected Data, got {:?}", other),
        }
    }
    assert_eq!(&received[..], b"BEGIN\r\nDST 1 AD");
}

#[tokio::test]
async fn test_send_writes_exact_bytes_in_order() {
    let (listener, addr) = listener().await;
    let accept = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 21];
        stream.read_exact(&mut buf).await.unwrap();
        buf
    });

    let (sender, _receiver) = TcpTransport::new().connect(&addr).await.unwrap();
    sender.send(Bytes::from_static(b"LOGIN secret\n")).await.unwrap();
    sender.send(Bytes::from_static(b"DST\n")).await.unwrap();
    sender.send(Bytes::from_static(b"VER\n")).await.unwrap();

    let written = timeout(Duration::from_secs(5), accept).await.unwrap().unwrap();
    assert_eq!(&written[..], b"LOGIN secret\nDST\nVER\n");
}

#[tokio::test]
async fn test_peer_close_reports_disconnected() {
    let (listener, addr) = listener().await;
    let accept = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let (sender, mut receiver) = TcpTransport::new().connect(&addr).await.unwrap();
    accept.await.unwrap();

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Disconnected { reason: None }
    );

    // The IO task has finished by the time the receiver is drained
    assert_eq!(receiver.recv().await, None);
    assert!(!sender.is_connected());
    assert!(matches!(
        sender.send(Bytes::from_static(b"DST\n")).await,
        Err(TransportError::NotConnected)
    ));
}

#[tokio::test]
async fn test_close_ends_connection() {
    let (listener, addr) = listener().await;
    let accept = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        // Returns once the client side has shut down
        stream.read_to_end(&mut buf).await.unwrap();
        buf
    });

    let (sender, mut receiver) = TcpTransport::new().connect(&addr).await.unwrap();
    sender.close().await.unwrap();
    assert!(!sender.is_connected());

    let remaining = timeout(Duration::from_secs(5), accept).await.unwrap().unwrap();
    assert!(remaining.is_empty());

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert_eq!(timeout(Duration::from_secs(5), receiver.recv()).await.unwrap(), None);
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind then drop to get a port nothing listens on
    let (listener, addr) = listener().await;
    drop(listener);

    let result = TcpTransport::new().connect(&addr).await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
}
