// End-to-end tests for the session channel against a local WebSocket server.

use std::time::Duration;

use clipsync_core::config::ReconnectConfig;
use clipsync_core::session::SessionId;
use clipsync_core::ws_client::{self, WsEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        enabled: true,
        base_delay_ms: 10,
        max_delay_ms: 50,
        max_attempts: 0,
    }
}

async fn next_event(rx: &mut mpsc::Receiver<WsEvent>) -> WsEvent {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("event should arrive in time")
        .expect("channel should be open")
}

#[tokio::test]
async fn receives_session_id_and_closes_on_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    // Server: greet with noise and a session frame, then report whatever
    // the client sends back.
    let (seen_tx, seen_rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("welcome".into())).await.unwrap();
        ws.send(Message::Text("session_id:abc123".into())).await.unwrap();

        let mut received = Vec::new();
        while let Some(Ok(msg)) = ws.next().await {
            let is_close = matches!(msg, Message::Close(_));
            received.push(msg);
            if is_close {
                break;
            }
        }
        let _ = seen_tx.send(received);
    });

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown) = watch::channel(false);
    let client = tokio::spawn(ws_client::run(url.clone(), fast_reconnect(), tx, shutdown));

    assert_eq!(next_event(&mut rx).await, WsEvent::Connected { url });
    assert_eq!(
        next_event(&mut rx).await,
        WsEvent::SessionEstablished(SessionId::new("abc123"))
    );

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(TIMEOUT, client)
        .await
        .expect("client should stop")
        .unwrap()
        .unwrap();

    let received = tokio::time::timeout(TIMEOUT, seen_rx).await.unwrap().unwrap();
    let closes = received
        .iter()
        .filter(|m| matches!(m, Message::Close(_)))
        .count();
    assert_eq!(closes, 1, "client should send exactly one close frame");
    assert_eq!(received.len(), 1, "client sends nothing but the close frame");

    // No events after teardown.
    assert!(rx.recv().await.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn reconnects_after_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        // First connection: hand out a session and hang up.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("session_id:first".into())).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}

        // Second connection: a fresh session, then wait for the client to leave.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("session_id:second".into())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown) = watch::channel(false);
    let client = tokio::spawn(ws_client::run(url.clone(), fast_reconnect(), tx, shutdown));

    assert_eq!(next_event(&mut rx).await, WsEvent::Connected { url: url.clone() });
    assert_eq!(
        next_event(&mut rx).await,
        WsEvent::SessionEstablished(SessionId::new("first"))
    );
    assert_eq!(next_event(&mut rx).await, WsEvent::Disconnected);
    assert_eq!(
        next_event(&mut rx).await,
        WsEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(10)
        }
    );
    assert_eq!(next_event(&mut rx).await, WsEvent::Connected { url });
    assert_eq!(
        next_event(&mut rx).await,
        WsEvent::SessionEstablished(SessionId::new("second"))
    );

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(TIMEOUT, client).await.unwrap().unwrap().unwrap();
    tokio::time::timeout(TIMEOUT, server).await.unwrap().unwrap();
}
