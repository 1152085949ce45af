// WebSocket session channel.
//
// Connects to the server's session endpoint, picks the session id out of
// `session_id:<value>` text frames and forwards it to the application layer.
// Reconnects with exponential backoff when the connection drops, and closes
// the socket exactly once when the shutdown signal is raised.

use std::fmt::Display;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::config::ReconnectConfig;
use crate::session::{parse_session_message, SessionId};

/// Events emitted by the session channel to the application layer.
#[derive(Debug, PartialEq)]
pub enum WsEvent {
    /// The WebSocket handshake with the server completed.
    Connected { url: String },
    /// The connection was lost or could not be established.
    Disconnected,
    /// Waiting `delay` before reconnect attempt number `attempt`.
    Reconnecting { attempt: u32, delay: Duration },
    /// The server sent a `session_id:<value>` frame.
    SessionEstablished(SessionId),
}

/// How a single connection ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// The server closed the connection or the transport failed.
    Closed,
    /// Shutdown was requested; a close frame was sent.
    Shutdown,
    /// The event receiver was dropped; a close frame was sent.
    ReceiverDropped,
}

/// Run the session channel until shutdown is requested, the event receiver
/// goes away, or the reconnect policy gives up.
///
/// The `shutdown` signal is raised by sending `true` (dropping the sender has
/// the same effect). It cancels a pending connect or backoff sleep and closes
/// an open connection.
pub async fn run(
    url: String,
    policy: ReconnectConfig,
    tx: mpsc::Sender<WsEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let result = tokio::select! {
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
            _ = shutdown_requested(&mut shutdown) => break,
        };

        match result {
            Ok((ws_stream, _response)) => {
                info!("Session channel connected to {url}");
                attempt = 0;

                let (mut write, read) = ws_stream.split();
                if tx
                    .send(WsEvent::Connected { url: url.clone() })
                    .await
                    .is_err()
                {
                    send_close(&mut write).await;
                    break;
                }

                match drive_connection(write, read, &tx, &mut shutdown).await {
                    ConnectionEnd::Closed => {
                        if tx.send(WsEvent::Disconnected).await.is_err() {
                            break;
                        }
                    }
                    ConnectionEnd::Shutdown | ConnectionEnd::ReceiverDropped => break,
                }
            }
            Err(e) => {
                warn!("Session channel failed to connect to {url}: {e}");
                if tx.send(WsEvent::Disconnected).await.is_err() {
                    break;
                }
            }
        }

        attempt = attempt.saturating_add(1);
        if !policy.allows(attempt) {
            if policy.enabled {
                warn!(
                    "Session channel giving up after {} reconnect attempts",
                    attempt - 1
                );
            } else {
                info!("Session channel reconnect disabled, not retrying");
            }
            break;
        }

        let delay = policy.delay_for(attempt);
        info!("Session channel reconnect attempt {attempt} in {delay:?}");
        if tx
            .send(WsEvent::Reconnecting { attempt, delay })
            .await
            .is_err()
        {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }

    info!("Session channel stopped");
    Ok(())
}

/// Read frames from one established connection until it ends.
///
/// Generic over the sink and stream halves so it can be driven by in-memory
/// mocks in tests. Only `session_id:<value>` text frames produce events;
/// everything else is ignored.
pub async fn drive_connection<W, R>(
    mut write: W,
    mut read: R,
    tx: &mpsc::Sender<WsEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> ConnectionEnd
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    if *shutdown.borrow() {
        send_close(&mut write).await;
        return ConnectionEnd::Shutdown;
    }

    loop {
        tokio::select! {
            biased;

            _ = shutdown_requested(shutdown) => {
                send_close(&mut write).await;
                return ConnectionEnd::Shutdown;
            }

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match parse_session_message(text.as_str()) {
                    Some(id) => {
                        info!("Session id received from server");
                        if tx.send(WsEvent::SessionEstablished(id)).await.is_err() {
                            send_close(&mut write).await;
                            return ConnectionEnd::ReceiverDropped;
                        }
                    }
                    None => {
                        debug!("Ignoring unrecognized text frame ({} bytes)", text.len());
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("Server closed session channel: {frame:?}");
                    return ConnectionEnd::Closed;
                }
                Some(Err(e)) => {
                    warn!("Session channel error: {e}");
                    return ConnectionEnd::Closed;
                }
                None => {
                    info!("Session channel stream ended");
                    return ConnectionEnd::Closed;
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong and raw frames carry nothing for us.
                }
            }
        }
    }
}

async fn send_close<W>(write: &mut W)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    if let Err(e) = write.send(Message::Close(None)).await {
        debug!("Close frame not delivered: {e}");
    }
}

/// Resolves once shutdown is requested or the signal's sender is dropped.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
