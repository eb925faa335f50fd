//! Transport seam for the broadcast channel.
//!
//! A [`BroadcastTransport`] opens a [`BroadcastSocket`]: a pair of channels
//! carrying [`SocketEvent`]s up from the connection and [`SocketCommand`]s
//! down to it. Opening never fails synchronously; connection failures arrive
//! as [`SocketEvent::Error`], the same way a browser-style WebSocket reports
//! them. This lets the broadcast driver treat every transport identically and
//! lets tests substitute an in-memory transport.
//!
//! [`WebSocketTransport`] is the production implementation. Each socket owns
//! a background Tokio task running the WebSocket read/write loop:
//!
//! ```text
//! ┌──────────────────┐  SocketCommand  ┌──────────────────────────────┐
//! │  BroadcastSocket │ ──────────────▶ │  Background task             │
//! │  (driver side)   │                 │  connect → Open              │
//! │                  │ ◀────────────── │  Text frames → Message       │
//! └──────────────────┘   SocketEvent   │  read error → Error / Closed │
//!                                      └──────────────────────────────┘
//! ```

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use dtb_core::prelude::*;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Capacity of the command channel (bounded, to apply backpressure).
const CMD_CHANNEL_CAPACITY: usize = 8;

/// Capacity of the event channel (bounded, responses can be bursty).
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Events delivered by a socket, in the order they happened on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection is established and frames may be sent.
    Open,
    /// One text frame.
    Message(String),
    /// Connecting, reading or writing failed.
    Error(String),
    /// The peer closed the connection.
    Closed,
}

/// Requests from the driver to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketCommand {
    /// Write one text frame.
    Send(String),
    /// Close the connection and stop.
    Close,
}

/// Driver-side handle of one connection.
///
/// Dropping the socket closes the command channel, which also shuts the
/// connection down.
#[derive(Debug)]
pub struct BroadcastSocket {
    url: Url,
    commands: mpsc::Sender<SocketCommand>,
    events: mpsc::Receiver<SocketEvent>,
}

impl BroadcastSocket {
    /// Assemble a socket from its channel halves. Used by transports.
    pub fn new(
        url: Url,
        commands: mpsc::Sender<SocketCommand>,
        events: mpsc::Receiver<SocketEvent>,
    ) -> Self {
        Self {
            url,
            commands,
            events,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Queue a text frame for sending.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelClosed`] if the connection task has already exited.
    pub async fn send(&self, frame: String) -> Result<()> {
        self.commands
            .send(SocketCommand::Send(frame))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Wait for the next event. `None` once the connection side is gone.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.events.recv().await
    }

    /// Ask the connection to close, then release the handle.
    pub async fn close(self) {
        // The task may already have exited; nothing left to close then.
        let _ = self.commands.send(SocketCommand::Close).await;
    }
}

/// Opens sockets to a broadcast endpoint.
pub trait BroadcastTransport: Send + Sync {
    /// Start connecting to `url`. Progress is reported through the socket's
    /// events, starting with [`SocketEvent::Open`] or [`SocketEvent::Error`].
    fn open(&self, url: &Url) -> BroadcastSocket;
}

impl<T: BroadcastTransport + ?Sized> BroadcastTransport for &T {
    fn open(&self, url: &Url) -> BroadcastSocket {
        (**self).open(url)
    }
}

impl<T: BroadcastTransport + ?Sized> BroadcastTransport for std::sync::Arc<T> {
    fn open(&self, url: &Url) -> BroadcastSocket {
        (**self).open(url)
    }
}

/// Channel pair for building a [`BroadcastSocket`] and its connection side.
pub fn socket_channels() -> (
    (mpsc::Sender<SocketCommand>, mpsc::Receiver<SocketCommand>),
    (mpsc::Sender<SocketEvent>, mpsc::Receiver<SocketEvent>),
) {
    (
        mpsc::channel(CMD_CHANNEL_CAPACITY),
        mpsc::channel(EVENT_CHANNEL_CAPACITY),
    )
}

// ---------------------------------------------------------------------------
// WebSocketTransport
// ---------------------------------------------------------------------------

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// [`BroadcastTransport`] over tokio-tungstenite.
///
/// Must be used from within a Tokio runtime: [`open`](Self::open) spawns the
/// connection task.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl BroadcastTransport for WebSocketTransport {
    fn open(&self, url: &Url) -> BroadcastSocket {
        let ((cmd_tx, cmd_rx), (event_tx, event_rx)) = socket_channels();
        tokio::spawn(run_socket_task(url.to_string(), cmd_rx, event_tx));
        BroadcastSocket::new(url.clone(), cmd_tx, event_rx)
    }
}

/// Entry point for one connection's background task.
async fn run_socket_task(
    ws_uri: String,
    mut cmd_rx: mpsc::Receiver<SocketCommand>,
    event_tx: mpsc::Sender<SocketEvent>,
) {
    info!("Connecting to broadcast channel at {}", ws_uri);
    let ws_stream = match connect_async(ws_uri.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(err) => {
            warn!("Broadcast: failed to connect to {}: {}", ws_uri, err);
            let _ = event_tx.send(SocketEvent::Error(err.to_string())).await;
            return;
        }
    };

    if event_tx.send(SocketEvent::Open).await.is_err() {
        // Driver already gone (timeout or abort raced the connect).
        let (mut ws_sink, _) = ws_stream.split();
        send_close(&mut ws_sink).await;
        return;
    }

    run_io_loop(ws_stream, &mut cmd_rx, &event_tx).await;
    debug!("Broadcast socket task exiting");
}

/// Run the read/write select loop until either side finishes.
async fn run_io_loop(
    ws_stream: WsStream,
    cmd_rx: &mut mpsc::Receiver<SocketCommand>,
    event_tx: &mpsc::Sender<SocketEvent>,
) {
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    loop {
        tokio::select! {
            // ── Incoming WebSocket frame ─────────────────────────────────
            frame = ws_stream.next() => {
                let event = match frame {
                    Some(Ok(WsMessage::Text(text))) => SocketEvent::Message(text.as_str().to_owned()),
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("Broadcast: connection closed by server");
                        let _ = event_tx.send(SocketEvent::Closed).await;
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary — ignore
                        continue;
                    }
                    Some(Err(err)) => {
                        warn!("Broadcast: WebSocket read error: {}", err);
                        let _ = event_tx.send(SocketEvent::Error(err.to_string())).await;
                        return;
                    }
                };
                if event_tx.send(event).await.is_err() {
                    send_close(&mut ws_sink).await;
                    return;
                }
            }

            // ── Outgoing command from the driver ─────────────────────────
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SocketCommand::Send(frame)) => {
                        if let Err(err) = ws_sink.send(WsMessage::Text(frame.into())).await {
                            warn!("Broadcast: failed to send frame: {}", err);
                            let _ = event_tx.send(SocketEvent::Error(err.to_string())).await;
                            return;
                        }
                    }
                    Some(SocketCommand::Close) | None => {
                        send_close(&mut ws_sink).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Send a WebSocket Close frame, ignoring any write errors.
async fn send_close(ws_sink: &mut SplitSink<WsStream, WsMessage>) {
    let _ = ws_sink.send(WsMessage::Close(None)).await;
    let _ = ws_sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_socket_send_fails_after_connection_side_dropped() {
        let ((cmd_tx, cmd_rx), (_event_tx, event_rx)) = socket_channels();
        let socket = BroadcastSocket::new(
            Url::parse("ws://localhost:8081/expo-dev-plugins/broadcast").unwrap(),
            cmd_tx,
            event_rx,
        );
        drop(cmd_rx);

        let err = socket.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
    }

    #[tokio::test]
    async fn test_socket_close_sends_close_command() {
        let ((cmd_tx, mut cmd_rx), (_event_tx, event_rx)) = socket_channels();
        let socket = BroadcastSocket::new(
            Url::parse("ws://localhost:8081/expo-dev-plugins/broadcast").unwrap(),
            cmd_tx,
            event_rx,
        );

        socket.close().await;
        assert_eq!(cmd_rx.recv().await, Some(SocketCommand::Close));
        assert_eq!(cmd_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_socket_events_in_order() {
        let ((cmd_tx, _cmd_rx), (event_tx, event_rx)) = socket_channels();
        let mut socket = BroadcastSocket::new(
            Url::parse("ws://localhost:8081/expo-dev-plugins/broadcast").unwrap(),
            cmd_tx,
            event_rx,
        );

        event_tx.send(SocketEvent::Open).await.unwrap();
        event_tx
            .send(SocketEvent::Message("a".to_string()))
            .await
            .unwrap();
        drop(event_tx);

        assert_eq!(socket.next_event().await, Some(SocketEvent::Open));
        assert_eq!(
            socket.next_event().await,
            Some(SocketEvent::Message("a".to_string()))
        );
        assert_eq!(socket.next_event().await, None);
    }

    #[tokio::test]
    async fn test_websocket_transport_reports_connect_failure() {
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let url = Url::parse("ws://127.0.0.1:9/expo-dev-plugins/broadcast").unwrap();
        let mut socket = WebSocketTransport::new().open(&url);

        assert_eq!(socket.url(), &url);
        match socket.next_event().await {
            Some(SocketEvent::Error(_)) => {}
            other => panic!("expected Error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_websocket_transport_attempts_tls_for_wss() {
        // Accept the TCP connection and hang up before the TLS handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let url = Url::parse(&format!("wss://127.0.0.1:{port}/expo-dev-plugins/broadcast")).unwrap();
        let mut socket = WebSocketTransport::new().open(&url);

        match socket.next_event().await {
            Some(SocketEvent::Error(message)) => {
                assert!(!message.contains("TLS support not compiled in"), "{message}");
            }
            other => panic!("expected Error event, got {:?}", other),
        }
    }
}
