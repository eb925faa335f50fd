//! Test utilities for the broadcast layer
//!
//! Provides an in-memory [`FakeTransport`] that hands each opened socket's
//! server side to the test as a [`FakeConnection`], plus helpers for building
//! apps and response frames.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use url::Url;

use dtb_core::AppDescriptor;

use crate::transport::{socket_channels, BroadcastSocket, BroadcastTransport, SocketCommand, SocketEvent};

/// Transport whose sockets are driven by the test.
#[derive(Debug, Clone)]
pub struct FakeTransport {
    connections: mpsc::UnboundedSender<FakeConnection>,
    opened: Arc<AtomicUsize>,
}

impl FakeTransport {
    /// Create a transport and the receiver yielding one [`FakeConnection`]
    /// per `open` call.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeConnection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            connections: tx,
            opened: Arc::new(AtomicUsize::new(0)),
        };
        (transport, rx)
    }

    /// Number of sockets opened so far.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl BroadcastTransport for FakeTransport {
    fn open(&self, url: &Url) -> BroadcastSocket {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let ((cmd_tx, cmd_rx), (event_tx, event_rx)) = socket_channels();
        // The test may have dropped the receiver; the socket still works.
        let _ = self.connections.send(FakeConnection {
            url: url.clone(),
            events: event_tx,
            commands: cmd_rx,
        });
        BroadcastSocket::new(url.clone(), cmd_tx, event_rx)
    }
}

/// Server side of one fake socket.
#[derive(Debug)]
pub struct FakeConnection {
    url: Url,
    events: mpsc::Sender<SocketEvent>,
    commands: mpsc::Receiver<SocketCommand>,
}

impl FakeConnection {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn open(&self) {
        self.emit(SocketEvent::Open).await;
    }

    /// Deliver one text frame to the client.
    pub async fn deliver(&self, text: String) {
        self.emit(SocketEvent::Message(text)).await;
    }

    pub async fn fail(&self, message: &str) {
        self.emit(SocketEvent::Error(message.to_string())).await;
    }

    pub async fn close_from_server(&self) {
        self.emit(SocketEvent::Closed).await;
    }

    pub async fn next_command(&mut self) -> Option<SocketCommand> {
        self.commands.recv().await
    }

    /// Next frame the client sent, skipping close requests.
    pub async fn next_sent(&mut self) -> Option<String> {
        while let Some(cmd) = self.commands.recv().await {
            if let SocketCommand::Send(frame) = cmd {
                return Some(frame);
            }
        }
        None
    }

    /// Wait until the client asks to close. `false` if the socket was dropped
    /// without a close request.
    pub async fn wait_closed(&mut self) -> bool {
        while let Some(cmd) = self.commands.recv().await {
            if cmd == SocketCommand::Close {
                return true;
            }
        }
        false
    }

    async fn emit(&self, event: SocketEvent) {
        // The client may already have settled and dropped its receiver.
        let _ = self.events.send(event).await;
    }
}

/// Creates an app on `ws://localhost:8081` with the given identity.
///
/// # Arguments
/// * `id` - App id (e.g. `device-0-page-1`)
/// * `device_name` - Device display name
/// * `app_id` - Bundle identifier
pub fn test_app(id: &str, device_name: &str, app_id: &str) -> AppDescriptor {
    AppDescriptor {
        id: id.to_string(),
        title: format!("TestApp ({device_name})"),
        app_id: app_id.to_string(),
        device_name: device_name.to_string(),
        web_socket_debugger_url: "ws://localhost:8081/inspector/debug?device=0&page=1"
            .to_string(),
        ..Default::default()
    }
}

/// Builds the frame an app sends in reply to `plugin`/`method`.
pub fn response_frame(
    plugin: &str,
    method: &str,
    device_name: &str,
    application_id: &str,
    message: &str,
) -> String {
    json!({
        "messageKey": { "pluginName": plugin, "method": format!("{method}_response") },
        "payload": {
            "deviceName": device_name,
            "applicationId": application_id,
            "message": message,
        },
    })
    .to_string()
}
