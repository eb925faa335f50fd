//! Broadcast a CLI message to running apps and collect their responses.
//!
//! One call opens exactly one socket to the dev server's broadcast hub,
//! sends one request envelope once the socket is open, and feeds every
//! socket event, the deadline and an optional abort signal into a
//! [`Correlator`] until it settles. The socket is closed on every outcome.
//!
//! ## Quick start
//!
//! ```ignore
//! use dtb_broadcast::{send_broadcast_message, WebSocketTransport};
//!
//! let results = send_broadcast_message(
//!     &WebSocketTransport::new(),
//!     "listDatabases",
//!     "expo-sqlite-cli-extension",
//!     &apps,
//!     None,
//!     None,
//! )
//! .await?;
//! for (app_id, message) in &results {
//!     println!("{app_id}: {message}");
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::Instant;

use dtb_core::prelude::*;
use dtb_core::{AppDescriptor, MessageKey, ResultMap};

use crate::correlator::{Correlator, Step};
use crate::endpoint::validate_apps;
use crate::transport::{BroadcastSocket, BroadcastTransport, SocketEvent};

/// How long to wait for responses when the caller does not say.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

// ---------------------------------------------------------------------------
// BroadcastRequest
// ---------------------------------------------------------------------------

/// What to broadcast: plugin, method, extra payload fields and deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastRequest {
    pub key: MessageKey,
    pub params: Option<Map<String, Value>>,
    pub timeout: Duration,
}

impl BroadcastRequest {
    pub fn new(method: impl Into<String>, plugin_name: impl Into<String>) -> Self {
        Self {
            key: MessageKey::new(plugin_name, method),
            params: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Extra payload fields, merged after `from: "cli"`.
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

/// Sends [`BroadcastRequest`]s through an injected transport.
///
/// Holds no per-call state: concurrent calls each open their own socket and
/// keep their own result map.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster<T> {
    transport: T,
}

impl<T: BroadcastTransport> Broadcaster<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Broadcast `request` to `apps` and wait for the outcome.
    ///
    /// # Errors
    ///
    /// [`Error::SendMessage`] for every failure mode: precondition
    /// violations, unknown responders, timeout without any response, and
    /// transport errors.
    pub async fn send(&self, request: &BroadcastRequest, apps: &[AppDescriptor]) -> Result<ResultMap> {
        self.send_with_abort(request, apps, std::future::pending())
            .await
    }

    /// Like [`send`](Self::send), but gives up with
    /// [`SendMessageError::Aborted`] as soon as `abort` completes.
    pub async fn send_with_abort<F>(
        &self,
        request: &BroadcastRequest,
        apps: &[AppDescriptor],
        abort: F,
    ) -> Result<ResultMap>
    where
        F: Future<Output = ()>,
    {
        run_broadcast(&self.transport, request, apps, abort)
            .await
            .map_err(Error::from)
    }
}

/// Function form of [`Broadcaster::send`].
///
/// `timeout` defaults to [`DEFAULT_TIMEOUT`].
pub async fn send_broadcast_message<T: BroadcastTransport + ?Sized>(
    transport: &T,
    method: &str,
    plugin_name: &str,
    apps: &[AppDescriptor],
    params: Option<Map<String, Value>>,
    timeout: Option<Duration>,
) -> Result<ResultMap> {
    let mut request = BroadcastRequest::new(method, plugin_name);
    request.params = params;
    if let Some(timeout) = timeout {
        request.timeout = timeout;
    }
    run_broadcast(transport, &request, apps, std::future::pending())
        .await
        .map_err(Error::from)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

async fn run_broadcast<T, F>(
    transport: &T,
    request: &BroadcastRequest,
    apps: &[AppDescriptor],
    abort: F,
) -> std::result::Result<ResultMap, SendMessageError>
where
    T: BroadcastTransport + ?Sized,
    F: Future<Output = ()>,
{
    // The deadline counts from the call, not from the socket opening.
    let deadline = Instant::now() + request.timeout;

    let url = validate_apps(apps)?;
    let mut correlator = Correlator::new(
        request.key.clone(),
        apps.to_vec(),
        request.params.as_ref(),
        request.timeout,
    );

    info!(
        "Broadcasting {}/{} to {} app(s) via {}",
        request.key.plugin_name,
        request.key.method,
        apps.len(),
        url
    );
    let mut socket = transport.open(&url);

    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);
    tokio::pin!(abort);

    let outcome = loop {
        let step = tokio::select! {
            event = socket.next_event() => {
                handle_socket_event(event, &mut correlator, &socket).await
            }
            _ = &mut sleep => {
                debug!("broadcast: deadline reached after {:?}", request.timeout);
                correlator.on_timeout()
            }
            _ = &mut abort => {
                debug!("broadcast: aborted by caller");
                correlator.on_abort()
            }
        };

        match step {
            Step::Pending | Step::Settled => continue,
            Step::Resolved(results) => break Ok(results),
            Step::Rejected(err) => break Err(err),
        }
    };

    socket.close().await;

    match &outcome {
        Ok(results) => debug!("broadcast: resolved with {} result(s)", results.len()),
        Err(err) => debug!("broadcast: rejected: {}", err),
    }
    outcome
}

async fn handle_socket_event(
    event: Option<SocketEvent>,
    correlator: &mut Correlator,
    socket: &BroadcastSocket,
) -> Step {
    match event {
        Some(SocketEvent::Open) => {
            let frame = match correlator.on_open().map(|envelope| envelope.to_frame()) {
                None => return Step::Pending,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return correlator.on_error(format!("failed to encode request: {e}")),
            };
            trace!("broadcast: sending {}", frame);
            match socket.send(frame).await {
                Ok(()) => Step::Pending,
                Err(e) => correlator.on_error(e.to_string()),
            }
        }
        Some(SocketEvent::Message(text)) => correlator.on_message(&text),
        Some(SocketEvent::Error(message)) => correlator.on_error(message),
        Some(SocketEvent::Closed) | None => correlator.on_closed(),
    }
}
