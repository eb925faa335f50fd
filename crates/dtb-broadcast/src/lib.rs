//! # dtb-broadcast - Plugin Broadcast Messaging
//!
//! Sends one CLI request to many running apps over the dev server's plugin
//! broadcast channel and correlates their responses. Also discovers which
//! apps are connected to a dev server.
//!
//! Depends on [`dtb_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Broadcasting
//! - [`send_broadcast_message()`] - Broadcast a request and collect per-app results
//! - [`Broadcaster`] - Same, bound to a transport, with abort support
//! - [`BroadcastRequest`] - Plugin, method, params and timeout of one call
//!
//! ### Wire Protocol
//! - [`OutboundEnvelope`] - Request frame sent by the CLI
//! - [`decode_response()`] - Decode and address-filter an inbound frame
//!
//! ### Correlation
//! - [`Correlator`] - Synchronous per-call state machine
//!
//! ### Transport
//! - [`BroadcastTransport`] - Opens sockets to the broadcast endpoint
//! - [`WebSocketTransport`] - tokio-tungstenite implementation
//!
//! ### Discovery
//! - [`AppSource`] - Lists apps connected to a dev server
//! - [`InspectorClient`] - `GET /json/list` implementation

pub mod broadcast;
pub mod correlator;
pub mod discovery;
pub mod endpoint;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod transport;

// Public API re-exports
pub use broadcast::{send_broadcast_message, BroadcastRequest, Broadcaster, DEFAULT_TIMEOUT};
pub use correlator::{Correlator, CorrelatorState, Step};
pub use discovery::{
    filter_supported_pages, json_list_url, AppSource, InspectorClient, LocalAppSource,
    StaticAppSource,
};
pub use endpoint::{broadcast_url_for, validate_apps, BROADCAST_PATH};
pub use protocol::{decode_response, Decoded, InboundResponse, OutboundEnvelope, CLI_SENDER};
pub use transport::{
    BroadcastSocket, BroadcastTransport, SocketCommand, SocketEvent, WebSocketTransport,
};
