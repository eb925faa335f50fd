//! Response correlation for one broadcast call.
//!
//! [`Correlator`] is a synchronous state machine. It owns the result map for
//! a single call and is fed transport events (`open`, text frames, errors,
//! close), timer expiry and aborts by the async driver in
//! [`crate::broadcast`]. It never touches a socket or a clock, which keeps
//! every terminal rule testable in isolation.
//!
//! ```text
//!   Connecting ──open──▶ AwaitingResponses ──all apps answered──▶ Resolved
//!       │                        │
//!       │                        ├──timeout / close, ≥1 answer──▶ Resolved (partial)
//!       │                        ├──timeout / close, 0 answers──▶ Rejected(Timeout)
//!       └────────────────────────┼──error───────────────────────▶ Rejected(ConnectionFailed)
//!                                ├──unknown app answered────────▶ Rejected(UnknownApp)
//!                                └──abort───────────────────────▶ Rejected(Aborted)
//! ```
//!
//! The first terminal transition wins; later events return [`Step::Settled`].

use std::time::Duration;

use serde_json::{Map, Value};

use dtb_core::prelude::*;
use dtb_core::{AppDescriptor, MessageKey, ResultMap, TIMEOUT_PLACEHOLDER};

use crate::protocol::{decode_response, Decoded, InboundResponse, OutboundEnvelope};

/// Lifecycle state of a [`Correlator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatorState {
    /// Socket requested, `open` not yet seen.
    Connecting,
    /// Request sent, collecting per-app responses.
    AwaitingResponses,
    /// Finished with a result map.
    Resolved,
    /// Finished with an error.
    Rejected,
}

impl CorrelatorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CorrelatorState::Resolved | CorrelatorState::Rejected)
    }
}

/// Result of feeding one event to the [`Correlator`].
#[derive(Debug)]
pub enum Step {
    /// Still waiting for more responses.
    Pending,
    /// Terminal: the call succeeds with this map.
    Resolved(ResultMap),
    /// Terminal: the call fails.
    Rejected(SendMessageError),
    /// The correlator had already settled; the event changed nothing.
    Settled,
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Resolved(_) | Step::Rejected(_))
    }
}

/// Per-call correlation state.
#[derive(Debug)]
pub struct Correlator {
    key: MessageKey,
    apps: Vec<AppDescriptor>,
    request: OutboundEnvelope,
    results: ResultMap,
    timeout: Duration,
    state: CorrelatorState,
}

impl Correlator {
    /// Create a correlator for `apps`.
    ///
    /// The app list is expected to have passed
    /// [`validate_apps`](crate::endpoint::validate_apps).
    pub fn new(
        key: MessageKey,
        apps: Vec<AppDescriptor>,
        params: Option<&Map<String, Value>>,
        timeout: Duration,
    ) -> Self {
        let request = OutboundEnvelope::new(key.clone(), params);
        Self {
            key,
            apps,
            request,
            results: ResultMap::new(),
            timeout,
            state: CorrelatorState::Connecting,
        }
    }

    pub fn state(&self) -> CorrelatorState {
        self.state
    }

    /// Responses recorded so far.
    pub fn results(&self) -> &ResultMap {
        &self.results
    }

    pub fn key(&self) -> &MessageKey {
        &self.key
    }

    /// Socket opened. Returns the request to send, exactly once per call.
    pub fn on_open(&mut self) -> Option<&OutboundEnvelope> {
        if self.state != CorrelatorState::Connecting {
            return None;
        }
        self.state = CorrelatorState::AwaitingResponses;
        Some(&self.request)
    }

    /// Feed one inbound text frame.
    pub fn on_message(&mut self, text: &str) -> Step {
        if self.state.is_terminal() {
            return Step::Settled;
        }

        match decode_response(text, &self.key) {
            Decoded::Ok(response) => self.record(response),
            Decoded::Ignored => {
                trace!("broadcast: ignoring frame for another plugin or method");
                Step::Pending
            }
            Decoded::Malformed(reason) => {
                debug!("broadcast: dropping malformed frame: {}", reason);
                Step::Pending
            }
        }
    }

    /// The transport reported an error. Overrides any partial results.
    pub fn on_error(&mut self, message: impl Into<String>) -> Step {
        if self.state.is_terminal() {
            return Step::Settled;
        }
        self.reject(SendMessageError::ConnectionFailed {
            message: message.into(),
        })
    }

    /// The socket closed before every app answered.
    ///
    /// No further responses can arrive, so the call settles right away as if
    /// the deadline had passed.
    pub fn on_closed(&mut self) -> Step {
        if self.state.is_terminal() {
            return Step::Settled;
        }
        debug!(
            "broadcast: socket closed with {}/{} response(s)",
            self.results.len(),
            self.apps.len()
        );
        self.settle_missing()
    }

    /// The caller abandoned the call.
    pub fn on_abort(&mut self) -> Step {
        if self.state.is_terminal() {
            return Step::Settled;
        }
        self.reject(SendMessageError::Aborted)
    }

    /// The deadline passed.
    ///
    /// Missing apps get [`TIMEOUT_PLACEHOLDER`]. With no real response at all
    /// the call is rejected instead of resolving with placeholders only.
    pub fn on_timeout(&mut self) -> Step {
        if self.state.is_terminal() {
            return Step::Settled;
        }
        self.settle_missing()
    }

    fn settle_missing(&mut self) -> Step {
        if self.results.is_empty() {
            return self.reject(SendMessageError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            });
        }

        for app in &self.apps {
            self.results
                .entry(app.id.clone())
                .or_insert_with(|| TIMEOUT_PLACEHOLDER.to_string());
        }
        self.resolve()
    }

    fn record(&mut self, response: InboundResponse) -> Step {
        let app = self.apps.iter().find(|app| {
            app.device_name == response.device_name && app.app_id == response.application_id
        });

        let Some(app) = app else {
            warn!(
                "broadcast: response from unknown app {} ({})",
                response.device_name, response.application_id
            );
            return self.reject(SendMessageError::UnknownApp {
                device_name: response.device_name,
                application_id: response.application_id,
            });
        };

        debug!("broadcast: response from {} ({})", app.id, app.device_name);
        self.results.insert(app.id.clone(), response.message);

        if self.apps.iter().all(|app| self.results.contains_key(&app.id)) {
            self.resolve()
        } else {
            Step::Pending
        }
    }

    fn resolve(&mut self) -> Step {
        self.state = CorrelatorState::Resolved;
        Step::Resolved(self.results.clone())
    }

    fn reject(&mut self, err: SendMessageError) -> Step {
        self.state = CorrelatorState::Rejected;
        Step::Rejected(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app(id: &str, device: &str, app_id: &str) -> AppDescriptor {
        AppDescriptor {
            id: id.to_string(),
            title: format!("TestApp ({device})"),
            app_id: app_id.to_string(),
            device_name: device.to_string(),
            web_socket_debugger_url: "ws://localhost:8081/inspector/debug?device=0&page=1"
                .to_string(),
            ..Default::default()
        }
    }

    fn response(plugin: &str, method: &str, device: &str, app_id: &str, message: &str) -> String {
        json!({
            "messageKey": { "pluginName": plugin, "method": format!("{method}_response") },
            "payload": { "deviceName": device, "applicationId": app_id, "message": message },
        })
        .to_string()
    }

    fn two_apps() -> Correlator {
        let mut c = Correlator::new(
            MessageKey::new("plugin", "query"),
            vec![
                app("device-0-page-1", "iPhone 15", "com.test.app"),
                app("device-1-page-1", "iPad", "com.test.app2"),
            ],
            None,
            Duration::from_millis(1000),
        );
        c.on_open();
        c
    }

    #[test]
    fn test_open_yields_request_once() {
        let mut c = Correlator::new(
            MessageKey::new("my-plugin", "doSomething"),
            vec![app("a", "iPhone 15", "com.test.app")],
            None,
            Duration::from_secs(10),
        );
        assert_eq!(c.state(), CorrelatorState::Connecting);

        let frame = c.on_open().unwrap().to_frame().unwrap();
        assert_eq!(
            frame,
            r#"{"messageKey":{"pluginName":"my-plugin","method":"doSomething"},"payload":{"from":"cli"}}"#
        );
        assert_eq!(c.state(), CorrelatorState::AwaitingResponses);
        assert!(c.on_open().is_none());
    }

    #[test]
    fn test_single_response_resolves() {
        let mut c = Correlator::new(
            MessageKey::new("plugin", "query"),
            vec![app("device-0-page-1", "iPhone 15", "com.test.app")],
            None,
            Duration::from_secs(10),
        );
        c.on_open();

        match c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "ok")) {
            Step::Resolved(map) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map["device-0-page-1"], "ok");
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
        assert_eq!(c.state(), CorrelatorState::Resolved);
    }

    #[test]
    fn test_all_responses_resolve_in_any_order() {
        let mut c = two_apps();

        let step = c.on_message(&response("plugin", "query", "iPad", "com.test.app2", "result-2"));
        assert!(matches!(step, Step::Pending));

        match c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "result-1")) {
            Step::Resolved(map) => {
                assert_eq!(map["device-0-page-1"], "result-1");
                assert_eq!(map["device-1-page-1"], "result-2");
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_response_last_write_wins() {
        let mut c = two_apps();
        c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "first"));
        c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "second"));

        assert_eq!(c.results()["device-0-page-1"], "second");
        assert_eq!(c.state(), CorrelatorState::AwaitingResponses);
    }

    #[test]
    fn test_unknown_app_rejects_after_valid_response() {
        let mut c = two_apps();
        c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "ok"));

        match c.on_message(&response("plugin", "query", "Unknown Device", "com.unknown.app", "nope")) {
            Step::Rejected(err) => assert!(err.to_string().contains("unknown app")),
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(c.state(), CorrelatorState::Rejected);
    }

    #[test]
    fn test_device_name_and_app_id_must_both_match() {
        let mut c = two_apps();
        // Right device, wrong application id.
        let step = c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app2", "x"));
        assert!(matches!(step, Step::Rejected(SendMessageError::UnknownApp { .. })));
    }

    #[test]
    fn test_irrelevant_frames_are_idempotent() {
        let mut c = two_apps();
        let frames = [
            "{not json".to_string(),
            response("other-plugin", "query", "iPhone 15", "com.test.app", "wrong"),
            response("plugin", "otherMethod", "iPhone 15", "com.test.app", "wrong"),
            json!({ "messageKey": { "pluginName": "plugin", "method": "query_response" } })
                .to_string(),
        ];

        for _ in 0..3 {
            for frame in &frames {
                assert!(matches!(c.on_message(frame), Step::Pending));
            }
        }
        assert!(c.results().is_empty());
        assert_eq!(c.state(), CorrelatorState::AwaitingResponses);
    }

    #[test]
    fn test_timeout_without_responses_rejects() {
        let mut c = two_apps();
        match c.on_timeout() {
            Step::Rejected(err @ SendMessageError::Timeout { .. }) => {
                assert!(err.to_string().contains("Timeout"));
                assert!(err.to_string().contains("1000ms"));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_with_partial_responses_resolves() {
        let mut c = two_apps();
        c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "ok"));

        match c.on_timeout() {
            Step::Resolved(map) => {
                assert_eq!(map["device-0-page-1"], "ok");
                assert_eq!(map["device-1-page-1"], TIMEOUT_PLACEHOLDER);
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_before_open_rejects() {
        let mut c = Correlator::new(
            MessageKey::new("plugin", "query"),
            vec![app("a", "iPhone 15", "com.test.app")],
            None,
            Duration::from_millis(250),
        );
        assert!(matches!(
            c.on_timeout(),
            Step::Rejected(SendMessageError::Timeout { timeout_ms: 250 })
        ));
    }

    #[test]
    fn test_error_overrides_partial_results() {
        let mut c = two_apps();
        c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "ok"));

        match c.on_error("connection reset") {
            Step::Rejected(err) => {
                assert!(err.to_string().contains("Failed to connect"));
                assert!(err.to_string().contains("connection reset"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_close_without_responses_rejects_as_timeout() {
        let mut c = two_apps();
        assert!(matches!(
            c.on_closed(),
            Step::Rejected(SendMessageError::Timeout { timeout_ms: 1000 })
        ));
        assert_eq!(c.state(), CorrelatorState::Rejected);
    }

    #[test]
    fn test_close_after_partial_response_resolves() {
        let mut c = two_apps();
        c.on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "ok"));

        match c.on_closed() {
            Step::Resolved(map) => {
                assert_eq!(map["device-0-page-1"], "ok");
                assert_eq!(map["device-1-page-1"], TIMEOUT_PLACEHOLDER);
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
        assert!(matches!(c.on_timeout(), Step::Settled));
    }

    #[test]
    fn test_abort_rejects() {
        let mut c = two_apps();
        assert!(matches!(c.on_abort(), Step::Rejected(SendMessageError::Aborted)));
    }

    #[test]
    fn test_first_terminal_transition_wins() {
        let mut c = Correlator::new(
            MessageKey::new("plugin", "query"),
            vec![app("device-0-page-1", "iPhone 15", "com.test.app")],
            None,
            Duration::from_secs(10),
        );
        c.on_open();
        assert!(c
            .on_message(&response("plugin", "query", "iPhone 15", "com.test.app", "ok"))
            .is_terminal());

        assert!(matches!(c.on_error("late"), Step::Settled));
        assert!(matches!(c.on_timeout(), Step::Settled));
        assert!(matches!(c.on_abort(), Step::Settled));
        assert!(matches!(
            c.on_message(&response("plugin", "query", "Nobody", "x", "y")),
            Step::Settled
        ));
        assert_eq!(c.state(), CorrelatorState::Resolved);
        assert_eq!(c.results()["device-0-page-1"], "ok");
    }
}
