//! Wire envelopes exchanged on the dev server's plugin broadcast channel.
//!
//! Every frame on the channel is a JSON object `{ messageKey, payload }`.
//! The CLI sends one request envelope per broadcast; each app answers with a
//! response envelope whose method carries the `_response` suffix.
//!
//! ```text
//! CLI → apps   { "messageKey": { "pluginName": "p", "method": "m" },
//!                "payload": { "from": "cli", ...params } }
//! app → CLI    { "messageKey": { "pluginName": "p", "method": "m_response" },
//!                "payload": { "deviceName": "..", "applicationId": "..", "message": ".." } }
//! ```
//!
//! The channel is shared by every plugin connected to the dev server, so
//! frames that are not addressed to the current request are expected and
//! decode to [`Decoded::Malformed`] or [`Decoded::Ignored`] rather than errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dtb_core::MessageKey;

/// Value of the `from` field in every payload the CLI sends.
pub const CLI_SENDER: &str = "cli";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Request envelope broadcast to all apps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    pub message_key: MessageKey,
    pub payload: Map<String, Value>,
}

impl OutboundEnvelope {
    /// Build a request for `key`, merging `params` after `from: "cli"`.
    ///
    /// A caller-supplied `from` key overwrites the default.
    pub fn new(key: MessageKey, params: Option<&Map<String, Value>>) -> Self {
        let mut payload = Map::new();
        payload.insert("from".to_string(), Value::String(CLI_SENDER.to_string()));
        if let Some(params) = params {
            for (k, v) in params {
                payload.insert(k.clone(), v.clone());
            }
        }
        Self {
            message_key: key,
            payload,
        }
    }

    /// Serialize to the JSON text frame sent on the socket.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Raw response envelope as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInboundEnvelope {
    message_key: MessageKey,
    #[serde(default)]
    payload: Value,
}

/// Validated response payload from one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub message_key: MessageKey,
    pub device_name: String,
    pub application_id: String,
    pub message: String,
}

/// Outcome of decoding one inbound text frame against an expected key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A well-formed response addressed to the expected plugin + method.
    Ok(InboundResponse),
    /// Addressed to another plugin or method; cross-talk on the shared channel.
    Ignored,
    /// Not a response envelope at all (bad JSON, missing fields).
    Malformed(String),
}

/// Decode `text` as a response to `expected`.
///
/// `expected` is the *request* key; the response method is derived from it.
/// Address filtering happens before payload validation, so a frame for
/// another plugin with an unexpected payload shape is [`Decoded::Ignored`].
pub fn decode_response(text: &str, expected: &MessageKey) -> Decoded {
    let raw: RawInboundEnvelope = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => return Decoded::Malformed(format!("invalid envelope: {e}")),
    };

    if raw.message_key.plugin_name != expected.plugin_name
        || raw.message_key.method != expected.response_method()
    {
        return Decoded::Ignored;
    }

    let payload = match raw.payload.as_object() {
        Some(obj) => obj,
        None => return Decoded::Malformed("payload is not an object".to_string()),
    };

    let field = |name: &str| -> Result<String, String> {
        match payload.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(format!("payload field '{name}' is not a string")),
            None => Err(format!("payload field '{name}' is missing")),
        }
    };

    let fields = field("deviceName").and_then(|device_name| {
        let application_id = field("applicationId")?;
        let message = message_text(payload.get("message"))
            .ok_or_else(|| "payload field 'message' is missing".to_string())?;
        Ok((device_name, application_id, message))
    });

    match fields {
        Ok((device_name, application_id, message)) => Decoded::Ok(InboundResponse {
            message_key: raw.message_key,
            device_name,
            application_id,
            message,
        }),
        Err(reason) => Decoded::Malformed(reason),
    }
}

/// Apps normally answer with a string; anything else is kept as compact JSON.
fn message_text(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}
