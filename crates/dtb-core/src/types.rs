//! Domain types shared by the broadcast layer and the extension runner

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder stored for apps that never answered before the deadline.
pub const TIMEOUT_PLACEHOLDER: &str = "No response (timeout)";

/// Per-app broadcast results, keyed by [`AppDescriptor::id`].
pub type ResultMap = BTreeMap<String, String>;

// ─────────────────────────────────────────────────────────────────
// AppDescriptor
// ─────────────────────────────────────────────────────────────────

/// One running, inspectable application instance as reported by the dev
/// server's `/json/list` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDescriptor {
    /// Opaque unique id, stable per device + page (e.g. `device-0-page-1`).
    pub id: String,

    /// Display name, usually `"<App> (<Device>)"`.
    #[serde(default)]
    pub title: String,

    /// Bundle / application identifier.
    #[serde(default)]
    pub app_id: String,

    /// Display name of the hosting device.
    #[serde(default)]
    pub device_name: String,

    /// e.g. `ws://localhost:8081/inspector/debug?device=0&page=1`
    pub web_socket_debugger_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtools_frontend_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub react_native: Option<ReactNativeInfo>,
}

impl AppDescriptor {
    /// Whether the page advertises `reactNative.capabilities.nativePageReloads`.
    pub fn supports_native_page_reloads(&self) -> bool {
        self.react_native
            .as_ref()
            .and_then(|rn| rn.capabilities.native_page_reloads)
            .unwrap_or(false)
    }

    /// Title for display, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// `reactNative` block of an inspector page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactNativeInfo {
    #[serde(default)]
    pub capabilities: Capabilities,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_device_id: Option<String>,
}

/// Capability flags of an inspector page. Only the flag we filter on is typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_page_reloads: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────
// MessageKey
// ─────────────────────────────────────────────────────────────────

/// Suffix appended to a method name by the app when it answers.
pub const RESPONSE_SUFFIX: &str = "_response";

/// Addresses one logical RPC endpoint on the broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub plugin_name: String,
    pub method: String,
}

impl MessageKey {
    pub fn new(plugin_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            method: method.into(),
        }
    }

    /// Method name an app uses to answer this key.
    pub fn response_method(&self) -> String {
        format!("{}{}", self.method, RESPONSE_SUFFIX)
    }

    /// The key an app answers this request with.
    pub fn response_key(&self) -> MessageKey {
        MessageKey::new(self.plugin_name.clone(), self.response_method())
    }
}
