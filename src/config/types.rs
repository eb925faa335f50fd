//! Configuration types for devtools-bridge
//!
//! Defines:
//! - `Settings` - Settings loaded from `.dtb/config.toml`
//! - `ServerSettings` - Where the dev server lives
//! - `BroadcastSettings` - Broadcast call defaults

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application settings (.dtb/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub broadcast: BroadcastSettings,
}

/// Dev server settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Origin of the Metro dev server, used when `--metro-server-origin` is
    /// not given
    #[serde(default = "default_metro_server_origin")]
    pub metro_server_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            metro_server_origin: default_metro_server_origin(),
        }
    }
}

/// Broadcast settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BroadcastSettings {
    /// How long to wait for app responses (ms)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl BroadcastSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_metro_server_origin() -> String {
    "http://localhost:8081".to_string()
}

fn default_timeout_ms() -> u64 {
    dtb_broadcast::DEFAULT_TIMEOUT.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.server.metro_server_origin, "http://localhost:8081");
        assert_eq!(settings.broadcast.timeout_ms, 10_000);
        assert_eq!(settings.broadcast.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let settings: Settings = toml::from_str("[server]\n").unwrap();
        assert_eq!(settings.server.metro_server_origin, "http://localhost:8081");
        assert_eq!(settings.broadcast.timeout_ms, 10_000);
    }
}
