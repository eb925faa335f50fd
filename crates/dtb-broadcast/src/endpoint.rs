//! Broadcast endpoint derivation and app-list preconditions.
//!
//! All apps addressed by one broadcast must be reachable through the same
//! dev server, because a single socket to that server's broadcast hub carries
//! the request to every app.

use std::collections::HashSet;

use url::{Position, Url};

use dtb_core::{AppDescriptor, SendMessageError};

/// Path of the plugin broadcast hub on the dev server.
pub const BROADCAST_PATH: &str = "/expo-dev-plugins/broadcast";

/// Check the app list and return the broadcast URL shared by all apps.
///
/// Runs before any I/O. Rejects an empty list, an unparsable debugger URL,
/// apps on different scheme+host+port, and repeated app ids.
pub fn validate_apps(apps: &[AppDescriptor]) -> Result<Url, SendMessageError> {
    let first = apps.first().ok_or(SendMessageError::NoApps)?;
    let base = parse_debugger_url(first)?;
    let expected = origin_of(&base);

    let mut seen = HashSet::with_capacity(apps.len());
    for app in apps {
        let url = parse_debugger_url(app)?;
        let found = origin_of(&url);
        if found != expected {
            return Err(SendMessageError::HostMismatch {
                app: Box::new(app.clone()),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        if !seen.insert(app.id.as_str()) {
            return Err(SendMessageError::DuplicateAppId { id: app.id.clone() });
        }
    }

    Ok(broadcast_url_for(&base))
}

/// Replace path, query and fragment of a debugger URL with [`BROADCAST_PATH`].
///
/// `ws://localhost:8081/inspector/debug?device=0&page=1` becomes
/// `ws://localhost:8081/expo-dev-plugins/broadcast`.
pub fn broadcast_url_for(debugger_url: &Url) -> Url {
    let mut url = debugger_url.clone();
    url.set_path(BROADCAST_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn parse_debugger_url(app: &AppDescriptor) -> Result<Url, SendMessageError> {
    match Url::parse(&app.web_socket_debugger_url) {
        Ok(url) if url.has_host() => Ok(url),
        _ => Err(SendMessageError::InvalidDebuggerUrl {
            app: Box::new(app.clone()),
        }),
    }
}

/// `scheme://[user@]host[:port]`, the part that identifies the dev server.
fn origin_of(url: &Url) -> &str {
    &url[..Position::BeforePath]
}
