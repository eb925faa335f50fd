//! Application error types with rich context

use thiserror::Error;

use crate::types::AppDescriptor;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Broadcast Errors
    // ─────────────────────────────────────────────────────────────
    #[error(transparent)]
    SendMessage(#[from] SendMessageError),

    // ─────────────────────────────────────────────────────────────
    // Discovery Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Discovery error: {message}")]
    Discovery { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration / Invocation Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid extension arguments: {message}")]
    InvalidArgs { message: String },

    // ─────────────────────────────────────────────────────────────
    // Extension Errors
    // ─────────────────────────────────────────────────────────────
    #[error("{message}")]
    Extension {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Failures of a single broadcast call.
///
/// Variants that are caused by a particular app carry its descriptor so the
/// caller can report which device was at fault.
#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("No apps provided to send the message to.")]
    NoApps,

    #[error("Invalid debugger URL for app '{}': {}", .app.id, .app.web_socket_debugger_url)]
    InvalidDebuggerUrl { app: Box<AppDescriptor> },

    #[error(
        "Apps must share the same debugging host: '{}' ({}) uses {found}, expected {expected}",
        .app.title,
        .app.device_name
    )]
    HostMismatch {
        app: Box<AppDescriptor>,
        expected: String,
        found: String,
    },

    #[error("Duplicate app id in request: {id}")]
    DuplicateAppId { id: String },

    #[error("Received response for unknown app: {device_name} ({application_id})")]
    UnknownApp {
        device_name: String,
        application_id: String,
    },

    #[error("Timeout: no app responded within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to connect to the WebSocket server: {message}")]
    ConnectionFailed { message: String },

    #[error("Broadcast aborted before completion")]
    Aborted,
}

impl SendMessageError {
    /// The app descriptor this error refers to, when there is one.
    pub fn app(&self) -> Option<&AppDescriptor> {
        match self {
            SendMessageError::InvalidDebuggerUrl { app }
            | SendMessageError::HostMismatch { app, .. } => Some(app.as_ref()),
            _ => None,
        }
    }

    /// True for failures detected before any network I/O.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SendMessageError::NoApps
                | SendMessageError::InvalidDebuggerUrl { .. }
                | SendMessageError::HostMismatch { .. }
                | SendMessageError::DuplicateAppId { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            message: message.into(),
        }
    }

    pub fn extension(message: impl Into<String>) -> Self {
        Self::Extension {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap `cause` under a user-facing extension message.
    pub fn extension_with_cause(message: impl Into<String>, cause: Error) -> Self {
        Self::Extension {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// The broadcast failure behind this error, if any.
    pub fn as_send_message(&self) -> Option<&SendMessageError> {
        match self {
            Error::SendMessage(e) => Some(e),
            Error::Extension {
                source: Some(inner),
                ..
            } => inner.as_send_message(),
            _ => None,
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Discovery { .. }
                | Error::ChannelClosed
                | Error::SendMessage(SendMessageError::Timeout { .. })
                | Error::SendMessage(SendMessageError::ConnectionFailed { .. })
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config { .. } | Error::InvalidArgs { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn app(id: &str, url: &str) -> AppDescriptor {
        AppDescriptor {
            id: id.to_string(),
            title: "TestApp (iPhone 15)".to_string(),
            app_id: "com.test.app".to_string(),
            device_name: "iPhone 15".to_string(),
            web_socket_debugger_url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_error_display_messages() {
        let err: Error = SendMessageError::NoApps.into();
        assert_eq!(err.to_string(), "No apps provided to send the message to.");

        let err: Error = SendMessageError::Timeout { timeout_ms: 1000 }.into();
        assert!(err.to_string().starts_with("Timeout"));

        let err: Error = SendMessageError::ConnectionFailed {
            message: "refused".into(),
        }
        .into();
        assert!(err
            .to_string()
            .contains("Failed to connect to the WebSocket server"));
    }

    #[test]
    fn test_host_mismatch_carries_app() {
        let offending = app("device-1-page-1", "ws://otherhost:9090/inspector");
        let err = SendMessageError::HostMismatch {
            app: Box::new(offending),
            expected: "ws://localhost:8081".into(),
            found: "ws://otherhost:9090".into(),
        };

        assert_eq!(err.app().map(|a| a.id.as_str()), Some("device-1-page-1"));
        assert!(err.is_precondition());
        assert!(err.to_string().contains("same debugging host"));
        assert!(err.to_string().contains("otherhost:9090"));
    }

    #[test]
    fn test_unknown_app_message() {
        let err = SendMessageError::UnknownApp {
            device_name: "Unknown Device".into(),
            application_id: "com.unknown.app".into(),
        };
        assert!(err.to_string().contains("unknown app"));
        assert!(err.app().is_none());
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_extension_error_keeps_cause_chain() {
        let cause: Error = SendMessageError::Timeout { timeout_ms: 500 }.into();
        let err = Error::extension_with_cause("An error occurred connecting to the app.", cause);

        assert_eq!(err.to_string(), "An error occurred connecting to the app.");
        let source = err.source().expect("source should be set");
        assert!(source.to_string().contains("Timeout"));
        assert!(matches!(
            err.as_send_message(),
            Some(SendMessageError::Timeout { timeout_ms: 500 })
        ));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::config("bad").is_fatal());
        assert!(Error::invalid_args("bad").is_fatal());
        assert!(!Error::discovery("down").is_fatal());
        assert!(Error::discovery("down").is_recoverable());
        assert!(Error::from(SendMessageError::Timeout { timeout_ms: 1 }).is_recoverable());
        assert!(!Error::from(SendMessageError::NoApps).is_recoverable());
    }

    #[test]
    fn test_result_ext_context_passes_error_through() {
        let res: std::result::Result<(), SendMessageError> = Err(SendMessageError::Aborted);
        let err = res.context("broadcast").unwrap_err();
        assert!(matches!(err, Error::SendMessage(SendMessageError::Aborted)));
    }
}
