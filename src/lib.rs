//! devtools-bridge library
//!
//! Runs CLI extensions that talk to plugins inside running React Native apps
//! through the dev server's broadcast channel.

// Module declarations
pub mod builtin;
pub mod config;
pub mod extension;

// Re-export main entry points
pub use builtin::{Bridge, BuiltinExtension};
pub use extension::{run_cli_extension, ExtensionContext, ExtensionInvocation, ExtensionOutcome};
