//! CLI extension runtime
//!
//! An extension is an async handler that receives an [`ExtensionContext`]
//! (command, dev server origin, JSON args) and an [`ExtensionConsole`].
//! [`run_cli_extension`] parses nothing itself beyond `--args`, runs the
//! handler once and turns its result into an [`ExtensionOutcome`].

pub mod console;
pub mod context;
pub mod runner;

pub use console::{BufferConsole, ConsoleLevel, ExtensionConsole, StdConsole};
pub use context::{ExtensionContext, ExtensionInvocation};
pub use runner::{report_error, run_cli_extension, ExtensionOutcome};
