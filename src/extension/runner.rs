//! Single entry point that runs one extension command.
//!
//! The runner materializes the [`ExtensionContext`], invokes the handler
//! exactly once and is the only place where handler errors are caught. A
//! failure is reported on the console with its full cause chain.

use std::future::Future;

use dtb_core::prelude::*;

use super::console::ExtensionConsole;
use super::context::{ExtensionContext, ExtensionInvocation};

/// How an extension run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    Completed,
    Failed,
}

impl ExtensionOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            ExtensionOutcome::Completed => 0,
            ExtensionOutcome::Failed => 1,
        }
    }
}

/// Run `handler` for `invocation`, reporting any error on `console`.
pub async fn run_cli_extension<'c, H, Fut>(
    invocation: ExtensionInvocation,
    console: &'c dyn ExtensionConsole,
    handler: H,
) -> ExtensionOutcome
where
    H: FnOnce(ExtensionContext, &'c dyn ExtensionConsole) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let context = match invocation.into_context() {
        Ok(context) => context,
        Err(e) => {
            report_error(console, &e);
            return ExtensionOutcome::Failed;
        }
    };

    let command = context.command.clone();
    debug!(
        "Running extension command '{}' against {}",
        command, context.metro_server_origin
    );

    match handler(context, console).await {
        Ok(()) => {
            debug!("Extension command '{}' completed", command);
            ExtensionOutcome::Completed
        }
        Err(e) => {
            error!("Extension command '{}' failed: {}", command, e);
            report_error(console, &e);
            ExtensionOutcome::Failed
        }
    }
}

/// Print `err` followed by one `caused by:` line per source.
pub fn report_error(console: &dyn ExtensionConsole, err: &Error) {
    console.error(&err.to_string());

    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        console.error(&format!("  caused by: {cause}"));
        source = cause.source();
    }
}
