//! Built-in CLI extensions
//!
//! Each built-in maps CLI commands onto broadcast methods of one app-side
//! plugin, then prints one line per responding app:
//!
//! ```text
//! dtb sqlite list_databases
//! iPhone 15 (MyApp): ["main.db"]
//! ```

pub mod background_task;
pub mod sqlite;

use serde_json::{Map, Value};

use dtb_broadcast::{AppSource, BroadcastRequest, BroadcastTransport, Broadcaster};
use dtb_core::prelude::*;
use dtb_core::{AppDescriptor, ResultMap};

use crate::extension::{ExtensionConsole, ExtensionContext};

/// Message shown when a broadcast to the apps fails.
pub const CONNECT_ERROR: &str = "An error occurred connecting to the app.";

/// Extensions shipped with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinExtension {
    Sqlite,
    BackgroundTask,
}

impl BuiltinExtension {
    /// Name of the app-side plugin this extension talks to.
    pub fn plugin_name(self) -> &'static str {
        match self {
            BuiltinExtension::Sqlite => sqlite::PLUGIN_NAME,
            BuiltinExtension::BackgroundTask => background_task::PLUGIN_NAME,
        }
    }

    /// Handle one command. Usable directly as a `run_cli_extension` handler
    /// body.
    pub async fn run<S, T>(
        self,
        bridge: &Bridge<S, T>,
        ctx: ExtensionContext,
        console: &dyn ExtensionConsole,
    ) -> Result<()>
    where
        S: AppSource,
        T: BroadcastTransport,
    {
        match self {
            BuiltinExtension::Sqlite => sqlite::run(bridge, ctx, console).await,
            BuiltinExtension::BackgroundTask => background_task::run(bridge, ctx, console).await,
        }
    }
}

/// App discovery plus broadcasting, shared by the built-ins.
#[derive(Debug, Clone)]
pub struct Bridge<S, T> {
    source: S,
    broadcaster: Broadcaster<T>,
}

impl<S, T> Bridge<S, T>
where
    S: AppSource,
    T: BroadcastTransport,
{
    pub fn new(source: S, transport: T) -> Self {
        Self {
            source,
            broadcaster: Broadcaster::new(transport),
        }
    }

    /// Broadcast `method` to every app connected at the context's origin and
    /// print the responses.
    ///
    /// Having no connected apps is reported on the console, not as an error.
    pub async fn broadcast_to_all(
        &self,
        ctx: &ExtensionContext,
        console: &dyn ExtensionConsole,
        plugin_name: &str,
        method: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<()> {
        let apps = self.source.query_apps(&ctx.metro_server_origin).await?;
        if apps.is_empty() {
            console.error(&format!(
                "No connected apps found at {}",
                ctx.metro_server_origin
            ));
            return Ok(());
        }

        let mut request = BroadcastRequest::new(method, plugin_name).timeout(ctx.timeout);
        if let Some(params) = params {
            request = request.params(params);
        }

        let results = self
            .broadcaster
            .send(&request, &apps)
            .await
            .map_err(|e| Error::extension_with_cause(CONNECT_ERROR, e))?;

        print_results(console, &apps, &results);
        Ok(())
    }
}

/// One `<blue label>: <message>` line per result, labelled with the app
/// title when the app is known.
pub fn print_results(console: &dyn ExtensionConsole, apps: &[AppDescriptor], results: &ResultMap) {
    for (app_id, message) in results {
        let label = apps
            .iter()
            .find(|app| &app.id == app_id)
            .map(AppDescriptor::display_name)
            .unwrap_or(app_id);
        console.info(&format!("{}: {}", blue(label), message));
    }
}

fn blue(text: &str) -> String {
    format!("\x1b[34m{text}\x1b[0m")
}
