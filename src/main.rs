//! devtools-bridge - talk to plugins in running apps from the terminal
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devtools_bridge::config::{init_config_dir, load_settings};
use devtools_bridge::extension::StdConsole;
use devtools_bridge::{run_cli_extension, Bridge, BuiltinExtension, ExtensionInvocation};
use dtb_broadcast::{InspectorClient, WebSocketTransport};
use dtb_core::prelude::*;

/// devtools-bridge - talk to plugins in running apps from the terminal
#[derive(Parser, Debug)]
#[command(name = "dtb")]
#[command(about = "Send CLI extension commands to running apps", long_about = None)]
struct Args {
    #[command(subcommand)]
    extension: ExtensionCommand,
}

#[derive(Subcommand, Debug)]
enum ExtensionCommand {
    /// Inspect expo-sqlite databases (list_databases, execute_query, list_tables, get_table_schema)
    Sqlite(ExtensionInvocation),

    /// List or trigger expo-background-task tasks (list, trigger-test)
    BackgroundTask(ExtensionInvocation),

    /// Write a default .dtb/config.toml in the current directory
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;
    let args = Args::parse();

    // Logging is best-effort; the console output does not depend on it.
    let _ = dtb_core::logging::init();

    let project_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let (builtin, invocation) = match args.extension {
        ExtensionCommand::Sqlite(invocation) => (BuiltinExtension::Sqlite, invocation),
        ExtensionCommand::BackgroundTask(invocation) => {
            (BuiltinExtension::BackgroundTask, invocation)
        }
        ExtensionCommand::Init => {
            init_config_dir(&project_path).context("Failed to initialize .dtb/config.toml")?;
            eprintln!("Config ready at {}", project_path.join(".dtb/config.toml").display());
            return Ok(());
        }
    };

    let settings = load_settings(&project_path);
    let bridge = Bridge::new(InspectorClient::new()?, WebSocketTransport::new());

    info!(
        "Running {} command '{}'",
        builtin.plugin_name(),
        invocation.command
    );
    let outcome = run_cli_extension(
        invocation.with_defaults(&settings),
        &StdConsole,
        |ctx, console| builtin.run(&bridge, ctx, console),
    )
    .await;

    std::process::exit(outcome.exit_code());
}
