//! `dtb background-task <command>`: list and trigger expo-background-task
//! tasks in running apps.

use dtb_broadcast::{AppSource, BroadcastTransport};
use dtb_core::prelude::*;

use super::Bridge;
use crate::extension::{ExtensionConsole, ExtensionContext};

pub const PLUGIN_NAME: &str = "expo-background-task-cli-extension";

const GET_REGISTERED_TASKS: &str = "getRegisteredBackgroundTasks";
const TRIGGER_TASKS: &str = "triggerBackgroundTasks";

pub async fn run<S, T>(
    bridge: &Bridge<S, T>,
    ctx: ExtensionContext,
    console: &dyn ExtensionConsole,
) -> Result<()>
where
    S: AppSource,
    T: BroadcastTransport,
{
    let method = match ctx.command.as_str() {
        "list" => GET_REGISTERED_TASKS,
        "trigger-test" => TRIGGER_TASKS,
        other => {
            console.error(&format!("Unknown command: {other}"));
            return Ok(());
        }
    };

    bridge
        .broadcast_to_all(&ctx, console, PLUGIN_NAME, method, None)
        .await
}
