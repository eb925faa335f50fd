//! `dtb sqlite <command>`: inspect expo-sqlite databases in running apps.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dtb_broadcast::{AppSource, BroadcastTransport};
use dtb_core::prelude::*;

use super::Bridge;
use crate::extension::{ExtensionConsole, ExtensionContext};

pub const PLUGIN_NAME: &str = "expo-sqlite-cli-extension";

/// Commands understood by the sqlite extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteCommand {
    ListDatabases,
    ExecuteQuery,
    ListTables,
    GetTableSchema,
}

impl SqliteCommand {
    pub fn parse(command: &str) -> Option<Self> {
        match command {
            "list_databases" => Some(SqliteCommand::ListDatabases),
            "execute_query" => Some(SqliteCommand::ExecuteQuery),
            "list_tables" => Some(SqliteCommand::ListTables),
            "get_table_schema" => Some(SqliteCommand::GetTableSchema),
            _ => None,
        }
    }

    /// Broadcast method handled by the app-side plugin.
    pub fn method(self) -> &'static str {
        match self {
            SqliteCommand::ListDatabases => "listDatabases",
            SqliteCommand::ExecuteQuery => "executeQuery",
            SqliteCommand::ListTables => "listTables",
            SqliteCommand::GetTableSchema => "getTableSchema",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DatabaseArgs {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryArgs {
    name: String,
    query: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableArgs {
    name: String,
    table: String,
}

/// Check the args against `A` and return them as broadcast params.
///
/// Keys `A` does not know about are dropped.
fn params_from<A>(ctx: &ExtensionContext) -> Result<Map<String, Value>>
where
    A: DeserializeOwned + Serialize,
{
    match serde_json::to_value(ctx.typed_args::<A>()?)? {
        Value::Object(params) => Ok(params),
        other => Err(Error::invalid_args(format!(
            "{}: expected an object, got {other}",
            ctx.command
        ))),
    }
}

pub async fn run<S, T>(
    bridge: &Bridge<S, T>,
    ctx: ExtensionContext,
    console: &dyn ExtensionConsole,
) -> Result<()>
where
    S: AppSource,
    T: BroadcastTransport,
{
    let Some(command) = SqliteCommand::parse(&ctx.command) else {
        console.error(&format!("Unknown command: {}", ctx.command));
        return Ok(());
    };

    let params = match command {
        SqliteCommand::ListDatabases => None,
        SqliteCommand::ExecuteQuery => Some(params_from::<QueryArgs>(&ctx)?),
        SqliteCommand::ListTables => Some(params_from::<DatabaseArgs>(&ctx)?),
        SqliteCommand::GetTableSchema => Some(params_from::<TableArgs>(&ctx)?),
    };

    bridge
        .broadcast_to_all(&ctx, console, PLUGIN_NAME, command.method(), params)
        .await
}
