//! Invocation parsing and the context handed to extension handlers.

use std::ffi::OsString;
use std::time::Duration;

use clap::Parser;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use dtb_core::prelude::*;

use crate::config::Settings;

/// How the host CLI invokes an extension:
/// `<command> [--metro-server-origin URL] [--args JSON] [--timeout-ms N]`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionInvocation {
    /// Extension command to run (e.g. `list_databases`)
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Origin of the Metro dev server
    #[arg(short = 'o', long, value_name = "URL")]
    pub metro_server_origin: Option<String>,

    /// Command arguments as a JSON object
    #[arg(long, value_name = "JSON")]
    pub args: Option<String>,

    /// How long to wait for app responses (ms)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct InvocationArgs {
    #[command(flatten)]
    invocation: ExtensionInvocation,
}

impl ExtensionInvocation {
    /// Parse an argument list (without the program name).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgs`] with clap's rendered message.
    pub fn parse<I, T>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        InvocationArgs::try_parse_from(argv)
            .map(|parsed| parsed.invocation)
            .map_err(|e| Error::invalid_args(e.to_string().trim_end()))
    }

    /// Fill flags that were not given from `settings`.
    pub fn with_defaults(mut self, settings: &Settings) -> Self {
        if self.metro_server_origin.is_none() {
            self.metro_server_origin = Some(settings.server.metro_server_origin.clone());
        }
        if self.timeout_ms.is_none() {
            self.timeout_ms = Some(settings.broadcast.timeout_ms);
        }
        self
    }

    /// Materialize the handler context.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgs`] if `--args` is not a JSON object.
    pub fn into_context(self) -> Result<ExtensionContext> {
        let defaults = Settings::default();
        let args = match self.args.as_deref() {
            None => Map::new(),
            Some(raw) => parse_args_object(raw)?,
        };

        Ok(ExtensionContext {
            command: self.command,
            metro_server_origin: self
                .metro_server_origin
                .unwrap_or(defaults.server.metro_server_origin),
            args,
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(defaults.broadcast.timeout_ms)),
        })
    }
}

fn parse_args_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::invalid_args(format!(
            "--args must be a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(Error::invalid_args(format!("--args is not valid JSON: {e}"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Everything a handler needs to run one command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionContext {
    pub command: String,
    pub metro_server_origin: String,
    pub args: Map<String, Value>,
    /// Response deadline for broadcasts made by the handler.
    pub timeout: Duration,
}

impl ExtensionContext {
    /// Deserialize the args map into a handler-defined type.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgs`] naming the command when fields are missing or
    /// have the wrong type.
    pub fn typed_args<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.args.clone()))
            .map_err(|e| Error::invalid_args(format!("{}: {e}", self.command)))
    }
}
