//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "DTB_LOG";

const DEFAULT_FILTER: &str = "devtools_bridge=info,dtb_broadcast=info,warn";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/devtools-bridge/logs/`. Nothing is
/// written to the terminal: stdout and stderr belong to the extension console.
///
/// # Examples
/// ```bash
/// DTB_LOG=debug dtb sqlite list_databases
/// DTB_LOG=dtb_broadcast=trace dtb background-task list
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "dtb.log");

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| crate::Error::config(format!("logging already initialized: {e}")))?;

    tracing::info!("devtools-bridge starting, log directory: {}", log_dir.display());

    Ok(())
}

/// Filter from `DTB_LOG`, or the default when unset or invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("devtools-bridge").join("logs"))
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> Result<PathBuf> {
    let dir = get_log_directory()?;
    Ok(dir.join("dtb.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_filter_default() {
        std::env::remove_var(LOG_ENV_VAR);
        let filter = env_filter().to_string();
        assert!(filter.contains("dtb_broadcast=info"));
        assert!(filter.contains("devtools_bridge=info"));
    }

    #[test]
    #[serial]
    fn test_env_filter_from_env() {
        std::env::set_var(LOG_ENV_VAR, "dtb_broadcast=trace");
        let filter = env_filter().to_string();
        std::env::remove_var(LOG_ENV_VAR);
        assert_eq!(filter, "dtb_broadcast=trace");
    }

    #[test]
    fn test_log_file_under_log_directory() {
        let file = get_current_log_file().unwrap();
        assert!(file.ends_with("devtools-bridge/logs/dtb.log"));
    }
}
